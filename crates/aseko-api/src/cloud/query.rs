// Prebuilt GraphQL documents.
//
// Every union member selects `__typename`; decoding dispatches on it.

/// Status value selection shared by the primary and secondary channels.
macro_rules! status_value_fields {
    () => {
        "type
          center {
            __typename
            ... on StringValue { value }
            ... on UpcomingFiltrationPeriodValue {
              configuration { period name }
              isNext
            }
          }"
    };
}

/// All units of the account, connected or not.
pub const UNITS_QUERY: &str = concat!(
    "query Units {
  units {
    units {
      __typename
      ... on Unit {
        serialNumber
        name
        note
        online
        hasWarning
        timeZone
        position
        brandName { primary secondary }
        consumables {
          __typename
          ... on LiquidConsumable {
            type
            name
            canister { remaining hasWarning volume }
            tube { remaining hasWarning remainingDays }
          }
          ... on ElectrolyzerConsumable {
            type
            name
            electrode { remaining weekChlorineProduction hasWarning }
          }
        }
        statusValues {
          primary { ",
    status_value_fields!(),
    " }
          secondary { ",
    status_value_fields!(),
    " }
        }
      }
      ... on UnitNeverConnected {
        serialNumber
        name
        note
        position
        online
      }
    }
  }
}
"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_query_selects_every_union_tag() {
        assert_eq!(UNITS_QUERY.matches("__typename").count(), 4);
        assert!(UNITS_QUERY.contains("... on UnitNeverConnected"));
        assert_eq!(UNITS_QUERY.matches('{').count(), UNITS_QUERY.matches('}').count());
    }
}

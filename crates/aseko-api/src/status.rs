// Unit status values and their typed decoding.
//
// A connected unit reports two ordered channels of status values. Each entry
// carries a type tag and a "center" that is either a display string or an
// upcoming filtration period. Scalar reads go through `StatusValues::value_of`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::error::Error;

/// Placeholder the service sends when a probe has no reading.
pub const NO_READING: &str = "---";

/// Status value type tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusValueType {
    AirTemperature,
    ClFree,
    Dose,
    Electrolyzer,
    FilterFlow,
    FiltrationPumpSpeed,
    Heating,
    LightsState,
    Mode,
    Ph,
    PoolFlow,
    PumpSpeed,
    Redox,
    RedoxPro,
    Salinity,
    Solar,
    SolarTemperature,
    SolarTimer,
    UpcomingFiltrationPeriod,
    WaterFlowToProbes,
    WaterLevel,
    WaterTemperature,
}

/// A configured filtration interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltrationInterval {
    pub period: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingFiltrationPeriodValue {
    pub configuration: FiltrationInterval,
    pub is_next: bool,
}

/// The value shown for a status entry, tagged by GraphQL `__typename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum StatusCenter {
    StringValue(StringValue),
    UpcomingFiltrationPeriodValue(UpcomingFiltrationPeriodValue),
}

impl StatusCenter {
    fn describe(&self) -> String {
        match self {
            Self::StringValue(s) => format!("{:?}", s.value),
            Self::UpcomingFiltrationPeriodValue(_) => "an upcoming filtration period".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusValue {
    #[serde(rename = "type")]
    pub value_type: StatusValueType,
    pub center: StatusCenter,
}

/// Primary and secondary status channels of a connected unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusValues {
    #[serde(default)]
    pub primary: Vec<StatusValue>,
    #[serde(default)]
    pub secondary: Vec<StatusValue>,
}

impl StatusValues {
    /// First entry of the given type, primary channel first.
    pub fn get(&self, value_type: StatusValueType) -> Option<&StatusValue> {
        self.primary
            .iter()
            .chain(&self.secondary)
            .find(|v| v.value_type == value_type)
    }

    /// Read a status value as `K`.
    ///
    /// Absent entries and the `"---"` placeholder are `Ok(None)`. A non-string
    /// center, or text that `K` does not accept, is an error.
    pub fn value_of<K: StatusKind>(&self, value_type: StatusValueType) -> Result<Option<K>, Error> {
        let Some(entry) = self.get(value_type) else {
            return Ok(None);
        };

        match &entry.center {
            StatusCenter::StringValue(s) if s.value == NO_READING => Ok(None),
            StatusCenter::StringValue(s) => K::from_status_text(value_type, &s.value).map(Some),
            other @ StatusCenter::UpcomingFiltrationPeriodValue(_) => Err(Error::TypeMismatch {
                status_type: value_type,
                expected: K::KIND,
                found: other.describe(),
            }),
        }
    }

    /// The upcoming filtration period, if the unit reports one.
    pub fn upcoming_filtration_period(
        &self,
    ) -> Result<Option<&UpcomingFiltrationPeriodValue>, Error> {
        let Some(entry) = self.get(StatusValueType::UpcomingFiltrationPeriod) else {
            return Ok(None);
        };

        match &entry.center {
            StatusCenter::UpcomingFiltrationPeriodValue(period) => Ok(Some(period)),
            StatusCenter::StringValue(s) if s.value == NO_READING => Ok(None),
            other @ StatusCenter::StringValue(_) => Err(Error::TypeMismatch {
                status_type: entry.value_type,
                expected: "upcoming filtration period",
                found: other.describe(),
            }),
        }
    }

    /// Reject channels that list the same type twice.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        for (channel, values) in [("primary", &self.primary), ("secondary", &self.secondary)] {
            let mut seen = HashSet::new();
            for value in values {
                if !seen.insert(value.value_type) {
                    return Err(Error::Decode {
                        message: format!(
                            "status type {} listed twice in {channel} channel",
                            value.value_type
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A scalar kind a status string can be read as.
pub trait StatusKind: Sized {
    /// Human-readable kind name used in errors.
    const KIND: &'static str;

    fn from_status_text(status_type: StatusValueType, text: &str) -> Result<Self, Error>;
}

impl StatusKind for bool {
    const KIND: &'static str = "boolean";

    fn from_status_text(status_type: StatusValueType, text: &str) -> Result<Self, Error> {
        match text {
            "YES" | "ON" => Ok(true),
            "NO" | "OFF" => Ok(false),
            other => Err(Error::TypeMismatch {
                status_type,
                expected: Self::KIND,
                found: format!("{other:?}"),
            }),
        }
    }
}

impl StatusKind for String {
    const KIND: &'static str = "string";

    fn from_status_text(_status_type: StatusValueType, text: &str) -> Result<Self, Error> {
        Ok(text.to_owned())
    }
}

macro_rules! numeric_status_kind {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            impl StatusKind for $ty {
                const KIND: &'static str = $kind;

                fn from_status_text(status_type: StatusValueType, text: &str) -> Result<Self, Error> {
                    text.trim().parse::<$ty>().map_err(|_| Error::InvalidNumber {
                        status_type,
                        expected: Self::KIND,
                        value: text.to_owned(),
                    })
                }
            }
        )*
    };
}

numeric_status_kind! {
    i32 => "integer",
    i64 => "integer",
    u32 => "unsigned integer",
    f32 => "number",
    f64 => "number",
}

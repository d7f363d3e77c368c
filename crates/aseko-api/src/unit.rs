// Units as reported by the GraphQL API.
//
// A unit that has reported at least once carries a brand name, consumables
// and status values; one that never connected carries only its identity.
// `decode_unit` picks the variant from the presence of `brandName`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::consumable::Consumable;
use crate::error::Error;
use crate::status::{StatusValueType, StatusValues, UpcomingFiltrationPeriodValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandName {
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
}

/// A unit that has connected to the cloud at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub serial_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub online: bool,
    pub has_warning: bool,
    pub time_zone: String,
    #[serde(default)]
    pub position: Option<i32>,
    pub brand_name: BrandName,
    #[serde(default)]
    pub consumables: Vec<Consumable>,
    #[serde(default)]
    pub status_values: StatusValues,
}

/// A registered unit that has never reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitNeverConnected {
    pub serial_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    pub online: bool,
}

/// Either kind of unit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyUnit {
    Connected(Unit),
    NeverConnected(UnitNeverConnected),
}

impl AnyUnit {
    pub fn serial_number(&self) -> &str {
        match self {
            Self::Connected(u) => &u.serial_number,
            Self::NeverConnected(u) => &u.serial_number,
        }
    }

    pub fn into_connected(self) -> Option<Unit> {
        match self {
            Self::Connected(u) => Some(u),
            Self::NeverConnected(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for AnyUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_unit(value).map_err(serde::de::Error::custom)
    }
}

/// Decode one raw unit record.
///
/// Presence of `brandName` selects [`Unit`]; its absence selects
/// [`UnitNeverConnected`]. Unknown consumable or status-center tags and
/// duplicate status types fail the whole record.
pub fn decode_unit(value: Value) -> Result<AnyUnit, Error> {
    let Some(fields) = value.as_object() else {
        return Err(Error::Decode {
            message: format!("unit record is not an object: {value}"),
        });
    };

    if fields.contains_key("brandName") {
        let unit: Unit = serde_json::from_value(value).map_err(Error::decode)?;
        unit.status_values.validate()?;
        Ok(AnyUnit::Connected(unit))
    } else {
        serde_json::from_value(value)
            .map(AnyUnit::NeverConnected)
            .map_err(Error::decode)
    }
}

impl Unit {
    pub fn air_temperature(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::AirTemperature)
    }

    /// Free chlorine, mg/l.
    pub fn cl_free(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::ClFree)
    }

    /// Electrolyzer production, g/h.
    pub fn electrolyzer(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::Electrolyzer)
    }

    pub fn filter_flow(&self) -> Result<Option<bool>, Error> {
        self.status_values.value_of(StatusValueType::FilterFlow)
    }

    /// Filtration pump speed, percent.
    pub fn filtration_pump_speed(&self) -> Result<Option<i32>, Error> {
        self.status_values.value_of(StatusValueType::FiltrationPumpSpeed)
    }

    pub fn heating(&self) -> Result<Option<bool>, Error> {
        self.status_values.value_of(StatusValueType::Heating)
    }

    pub fn lights(&self) -> Result<Option<bool>, Error> {
        self.status_values.value_of(StatusValueType::LightsState)
    }

    pub fn mode(&self) -> Result<Option<String>, Error> {
        self.status_values.value_of(StatusValueType::Mode)
    }

    pub fn ph(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::Ph)
    }

    pub fn pool_flow(&self) -> Result<Option<bool>, Error> {
        self.status_values.value_of(StatusValueType::PoolFlow)
    }

    pub fn pump_speed(&self) -> Result<Option<i32>, Error> {
        self.status_values.value_of(StatusValueType::PumpSpeed)
    }

    /// Redox potential, mV.
    pub fn redox(&self) -> Result<Option<i32>, Error> {
        self.status_values.value_of(StatusValueType::Redox)
    }

    /// Salinity, kg/m³.
    pub fn salinity(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::Salinity)
    }

    pub fn solar(&self) -> Result<Option<bool>, Error> {
        self.status_values.value_of(StatusValueType::Solar)
    }

    pub fn solar_temperature(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::SolarTemperature)
    }

    pub fn water_flow_to_probes(&self) -> Result<Option<bool>, Error> {
        self.status_values.value_of(StatusValueType::WaterFlowToProbes)
    }

    /// Water level, cm.
    pub fn water_level(&self) -> Result<Option<i32>, Error> {
        self.status_values.value_of(StatusValueType::WaterLevel)
    }

    pub fn water_temperature(&self) -> Result<Option<f64>, Error> {
        self.status_values.value_of(StatusValueType::WaterTemperature)
    }

    pub fn upcoming_filtration_period(
        &self,
    ) -> Result<Option<&UpcomingFiltrationPeriodValue>, Error> {
        self.status_values.upcoming_filtration_period()
    }
}

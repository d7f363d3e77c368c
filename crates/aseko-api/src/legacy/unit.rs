// Legacy unit listing and state
//
// Both legacy accounts implement `LegacyApi::get_json`; unit listing and
// state fetching are provided on top of it.

use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::legacy::models::{RawUnitState, RawVariable, UnitError, UnitSummary, UnitsPage};

/// Authenticated JSON reads against a legacy API.
pub trait LegacyApi: Sync {
    /// `GET {base}/{path}` with whatever authentication the account uses.
    fn get_json<T>(&self, path: &str) -> impl Future<Output = Result<T, Error>> + Send
    where
        T: DeserializeOwned + Send;

    /// `GET units`
    fn get_units(&self) -> impl Future<Output = Result<Vec<LegacyUnit>, Error>> + Send {
        async move {
            debug!("listing units");
            let page: UnitsPage = self.get_json("units").await?;
            Ok(page.items.into_iter().map(LegacyUnit::new).collect())
        }
    }

    /// `GET units/{serial}`
    fn get_unit_state(
        &self,
        serial_number: u64,
    ) -> impl Future<Output = Result<UnitState, Error>> + Send {
        async move {
            debug!(serial_number, "fetching unit state");
            let raw: RawUnitState = self.get_json(&format!("units/{serial_number}")).await?;
            Ok(UnitState::from_raw(raw))
        }
    }
}

/// A measured or configured variable of a legacy unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub kind: String,
    pub name: String,
    pub unit: String,
    pub icon: String,
    pub color: String,
    pub has_error: bool,
    pub current_value: Option<f64>,
    pub required_value: Option<f64>,
    pub has_alarm: Option<bool>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl Variable {
    fn from_raw(raw: RawVariable) -> Self {
        let alarm = raw.alarm.unwrap_or_default();
        Self {
            kind: raw.kind,
            name: raw.name,
            unit: raw.unit,
            icon: raw.icon,
            color: raw.color,
            has_error: raw.has_error,
            current_value: raw.current_value,
            required_value: raw.required,
            has_alarm: alarm.active,
            min_value: alarm.min_value,
            max_value: alarm.max_value,
        }
    }
}

/// State of a legacy unit at the moment it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitState {
    pub errors: Vec<UnitError>,
    pub has_error: bool,
    pub variables: Vec<Variable>,
    pub has_alarm: bool,
    /// `false` only when the unit explicitly reports no water flow.
    pub water_flow: bool,
}

impl UnitState {
    pub(crate) fn from_raw(raw: RawUnitState) -> Self {
        Self {
            has_error: !raw.errors.is_empty(),
            errors: raw.errors,
            variables: raw.variables.into_iter().map(Variable::from_raw).collect(),
            has_alarm: raw.errors_alarm.active.unwrap_or(false),
            water_flow: !raw.no_water_flow.unwrap_or(false),
        }
    }
}

/// A legacy unit, optionally carrying its last fetched state.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyUnit {
    summary: UnitSummary,
    state: Option<UnitState>,
}

impl LegacyUnit {
    pub fn new(summary: UnitSummary) -> Self {
        Self {
            summary,
            state: None,
        }
    }

    pub fn summary(&self) -> &UnitSummary {
        &self.summary
    }

    pub fn serial_number(&self) -> u64 {
        self.summary.serial_number
    }

    pub fn name(&self) -> Option<&str> {
        self.summary.name.as_deref()
    }

    pub fn is_online(&self) -> bool {
        self.summary.is_online
    }

    /// From the listing, replaced by each state fetch.
    pub fn has_error(&self) -> bool {
        self.state
            .as_ref()
            .map_or(self.summary.has_error, |s| s.has_error)
    }

    /// The last fetched state, if any.
    pub fn state(&self) -> Option<&UnitState> {
        self.state.as_ref()
    }

    /// Fetch the current state and keep it on the unit.
    pub async fn update_state<A: LegacyApi>(&mut self, api: &A) -> Result<&UnitState, Error> {
        let state = api.get_unit_state(self.summary.serial_number).await?;
        self.summary.has_error = state.has_error;
        Ok(self.state.insert(state))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use serde_json::json;

    use super::*;

    fn state(body: serde_json::Value) -> UnitState {
        UnitState::from_raw(serde_json::from_value::<RawUnitState>(body).unwrap())
    }

    #[test]
    fn errors_set_has_error() {
        let s = state(json!({
            "errors": [{ "type": "E1", "title": "Low pH", "content": ["Check pH minus"] }],
            "variables": [],
            "errorsAlarm": { "active": true }
        }));
        assert!(s.has_error);
        assert!(s.has_alarm);
        assert_eq!(s.errors[0].title, "Low pH");
    }

    #[test]
    fn missing_no_water_flow_means_flowing() {
        let s = state(json!({ "errors": [], "variables": [], "errorsAlarm": { "active": false } }));
        assert!(!s.has_error);
        assert!(s.water_flow);
    }

    #[test]
    fn explicit_no_water_flow() {
        let s = state(json!({
            "errors": [],
            "variables": [],
            "errorsAlarm": { "active": false },
            "noWaterFlow": true
        }));
        assert!(!s.water_flow);
    }

    #[test]
    fn variable_alarm_is_flattened() {
        let s = state(json!({
            "errors": [],
            "variables": [{
                "type": "ph",
                "name": "pH",
                "unit": "",
                "icon": "ph",
                "color": "blue",
                "hasError": false,
                "currentValue": 7.2,
                "required": 7.0,
                "alarm": { "active": true, "minValue": 6.8, "maxValue": 7.6 }
            }, {
                "type": "waterTemp",
                "name": "Water temperature",
                "unit": "°C",
                "icon": "temp",
                "color": "red",
                "hasError": false
            }],
            "errorsAlarm": { "active": false }
        }));
        assert_eq!(s.variables[0].required_value, Some(7.0));
        assert_eq!(s.variables[0].has_alarm, Some(true));
        assert_eq!(s.variables[0].max_value, Some(7.6));
        assert_eq!(s.variables[1].current_value, None);
        assert_eq!(s.variables[1].has_alarm, None);
    }
}

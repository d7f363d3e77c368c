// Legacy API response types
//
// Models for the web (`/api/`) and mobile (`/api/v1/`) JSON APIs. Both
// serve the same unit shapes; they differ only in how login answers.
// Optional fields use `#[serde(default)]` because the API omits rather
// than nulls them.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::token::Credential;

// ── Authentication ───────────────────────────────────────────────────

/// Account details returned by a web login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub email: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Token pair returned by mobile login and refresh.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl TokenResponse {
    /// Turn the token pair into a credential, reading the access token's expiry.
    pub fn into_credential(self) -> Result<Credential, Error> {
        Credential::from_access_token(self.access_token, Some(self.refresh_token))
    }
}

// ── Units ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct UnitsPage {
    pub items: Vec<UnitSummary>,
}

/// A unit as listed by `GET units`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    #[serde(deserialize_with = "serial_number")]
    pub serial_number: u64,
    #[serde(rename = "type")]
    pub unit_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub timezone: String,
    pub is_online: bool,
    #[serde(default)]
    pub date_last_data: Option<String>,
    pub has_error: bool,
}

/// Body of `GET units/{serial}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUnitState {
    #[serde(default)]
    pub errors: Vec<UnitError>,
    #[serde(default)]
    pub variables: Vec<RawVariable>,
    pub errors_alarm: Alarm,
    #[serde(default)]
    pub no_water_flow: Option<bool>,
}

/// An active error reported by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title: String,
    #[serde(default)]
    pub content: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Alarm {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawVariable {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub unit: String,
    pub icon: String,
    pub color: String,
    pub has_error: bool,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub required: Option<f64>,
    #[serde(default)]
    pub alarm: Option<Alarm>,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// The API sends serial numbers as either strings or integers.
fn serial_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Serial {
        Number(u64),
        Text(String),
    }

    match Serial::deserialize(deserializer)? {
        Serial::Number(n) => Ok(n),
        Serial::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid serial number {s:?}"))),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

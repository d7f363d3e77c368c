// Cloud auth and GraphQL wire types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The signed-in cloud user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub surname: String,
    #[serde(rename = "lang")]
    pub language: String,
    pub is_active: bool,
}

// ── Auth service ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub cloud: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    pub token: SecretString,
    pub user: User,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub token: SecretString,
}

// ── GraphQL ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct GraphQlRequest<'a> {
    pub query: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

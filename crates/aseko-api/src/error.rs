use thiserror::Error;

use crate::status::StatusValueType;

/// Top-level error type for the `aseko-api` crate.
///
/// Covers every failure mode across all account flavours:
/// authentication, transport, the legacy REST API, the GraphQL API,
/// and status-value decoding.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or refresh rejected by the server (HTTP 401).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No cached token and no refresh token or password left to obtain one.
    #[error("Not authenticated -- no remaining way to obtain an access token")]
    NotAuthenticated,

    /// The access token could not be decoded to read its expiry.
    #[error("Malformed access token: {0}")]
    MalformedToken(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-authentication HTTP failure, or a GraphQL query that kept
    /// failing after the single retry.
    #[error("API unavailable: {message}")]
    ApiUnavailable {
        message: String,
        status: Option<u16>,
    },

    // ── GraphQL ─────────────────────────────────────────────────────
    /// The GraphQL endpoint answered with an `errors` array.
    #[error("GraphQL query rejected: {}", messages.join("; "))]
    QueryRejected { messages: Vec<String> },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization of a response body failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A unit payload did not match the expected shape (unknown union tag,
    /// duplicate status type, missing field).
    #[error("Decode error: {message}")]
    Decode { message: String },

    // ── Status values ───────────────────────────────────────────────
    /// The stored status value cannot be represented as the requested kind.
    #[error("Status value {status_type} holds {found}, which is not a valid {expected}")]
    TypeMismatch {
        status_type: StatusValueType,
        expected: &'static str,
        found: String,
    },

    /// The stored status text is not a valid number of the requested kind.
    #[error("Status value {status_type} holds {value:?}, which is not a valid {expected}")]
    InvalidNumber {
        status_type: StatusValueType,
        expected: &'static str,
        value: String,
    },
}

impl Error {
    /// Returns `true` if the server rejected the presented credentials
    /// and another re-authentication strategy might resolve it.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::ApiUnavailable {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

// Shared transport configuration and response handling.
//
// Every account flavour builds its `reqwest::Client` through this module and
// funnels responses through the same status policy: 401 is an
// authentication rejection, any other non-2xx is `ApiUnavailable`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("aseko-api/", env!("CARGO_PKG_VERSION"));

/// Base URLs of the upstream services.
///
/// Defaults point at production; tests swap in a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Legacy web API, cookie session (`https://pool.aseko.com/api/`).
    pub web: Url,
    /// Legacy mobile API, access-token header (`https://pool.aseko.com/api/v1/`).
    pub mobile: Url,
    /// Cloud auth service (`.../auth/`): login and refresh-token.
    pub auth: Url,
    /// Cloud GraphQL endpoint.
    pub graphql: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            web: parse_static("https://pool.aseko.com/api/"),
            mobile: parse_static("https://pool.aseko.com/api/v1/"),
            auth: parse_static("https://auth.aseko.acs.aseko.cloud/auth/"),
            graphql: parse_static("https://graphql.acs.prod.aseko.cloud/graphql"),
        }
    }
}

fn parse_static(raw: &'static str) -> Url {
    Url::parse(raw).expect("static endpoint URL")
}

impl Endpoints {
    /// Point every service at a single base URL (mock servers, proxies).
    ///
    /// Paths mirror production: `{base}/api/`, `{base}/api/v1/`,
    /// `{base}/auth/` and `{base}/graphql`.
    pub fn with_base(base: &str) -> Result<Self, Error> {
        let base = Url::parse(&format!("{}/", base.trim_end_matches('/')))?;
        Ok(Self {
            web: base.join("api/")?,
            mobile: base.join("api/v1/")?,
            auth: base.join("auth/")?,
            graphql: base.join("graphql")?,
        })
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
    pub endpoints: Endpoints,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            cookie_jar: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(Error::Transport)
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }

    /// Replace the endpoint set.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

// ── Response handling ────────────────────────────────────────────────

/// Apply the status policy, passing successful responses through.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::InvalidCredentials);
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::ApiUnavailable {
            message: format!("HTTP {status}: {}", preview(&body)),
            status: Some(status.as_u16()),
        });
    }

    Ok(resp)
}

/// Read a successful response body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

// Cloud account
//
// Authenticates against the cloud auth service and reads units over
// GraphQL. Login answers with a bearer token in the body and the refresh
// token in a `refreshToken` cookie; refresh sends that cookie back and
// receives a new bearer token only.

use chrono::{DateTime, Utc};
use reqwest::header::{COOKIE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cloud::graphql::GraphQlClient;
use crate::cloud::models::{LoginRequest, LoginResponse, RefreshResponse, User};
use crate::cloud::query::UNITS_QUERY;
use crate::error::Error;
use crate::session::{AccountCredentials, Authenticator, SessionManager};
use crate::token::Credential;
use crate::transport::{TransportConfig, check_status, read_json};
use crate::unit::{AnyUnit, Unit, decode_unit};

/// Tenant identifier sent with every cloud login.
const CLOUD_ID: &str = "01HXS50KTV7NRSVNHD617J4CKB";

const REFRESH_COOKIE: &str = "refreshToken";

/// The network half of the cloud session.
struct CloudAuth {
    http: reqwest::Client,
    base_url: Url,
}

impl CloudAuth {
    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    async fn login_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(Credential, User), Error> {
        let url = self.url("login")?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&LoginRequest {
                email,
                password: password.expose_secret(),
                cloud: CLOUD_ID,
            })
            .send()
            .await
            .map_err(Error::Transport)?;
        let resp = check_status(resp).await?;

        let refresh_token: Option<SecretString> = resp
            .cookies()
            .find(|c| c.name() == REFRESH_COOKIE)
            .map(|c| c.value().to_owned().into());
        if refresh_token.is_none() {
            warn!("cloud login set no refresh token cookie");
        }

        let body: LoginResponse = read_json(resp).await?;
        let credential = Credential::from_access_token(body.token, refresh_token)?;
        Ok((credential, body.user))
    }
}

impl Authenticator for CloudAuth {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<Credential, Error> {
        let url = self.url("refresh-token")?;
        debug!("POST {}", url);

        let mut cookie =
            HeaderValue::from_str(&format!("{REFRESH_COOKIE}={}", refresh_token.expose_secret()))
                .map_err(|e| {
                    Error::MalformedToken(format!("refresh token is not a valid cookie: {e}"))
                })?;
        cookie.set_sensitive(true);

        let resp = self
            .http
            .post(url)
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(Error::Transport)?;

        let body: RefreshResponse = read_json(check_status(resp).await?).await?;
        Credential::from_access_token(body.token, None)
    }

    async fn login(&self, username: &str, password: &SecretString) -> Result<Credential, Error> {
        self.login_user(username, password)
            .await
            .map(|(credential, _)| credential)
    }
}

/// An account on the Aseko cloud (GraphQL) API.
pub struct CloudAccount {
    auth: CloudAuth,
    graphql: GraphQlClient,
    session: SessionManager,
}

impl CloudAccount {
    /// Create an account from e-mail + password and/or a persisted refresh token.
    pub fn new(credentials: AccountCredentials, transport: &TransportConfig) -> Result<Self, Error> {
        Self::from_parts(SessionManager::new(credentials), transport)
    }

    /// Resume with a previously persisted access token and expiry.
    pub fn with_credential(
        credentials: AccountCredentials,
        credential: Credential,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Self::from_parts(
            SessionManager::with_credential(credentials, credential),
            transport,
        )
    }

    fn from_parts(session: SessionManager, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            auth: CloudAuth {
                http: http.clone(),
                base_url: transport.endpoints.auth.clone(),
            },
            graphql: GraphQlClient::new(http, transport.endpoints.graphql.clone()),
            session,
        })
    }

    /// Log in with the configured e-mail and password.
    pub async fn login(&self) -> Result<User, Error> {
        let (email, password) = self.session.login_material().ok_or(Error::NotAuthenticated)?;
        debug!(email, "logging in to cloud");
        let (credential, user) = self.auth.login_user(email, password).await?;
        self.session.install(&credential).await;
        Ok(user)
    }

    /// Run a GraphQL document and return its `data`.
    ///
    /// A rejected query is retried once with a renewed token; a second
    /// rejection is reported as [`Error::ApiUnavailable`]. An HTTP 401
    /// drops the access token so the next call escalates.
    pub async fn query(&self, document: &str) -> Result<Value, Error> {
        let credential = self.session.credential(&self.auth).await?;
        match self.execute(document, &credential).await {
            Err(Error::QueryRejected { messages }) => {
                debug!(?messages, "query rejected, renewing token and retrying once");
            }
            other => return other,
        }

        let credential = self
            .session
            .renew(&self.auth, credential.access_token())
            .await?;
        self.execute(document, &credential)
            .await
            .map_err(|e| match e {
                Error::QueryRejected { messages } => Error::ApiUnavailable {
                    message: format!("query rejected after retry: {}", messages.join("; ")),
                    status: None,
                },
                other => other,
            })
    }

    async fn execute(&self, document: &str, credential: &Credential) -> Result<Value, Error> {
        match self.graphql.execute(document, credential.access_token()).await {
            Err(e) if e.is_auth_rejection() => {
                debug!("access token rejected, invalidating it");
                self.session.invalidate_access().await;
                Err(e)
            }
            other => other,
        }
    }

    /// All units, including ones that never connected.
    pub async fn get_all_units(&self) -> Result<Vec<AnyUnit>, Error> {
        let mut data = self.query(UNITS_QUERY).await?;
        let Some(Value::Array(records)) = data.pointer_mut("/units/units").map(Value::take) else {
            return Err(Error::Decode {
                message: "response has no units.units list".into(),
            });
        };
        debug!(count = records.len(), "decoding units");
        records.into_iter().map(decode_unit).collect()
    }

    /// Units that have connected at least once.
    pub async fn get_units(&self) -> Result<Vec<Unit>, Error> {
        Ok(self
            .get_all_units()
            .await?
            .into_iter()
            .filter_map(AnyUnit::into_connected)
            .collect())
    }

    /// Forget every token held by this account.
    pub async fn logout(&self) {
        self.session.clear().await;
    }

    /// The refresh token, for persisting across restarts.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.session.refresh_token().await
    }

    pub async fn access_token_expiration(&self) -> Option<DateTime<Utc>> {
        self.session.access_token_expiration().await
    }
}

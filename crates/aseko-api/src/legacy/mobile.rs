// Legacy mobile account
//
// Token-based auth against `https://pool.aseko.com/api/v1/`. Login and
// refresh both answer with an access/refresh token pair; the access token
// rides on every data request in the `access-token` header. Token
// lifecycle is delegated to `SessionManager`.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::legacy::client::LegacyHttp;
use crate::legacy::models::TokenResponse;
use crate::legacy::unit::LegacyApi;
use crate::session::{AccountCredentials, Authenticator, SessionManager};
use crate::token::Credential;
use crate::transport::TransportConfig;

/// Firebase push registration; the client never registers one.
const NO_FIREBASE_ID: &str = "";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
    firebase_id: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshForm<'a> {
    refresh_token: &'a str,
    firebase_id: &'static str,
}

/// The network half of the mobile session.
struct MobileAuth {
    api: LegacyHttp,
}

impl Authenticator for MobileAuth {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<Credential, Error> {
        let form = RefreshForm {
            refresh_token: refresh_token.expose_secret(),
            firebase_id: NO_FIREBASE_ID,
        };
        let tokens: TokenResponse = self.api.post_form("refresh", &form, None).await?;
        tokens.into_credential()
    }

    async fn login(&self, username: &str, password: &SecretString) -> Result<Credential, Error> {
        let form = LoginForm {
            username,
            password: password.expose_secret(),
            firebase_id: NO_FIREBASE_ID,
        };
        let tokens: TokenResponse = self.api.post_form("login", &form, None).await?;
        tokens.into_credential()
    }
}

/// An account on the legacy mobile API.
pub struct MobileAccount {
    auth: MobileAuth,
    session: SessionManager,
}

impl MobileAccount {
    /// Create an account from long-lived secrets (password and/or refresh token).
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
            auth: MobileAuth {
                api: LegacyHttp::new(http, transport.endpoints.mobile.clone()),
            },
            session,
        })
    }

    /// Log in with the configured username and password.
    pub async fn login(&self) -> Result<Credential, Error> {
        let (username, password) = self.session.login_material().ok_or(Error::NotAuthenticated)?;
        debug!(username, "logging in to mobile API");
        let credential = self.auth.login(username, password).await?;
        self.session.install(&credential).await;
        Ok(credential)
    }

    /// A valid access token, refreshing or logging in when the cached one
    /// is within a minute of expiry.
    pub async fn access_token(&self) -> Result<SecretString, Error> {
        let credential = self.session.credential(&self.auth).await?;
        Ok(credential.access_token().clone())
    }

    /// End the session on the server. Local tokens are cleared even when
    /// the server call fails.
    ///
    /// While any token is held, the request carries a valid access token,
    /// refreshed or re-issued first if the cached one is stale.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self.post_logout().await;
        self.session.clear().await;
        debug!("mobile session cleared");
        result
    }

    async fn post_logout(&self) -> Result<(), Error> {
        let token = if self.session.holds_token().await {
            Some(self.access_token().await?)
        } else {
            None
        };
        self.auth.api.post_empty("logout", token.as_ref()).await
    }

    /// The refresh token, for persisting across restarts.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.session.refresh_token().await
    }

    pub async fn access_token_expiration(&self) -> Option<DateTime<Utc>> {
        self.session.access_token_expiration().await
    }
}

impl LegacyApi for MobileAccount {
    async fn get_json<T>(&self, path: &str) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        let token = self.access_token().await?;
        match self.auth.api.get(path, Some(&token)).await {
            Err(e) if e.is_auth_rejection() => {
                debug!("access token rejected, invalidating it");
                self.session.invalidate_access().await;
                Err(e)
            }
            other => other,
        }
    }
}

// Legacy web account
//
// Cookie-based session. `POST login` sets the session cookie in the
// client's jar; subsequent requests carry it automatically. The account
// logs in lazily before the first data request and again after the server
// drops the session with a 401.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Error;
use crate::legacy::client::LegacyHttp;
use crate::legacy::models::AccountInfo;
use crate::legacy::unit::LegacyApi;
use crate::transport::TransportConfig;

#[derive(Serialize)]
struct LoginForm<'a> {
    username: &'a str,
    password: &'a str,
    agree: &'static str,
}

/// An account on the legacy web API (`https://pool.aseko.com/api/`).
pub struct WebAccount {
    api: LegacyHttp,
    username: String,
    password: SecretString,
    session: Mutex<Option<AccountInfo>>,
}

impl WebAccount {
    /// Create a web account.
    ///
    /// A cookie jar is added to the transport if it has none; the session
    /// lives in it.
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self {
            api: LegacyHttp::new(http, config.endpoints.web.clone()),
            username: username.into(),
            password,
            session: Mutex::new(None),
        })
    }

    /// Log in, replacing any current session.
    pub async fn login(&self) -> Result<AccountInfo, Error> {
        let mut session = self.session.lock().await;
        let info = self.post_login().await?;
        *session = Some(info.clone());
        Ok(info)
    }

    /// Account details from the current session, if logged in.
    pub async fn account_info(&self) -> Option<AccountInfo> {
        self.session.lock().await.clone()
    }

    async fn post_login(&self) -> Result<AccountInfo, Error> {
        debug!(username = %self.username, "logging in to web API");
        let form = LoginForm {
            username: &self.username,
            password: self.password.expose_secret(),
            agree: "on",
        };
        let info: AccountInfo = self.api.post_form("login", &form, None).await?;
        debug!("web login successful");
        Ok(info)
    }

    async fn ensure_session(&self) -> Result<(), Error> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.post_login().await?);
        }
        Ok(())
    }
}

impl LegacyApi for WebAccount {
    async fn get_json<T>(&self, path: &str) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.ensure_session().await?;
        match self.api.get(path, None).await {
            Err(e) if e.is_auth_rejection() => {
                debug!("web session rejected, forgetting it");
                *self.session.lock().await = None;
                Err(e)
            }
            other => other,
        }
    }
}

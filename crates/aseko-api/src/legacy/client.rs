// Legacy API HTTP plumbing
//
// Wraps `reqwest::Client` with base-URL joining, the optional `access-token`
// header used by the mobile API, and the shared status policy. The web and
// mobile accounts differ only in base URL and in how they authenticate, so
// both delegate their raw requests here.

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{check_status, read_json};

const ACCESS_TOKEN_HEADER: &str = "access-token";

/// Raw HTTP client for one legacy API base (`/api/` or `/api/v1/`).
pub(crate) struct LegacyHttp {
    http: reqwest::Client,
    base_url: Url,
}

impl LegacyHttp {
    pub(crate) fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    fn authorize(
        builder: reqwest::RequestBuilder,
        access_token: Option<&SecretString>,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let Some(token) = access_token else {
            return Ok(builder);
        };
        let mut value =
            HeaderValue::from_str(token.expose_secret()).map_err(|e| Error::MalformedToken(
                format!("access token is not a valid header value: {e}"),
            ))?;
        value.set_sensitive(true);
        Ok(builder.header(ACCESS_TOKEN_HEADER, value))
    }

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: Option<&SecretString>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);

        let builder = Self::authorize(self.http.get(url), access_token)?;
        let resp = builder.send().await.map_err(Error::Transport)?;
        read_json(check_status(resp).await?).await
    }

    /// Send a form-encoded POST request and decode the JSON body.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &(impl Serialize + Sync),
        access_token: Option<&SecretString>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);

        let builder = Self::authorize(self.http.post(url).form(form), access_token)?;
        let resp = builder.send().await.map_err(Error::Transport)?;
        read_json(check_status(resp).await?).await
    }

    /// Send a body-less POST request, ignoring any response body.
    pub(crate) async fn post_empty(
        &self,
        path: &str,
        access_token: Option<&SecretString>,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);

        let builder = Self::authorize(self.http.post(url), access_token)?;
        let resp = builder.send().await.map_err(Error::Transport)?;
        check_status(resp).await?;
        Ok(())
    }
}

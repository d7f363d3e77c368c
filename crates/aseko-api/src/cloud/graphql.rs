// GraphQL transport
//
// POSTs a query document with bearer auth and unwraps the response
// envelope. A non-empty `errors` array is a query rejection even when
// partial `data` came back.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::cloud::models::{GraphQlRequest, GraphQlResponse};
use crate::error::Error;
use crate::transport::{check_status, read_json};

pub(crate) struct GraphQlClient {
    http: reqwest::Client,
    url: Url,
}

impl GraphQlClient {
    pub(crate) fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Execute `query`, returning its `data` member.
    pub(crate) async fn execute(&self, query: &str, token: &SecretString) -> Result<Value, Error> {
        debug!("POST {}", self.url);

        let resp = self
            .http
            .post(self.url.clone())
            .bearer_auth(token.expose_secret())
            .json(&GraphQlRequest { query })
            .send()
            .await
            .map_err(Error::Transport)?;

        let envelope: GraphQlResponse = read_json(check_status(resp).await?).await?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            trace!(?messages, "GraphQL errors");
            return Err(Error::QueryRejected { messages });
        }

        envelope.data.ok_or_else(|| Error::Decode {
            message: "GraphQL response carried neither data nor errors".into(),
        })
    }
}

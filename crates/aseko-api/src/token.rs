// Access credentials and the token store.
//
// Expiry is read from the access token's own `exp` claim. The token is
// decoded, never verified: `decode_unverified_claims` is the only place
// that looks inside a token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::Error;

/// Tokens within this many seconds of their expiry are treated as already expired.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Registered claims read from an access token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    #[serde(default)]
    pub sub: Option<String>,
}

/// Decode a JWT's claim payload WITHOUT verifying its signature.
///
/// The issuer is trusted through TLS and the HTTP status of the response
/// that delivered the token; the payload is only read for its expiry.
pub fn decode_unverified_claims(token: &str) -> Result<Claims, Error> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_header), Some(payload), Some(_signature)) => payload,
        _ => return Err(Error::MalformedToken("expected three dot-separated segments".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::MalformedToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedToken(format!("payload is not a claims object: {e}")))
}

/// An access token with its decoded expiry and optional refresh token.
#[derive(Debug, Clone)]
pub struct Credential {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
    refresh_token: Option<SecretString>,
}

impl Credential {
    /// Build a credential from a freshly issued access token, reading the
    /// expiry from its claims.
    pub fn from_access_token(
        access_token: SecretString,
        refresh_token: Option<SecretString>,
    ) -> Result<Self, Error> {
        let claims = decode_unverified_claims(access_token.expose_secret())?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| Error::MalformedToken(format!("exp {} out of range", claims.exp)))?;
        Ok(Self {
            access_token,
            expires_at,
            refresh_token,
        })
    }

    /// Rebuild a credential from previously persisted parts.
    pub fn from_parts(
        access_token: SecretString,
        expires_at: DateTime<Utc>,
        refresh_token: Option<SecretString>,
    ) -> Self {
        Self {
            access_token,
            expires_at,
            refresh_token,
        }
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    /// Still usable at `now`, keeping [`EXPIRY_BUFFER_SECS`] in hand.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + TimeDelta::seconds(EXPIRY_BUFFER_SECS)
    }
}

/// Mutable token state owned by one account.
///
/// Holds the current access token (with expiry) and the refresh token
/// separately, because a refresh token can outlive a cleared access token.
/// Writes always replace whole values.
#[derive(Debug, Default)]
pub struct TokenStore {
    access: Option<(SecretString, DateTime<Utc>)>,
    refresh: Option<SecretString>,
}

impl TokenStore {
    pub fn new(refresh: Option<SecretString>) -> Self {
        Self {
            access: None,
            refresh,
        }
    }

    /// The cached credential, if it is still fresh at `now`.
    pub fn fresh(&self, now: DateTime<Utc>) -> Option<Credential> {
        let (token, expires_at) = self.access.as_ref()?;
        let credential = Credential {
            access_token: token.clone(),
            expires_at: *expires_at,
            refresh_token: self.refresh.clone(),
        };
        credential.is_fresh_at(now).then_some(credential)
    }

    /// Replace the stored state with a newly issued credential.
    ///
    /// A credential without a refresh token keeps the previous one: the
    /// cloud refresh endpoint answers with a bare access token.
    pub fn replace(&mut self, credential: &Credential) {
        self.access = Some((
            credential.access_token.clone(),
            credential.expires_at,
        ));
        if let Some(refresh) = credential.refresh_token.clone() {
            self.refresh = Some(refresh);
        }
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh.as_ref()
    }

    pub fn access_token_expiration(&self) -> Option<DateTime<Utc>> {
        self.access.as_ref().map(|(_, expires_at)| *expires_at)
    }

    /// No access token and no refresh token.
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// Drop the access token, keeping the refresh token.
    pub fn invalidate_access(&mut self) {
        self.access = None;
    }

    /// Drop the refresh token after the server rejected it.
    pub fn discard_refresh(&mut self) {
        self.refresh = None;
    }

    /// Forget everything (logout).
    pub fn clear(&mut self) {
        self.access = None;
        self.refresh = None;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    /// Build an unsigned JWT carrying `exp`.
    pub fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"user-1","exp":{exp}}}"#));
        format!("{header}.{payload}.signature")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::test_support::jwt_with_exp;
    use super::*;

    fn secret(value: &str) -> SecretString {
        value.to_owned().into()
    }

    #[test]
    fn claims_are_read_without_verification() {
        let claims = decode_unverified_claims(&jwt_with_exp(1_700_000_000)).unwrap();
        assert_eq!(claims.exp, 1_700_000_000);
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let token = jwt_with_exp(42);
        let mut parts: Vec<&str> = token.split('.').collect();
        let padded = format!("{}==", parts[1]);
        parts[1] = &padded;
        let claims = decode_unverified_claims(&parts.join(".")).unwrap();
        assert_eq!(claims.exp, 42);
    }

    #[test]
    fn opaque_token_is_malformed() {
        let err = decode_unverified_claims("not-a-jwt").unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)));
    }

    #[test]
    fn payload_without_exp_is_malformed() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let err = decode_unverified_claims(&format!("h.{payload}.s")).unwrap_err();
        assert!(matches!(err, Error::MalformedToken(_)));
    }

    #[test]
    fn freshness_honours_buffer() {
        let now = Utc::now();
        let soon = Credential::from_parts(secret("t"), now + TimeDelta::seconds(30), None);
        let later = Credential::from_parts(secret("t"), now + TimeDelta::seconds(600), None);
        assert!(!soon.is_fresh_at(now));
        assert!(later.is_fresh_at(now));
    }

    #[test]
    fn replace_keeps_refresh_token_when_none_issued() {
        let mut store = TokenStore::new(Some(secret("r0")));
        let exp = Utc::now().timestamp() + 3600;
        let credential = Credential::from_access_token(jwt_with_exp(exp).into(), None).unwrap();
        store.replace(&credential);

        assert_eq!(store.refresh_token().unwrap().expose_secret(), "r0");
        assert_eq!(store.access_token_expiration().unwrap().timestamp(), exp);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut store = TokenStore::default();
        store.replace(&Credential::from_parts(
            secret("t"),
            Utc::now() + TimeDelta::hours(1),
            Some(secret("r")),
        ));
        assert!(store.fresh(Utc::now()).is_some());
        store.clear();
        assert!(store.fresh(Utc::now()).is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.access_token_expiration().is_none());
    }
}

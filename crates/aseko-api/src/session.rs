// Session lifecycle: cached token → refresh → full login.
//
// `SessionManager` owns the token store behind an async mutex and holds the
// lock for the whole escalation, so two callers that both observe an
// expired token never both refresh. The account supplies the network half
// through `Authenticator`.

use std::future::Future;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Error;
use crate::token::{Credential, TokenStore};

/// Network operations a session needs from its account.
pub trait Authenticator {
    /// Exchange a refresh token for a new credential.
    ///
    /// Must fail with [`Error::InvalidCredentials`] when the server rejects
    /// the refresh token, so the session can fall back to a full login.
    fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<Credential, Error>> + Send;

    /// Log in with username (or e-mail) and password.
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<Credential, Error>> + Send;
}

/// Long-lived secrets an account may hold for re-authentication.
#[derive(Debug, Clone, Default)]
pub struct AccountCredentials {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl AccountCredentials {
    pub fn password(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password),
            refresh_token: None,
        }
    }

    pub fn refresh_token(refresh_token: SecretString) -> Self {
        Self {
            refresh_token: Some(refresh_token),
            ..Self::default()
        }
    }
}

/// Token state plus the escalation policy for keeping it valid.
#[derive(Debug)]
pub struct SessionManager {
    store: Mutex<TokenStore>,
    username: Option<String>,
    password: Option<SecretString>,
}

impl SessionManager {
    pub fn new(credentials: AccountCredentials) -> Self {
        Self {
            store: Mutex::new(TokenStore::new(credentials.refresh_token)),
            username: credentials.username,
            password: credentials.password,
        }
    }

    /// Start from a persisted credential (access token, expiry, refresh token).
    ///
    /// A refresh token inside `credential` wins over the one in `credentials`.
    pub fn with_credential(credentials: AccountCredentials, credential: Credential) -> Self {
        let mut store = TokenStore::new(credentials.refresh_token);
        store.replace(&credential);
        Self {
            store: Mutex::new(store),
            username: credentials.username,
            password: credentials.password,
        }
    }

    /// Return a currently valid credential, refreshing or logging in as needed.
    ///
    /// 1. cached token still fresh → returned, no network call
    /// 2. refresh token held → one refresh; a rejection discards the token
    /// 3. username + password held → full login
    /// 4. otherwise [`Error::NotAuthenticated`]
    pub async fn credential<A>(&self, auth: &A) -> Result<Credential, Error>
    where
        A: Authenticator + Sync,
    {
        let mut store = self.store.lock().await;

        if let Some(credential) = store.fresh(Utc::now()) {
            return Ok(credential);
        }

        store.invalidate_access();
        self.escalate(auth, &mut store).await
    }

    /// Replace an access token the server rejected although it looked fresh.
    ///
    /// If another caller already renewed past `rejected`, the cached
    /// credential is returned without a network call.
    pub async fn renew<A>(&self, auth: &A, rejected: &SecretString) -> Result<Credential, Error>
    where
        A: Authenticator + Sync,
    {
        let mut store = self.store.lock().await;

        let renewed = store
            .fresh(Utc::now())
            .filter(|c| c.access_token().expose_secret() != rejected.expose_secret());
        if let Some(credential) = renewed {
            debug!("token already renewed by another caller");
            return Ok(credential);
        }

        store.invalidate_access();
        self.escalate(auth, &mut store).await
    }

    async fn escalate<A>(&self, auth: &A, store: &mut TokenStore) -> Result<Credential, Error>
    where
        A: Authenticator + Sync,
    {
        if let Some(credential) = Self::try_refresh(auth, store).await? {
            return Ok(credential);
        }
        if let Some(credential) = self.try_login(auth, store).await? {
            return Ok(credential);
        }
        Err(Error::NotAuthenticated)
    }

    async fn try_refresh<A>(auth: &A, store: &mut TokenStore) -> Result<Option<Credential>, Error>
    where
        A: Authenticator + Sync,
    {
        let Some(refresh_token) = store.refresh_token().cloned() else {
            return Ok(None);
        };

        debug!("access token expired, refreshing");
        match auth.refresh(&refresh_token).await {
            Ok(credential) => {
                store.replace(&credential);
                Ok(Some(store_view(store, credential)))
            }
            Err(e) if e.is_auth_rejection() => {
                warn!("refresh token rejected, discarding it");
                store.discard_refresh();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn try_login<A>(
        &self,
        auth: &A,
        store: &mut TokenStore,
    ) -> Result<Option<Credential>, Error>
    where
        A: Authenticator + Sync,
    {
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Ok(None);
        };

        debug!(username, "logging in with password");
        let credential = auth.login(username, password).await?;
        store.replace(&credential);
        Ok(Some(store_view(store, credential)))
    }

    /// Username and password, if both are held.
    pub fn login_material(&self) -> Option<(&str, &SecretString)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.as_str(), password)),
            _ => None,
        }
    }

    /// Store a credential obtained by an explicit login.
    pub async fn install(&self, credential: &Credential) {
        self.store.lock().await.replace(credential);
    }

    /// Whether an access or refresh token is held, fresh or not.
    pub async fn holds_token(&self) -> bool {
        !self.store.lock().await.is_empty()
    }

    /// Forget the access token after the server rejected it; the refresh
    /// token is kept for the next escalation.
    pub async fn invalidate_access(&self) {
        self.store.lock().await.invalidate_access();
    }

    /// Forget access token, expiry and refresh token.
    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }

    /// The refresh token, for persisting across restarts.
    pub async fn refresh_token(&self) -> Option<SecretString> {
        self.store.lock().await.refresh_token().cloned()
    }

    pub async fn access_token_expiration(&self) -> Option<DateTime<Utc>> {
        self.store.lock().await.access_token_expiration()
    }
}

/// The credential as the store now sees it: a refresh that issued no new
/// refresh token still reports the one kept in the store.
fn store_view(store: &TokenStore, issued: Credential) -> Credential {
    if issued.refresh_token().is_some() {
        return issued;
    }
    Credential::from_parts(
        issued.access_token().clone(),
        issued.expires_at(),
        store.refresh_token().cloned(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeDelta;

    use super::*;
    use crate::token::test_support::jwt_with_exp;

    fn secret(value: &str) -> SecretString {
        value.to_owned().into()
    }

    fn issued(refresh: Option<&str>) -> Credential {
        let exp = (Utc::now() + TimeDelta::hours(1)).timestamp();
        Credential::from_access_token(secret(&jwt_with_exp(exp)), refresh.map(secret)).unwrap()
    }

    #[derive(Default)]
    struct FakeAuth {
        refreshes: AtomicUsize,
        logins: AtomicUsize,
        reject_refresh: bool,
        reject_login: bool,
        refresh_unavailable: bool,
    }

    impl Authenticator for FakeAuth {
        async fn refresh(&self, refresh_token: &SecretString) -> Result<Credential, Error> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            assert_eq!(refresh_token.expose_secret(), "r1");
            if self.refresh_unavailable {
                return Err(Error::ApiUnavailable {
                    message: "HTTP 503".into(),
                    status: Some(503),
                });
            }
            if self.reject_refresh {
                return Err(Error::InvalidCredentials);
            }
            Ok(issued(Some("r2")))
        }

        async fn login(&self, username: &str, _password: &SecretString) -> Result<Credential, Error> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            assert_eq!(username, "pool@example.com");
            if self.reject_login {
                return Err(Error::InvalidCredentials);
            }
            Ok(issued(Some("r-login")))
        }
    }

    fn full_credentials() -> AccountCredentials {
        AccountCredentials {
            username: Some("pool@example.com".into()),
            password: Some(secret("hunter2")),
            refresh_token: Some(secret("r1")),
        }
    }

    fn stale(refresh: &str) -> Credential {
        Credential::from_parts(
            secret("old"),
            Utc::now() + TimeDelta::seconds(30),
            Some(secret(refresh)),
        )
    }

    #[tokio::test]
    async fn fresh_cache_makes_no_calls() {
        let cached = issued(Some("r1"));
        let session = SessionManager::with_credential(full_credentials(), cached.clone());
        let auth = FakeAuth::default();

        let credential = session.credential(&auth).await.unwrap();

        assert_eq!(
            credential.access_token().expose_secret(),
            cached.access_token().expose_secret()
        );
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(auth.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_once() {
        let session = SessionManager::with_credential(full_credentials(), stale("r1"));
        let auth = FakeAuth::default();

        let credential = session.credential(&auth).await.unwrap();

        assert_eq!(credential.refresh_token().unwrap().expose_secret(), "r2");
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(auth.logins.load(Ordering::SeqCst), 0);
        assert_eq!(session.refresh_token().await.unwrap().expose_secret(), "r2");
    }

    #[tokio::test]
    async fn rejected_refresh_falls_back_to_login() {
        let session = SessionManager::with_credential(full_credentials(), stale("r1"));
        let auth = FakeAuth {
            reject_refresh: true,
            ..FakeAuth::default()
        };

        let credential = session.credential(&auth).await.unwrap();

        assert_eq!(credential.refresh_token().unwrap().expose_secret(), "r-login");
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(auth.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_refresh_without_password_is_not_authenticated() {
        let session = SessionManager::new(AccountCredentials::refresh_token(secret("r1")));
        let auth = FakeAuth {
            reject_refresh: true,
            ..FakeAuth::default()
        };

        let err = session.credential(&auth).await.unwrap_err();

        assert!(matches!(err, Error::NotAuthenticated));
        assert!(session.refresh_token().await.is_none());
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_refresh_propagates_without_login() {
        let session = SessionManager::with_credential(full_credentials(), stale("r1"));
        let auth = FakeAuth {
            refresh_unavailable: true,
            ..FakeAuth::default()
        };

        let err = session.credential(&auth).await.unwrap_err();

        assert!(matches!(err, Error::ApiUnavailable { .. }));
        assert_eq!(auth.logins.load(Ordering::SeqCst), 0);
        assert!(session.refresh_token().await.is_some());
    }

    #[tokio::test]
    async fn rejected_login_surfaces_invalid_credentials() {
        let session = SessionManager::new(AccountCredentials::password(
            "pool@example.com",
            secret("wrong"),
        ));
        let auth = FakeAuth {
            reject_login: true,
            ..FakeAuth::default()
        };

        let err = session.credential(&auth).await.unwrap_err();

        assert!(matches!(err, Error::InvalidCredentials));
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn nothing_held_is_not_authenticated() {
        let session = SessionManager::new(AccountCredentials::default());
        let err = session.credential(&FakeAuth::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[tokio::test]
    async fn renew_skips_fresh_cache() {
        let cached = issued(Some("r1"));
        let session = SessionManager::with_credential(full_credentials(), cached.clone());
        let auth = FakeAuth::default();

        session.renew(&auth, cached.access_token()).await.unwrap();

        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_renewals_of_one_token_refresh_once() {
        let exp = (Utc::now() + TimeDelta::hours(2)).timestamp();
        let cached =
            Credential::from_access_token(secret(&jwt_with_exp(exp)), Some(secret("r1"))).unwrap();
        let session = SessionManager::with_credential(full_credentials(), cached.clone());
        let auth = FakeAuth::default();

        let (a, b) = tokio::join!(
            session.renew(&auth, cached.access_token()),
            session.renew(&auth, cached.access_token())
        );

        assert_eq!(
            a.unwrap().access_token().expose_secret(),
            b.unwrap().access_token().expose_secret()
        );
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn holds_token_tracks_refresh_token_alone() {
        let session = SessionManager::new(AccountCredentials::refresh_token(secret("r1")));
        assert!(session.holds_token().await);

        session.clear().await;
        assert!(!session.holds_token().await);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let session = SessionManager::with_credential(full_credentials(), stale("r1"));
        let auth = FakeAuth::default();

        let (a, b) = tokio::join!(session.credential(&auth), session.credential(&auth));

        a.unwrap();
        b.unwrap();
        assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_forgets_all_tokens() {
        let session = SessionManager::with_credential(full_credentials(), issued(Some("r1")));
        session.clear().await;
        assert!(session.refresh_token().await.is_none());
        assert!(session.access_token_expiration().await.is_none());
    }
}

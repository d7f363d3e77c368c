//! Shared configuration for Aseko clients.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to an [`AccountConfig`] that builds the matching
//! `aseko_api` account.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use aseko_api::{
    AccountCredentials, CloudAccount, Endpoints, MobileAccount, TransportConfig, WebAccount,
};

const KEYRING_SERVICE: &str = "aseko";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to build account: {0}")]
    Api(#[from] aseko_api::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Which upstream API a profile talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Legacy web API, cookie session.
    Web,
    /// Legacy mobile API, access + refresh tokens.
    Mobile,
    /// Cloud GraphQL API.
    #[default]
    Cloud,
}

/// A named account profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub kind: AccountKind,

    /// Username (legacy) or e-mail (cloud).
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Refresh token (plaintext -- prefer keyring).
    pub refresh_token: Option<String>,

    /// Serve every API from this base URL instead of production.
    pub base_url: Option<String>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "aseko", "aseko").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("aseko");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file yields defaults.
///
/// Environment variables `ASEKO_*` override file values; `_` separates
/// nesting levels (`ASEKO_DEFAULTS_TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ASEKO_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str, item: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{item}"))
}

fn keyring_secret(profile_name: &str, item: &str) -> Option<SecretString> {
    keyring_entry(profile_name, item)
        .and_then(|entry| entry.get_password())
        .ok()
        .map(SecretString::from)
}

/// Resolve the password: `password_env` → keyring → plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_password_with(profile, profile_name, |name| std::env::var(name).ok())
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    // 1. Profile's password_env → env var lookup
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Some(SecretString::from(pw));
    }

    // 2. System keyring
    if let Some(pw) = keyring_secret(profile_name, "password") {
        return Some(pw);
    }

    // 3. Plaintext in config
    profile.password.clone().map(SecretString::from)
}

/// Resolve the refresh token: keyring → plaintext.
pub fn resolve_refresh_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    keyring_secret(profile_name, "refresh-token")
        .or_else(|| profile.refresh_token.clone().map(SecretString::from))
}

/// Save a refresh token to the system keyring so the next run can resume
/// without a password login.
pub fn store_refresh_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "refresh-token")?.set_password(token.expose_secret())?;
    debug!(profile = profile_name, "refresh token stored in keyring");
    Ok(())
}

/// Resolve the credentials a profile's account needs.
///
/// Web accounts need username + password. Mobile and cloud accounts need
/// username + password, a refresh token, or both.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<AccountCredentials, ConfigError> {
    let credentials = AccountCredentials {
        username: profile.username.clone(),
        password: resolve_password(profile, profile_name),
        refresh_token: match profile.kind {
            AccountKind::Web => None,
            AccountKind::Mobile | AccountKind::Cloud => {
                resolve_refresh_token(profile, profile_name)
            }
        },
    };
    check_credentials(profile.kind, credentials, profile_name)
}

fn check_credentials(
    kind: AccountKind,
    credentials: AccountCredentials,
    profile_name: &str,
) -> Result<AccountCredentials, ConfigError> {
    let can_login = credentials.username.is_some() && credentials.password.is_some();
    let usable = match kind {
        AccountKind::Web => can_login,
        AccountKind::Mobile | AccountKind::Cloud => {
            can_login || credentials.refresh_token.is_some()
        }
    };
    if usable {
        Ok(credentials)
    } else {
        Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
    }
}

// ── Account construction ────────────────────────────────────────────

/// Everything needed to build one account.
#[derive(Debug)]
pub struct AccountConfig {
    pub kind: AccountKind,
    pub credentials: AccountCredentials,
    pub transport: TransportConfig,
}

/// A built account of any kind.
pub enum Account {
    Web(WebAccount),
    Mobile(MobileAccount),
    Cloud(CloudAccount),
}

impl AccountConfig {
    /// Build the account this config describes.
    pub fn build(self) -> Result<Account, ConfigError> {
        Ok(match self.kind {
            AccountKind::Web => {
                let (Some(username), Some(password)) =
                    (self.credentials.username, self.credentials.password)
                else {
                    return Err(ConfigError::Validation {
                        field: "username".into(),
                        reason: "web accounts need a username and password".into(),
                    });
                };
                Account::Web(WebAccount::new(username, password, &self.transport)?)
            }
            AccountKind::Mobile => {
                Account::Mobile(MobileAccount::new(self.credentials, &self.transport)?)
            }
            AccountKind::Cloud => {
                Account::Cloud(CloudAccount::new(self.credentials, &self.transport)?)
            }
        })
    }
}

/// Build an `AccountConfig` from a profile.
pub fn profile_to_account_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<AccountConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;
    transport_for(profile, defaults).map(|transport| AccountConfig {
        kind: profile.kind,
        credentials,
        transport,
    })
}

fn transport_for(profile: &Profile, defaults: &Defaults) -> Result<TransportConfig, ConfigError> {
    let endpoints = match profile.base_url.as_deref() {
        Some(base) => {
            url::Url::parse(base).map_err(|e| ConfigError::Validation {
                field: "base_url".into(),
                reason: format!("invalid URL {base}: {e}"),
            })?;
            Endpoints::with_base(base)?
        }
        None => Endpoints::default(),
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(TransportConfig {
        timeout,
        ..TransportConfig::default()
    }
    .with_endpoints(endpoints))
}

#![allow(clippy::unwrap_used)]
// Integration tests for config loading, saving, and account construction.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use aseko_config::{
    Account, AccountKind, Config, ConfigError, Defaults, Profile, load_config_from,
    profile_to_account_config, save_config_to,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn write_config(contents: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), contents).unwrap();
    dir
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert_eq!(config.defaults.timeout, 30);
    assert!(config.profiles.is_empty());
}

#[test]
fn profiles_load_from_toml() {
    let dir = write_config(
        r#"
default_profile = "home"

[defaults]
timeout = 12

[profiles.home]
kind = "mobile"
username = "pool@example.com"
password = "hunter2"
refresh_token = "r1"

[profiles.cloud]
username = "pool@example.com"
password_env = "ASEKO_CLOUD_PASSWORD"
"#,
    );

    let config = load_config_from(&dir.path().join("config.toml")).unwrap();

    assert_eq!(config.defaults.timeout, 12);
    let (name, home) = config.profile(None).unwrap();
    assert_eq!(name, "home");
    assert_eq!(home.kind, AccountKind::Mobile);
    assert_eq!(home.refresh_token.as_deref(), Some("r1"));

    let (_, cloud) = config.profile(Some("cloud")).unwrap();
    assert_eq!(cloud.kind, AccountKind::Cloud);
    assert_eq!(cloud.password_env.as_deref(), Some("ASEKO_CLOUD_PASSWORD"));
}

#[test]
fn unknown_profile_is_reported() {
    let config = Config::default();
    assert!(matches!(
        config.profile(Some("nowhere")),
        Err(ConfigError::UnknownProfile(name)) if name == "nowhere"
    ));
}

#[test]
fn invalid_kind_fails_to_load() {
    let dir = write_config(
        r#"
[profiles.bad]
kind = "satellite"
"#,
    );
    assert!(matches!(
        load_config_from(&dir.path().join("config.toml")),
        Err(ConfigError::Figment(_))
    ));
}

// ── Saving ──────────────────────────────────────────────────────────

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut profiles = HashMap::new();
    profiles.insert(
        "pool".to_owned(),
        Profile {
            kind: AccountKind::Web,
            username: Some("pool@example.com".into()),
            password: Some("hunter2".into()),
            timeout: Some(5),
            ..Profile::default()
        },
    );
    let config = Config {
        default_profile: Some("pool".into()),
        defaults: Defaults { timeout: 20 },
        profiles,
    };

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    let (_, pool) = loaded.profile(None).unwrap();
    assert_eq!(pool.kind, AccountKind::Web);
    assert_eq!(pool.username.as_deref(), Some("pool@example.com"));
    assert_eq!(pool.timeout, Some(5));
    assert_eq!(loaded.defaults.timeout, 20);
}

// ── Account construction ────────────────────────────────────────────

#[test]
fn mobile_profile_builds_mobile_account() {
    let profile = Profile {
        kind: AccountKind::Mobile,
        refresh_token: Some("r1".into()),
        base_url: Some("http://127.0.0.1:9".into()),
        ..Profile::default()
    };

    let account_config =
        profile_to_account_config(&profile, "aseko-config-test-mobile", &Defaults::default())
            .unwrap();

    assert_eq!(account_config.kind, AccountKind::Mobile);
    assert_eq!(
        account_config
            .credentials
            .refresh_token
            .as_ref()
            .unwrap()
            .expose_secret(),
        "r1"
    );
    assert_eq!(
        account_config.transport.endpoints.web.as_str(),
        "http://127.0.0.1:9/api/"
    );
    assert!(matches!(account_config.build().unwrap(), Account::Mobile(_)));
}

#[test]
fn web_profile_without_password_has_no_credentials() {
    let profile = Profile {
        kind: AccountKind::Web,
        username: Some("pool@example.com".into()),
        refresh_token: Some("ignored".into()),
        ..Profile::default()
    };

    let result =
        profile_to_account_config(&profile, "aseko-config-test-web", &Defaults::default());
    assert!(matches!(result, Err(ConfigError::NoCredentials { .. })));
}

#[test]
fn cloud_profile_builds_cloud_account() {
    let profile = Profile {
        username: Some("pool@example.com".into()),
        password: Some("hunter2".into()),
        ..Profile::default()
    };

    let account_config =
        profile_to_account_config(&profile, "aseko-config-test-cloud", &Defaults::default())
            .unwrap();

    assert_eq!(account_config.transport.timeout.as_secs(), 30);
    assert!(matches!(account_config.build().unwrap(), Account::Cloud(_)));
}

//! Configuration layering: defaults, TOML file and environment

use ewange_home::{DashboardConfig, HomeError};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Write;
use std::time::Duration;

const ENV_VARS: [&str; 9] = [
    "EWANGE_DB_URL",
    "EWANGE_DB_AUTH",
    "EWANGE_TIMEOUT",
    "EWANGE_CHAT_URL",
    "EWANGE_CHAT_KEY",
    "EWANGE_ADMIN_URL",
    "EWANGE_ACCESS_TOKEN",
    "EWANGE_USER_ID",
    "EWANGE_USER_EMAIL",
];

fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
    with_overrides(&[])
}

/// Every variable cleared except the given overrides
fn with_overrides(
    overrides: &[(&'static str, &'static str)],
) -> Vec<(&'static str, Option<&'static str>)> {
    ENV_VARS
        .iter()
        .map(|var| {
            let value = overrides.iter().find(|(k, _)| k == var).map(|(_, v)| *v);
            (*var, value)
        })
        .collect()
}

#[test]
#[serial]
fn test_defaults_are_valid() {
    temp_env::with_vars(cleared(), || {
        let config = DashboardConfig::from_env().unwrap();
        config.validate().unwrap();
        assert_eq!(config.store.timeout, Duration::from_secs(10));
        assert_eq!(config.assistant.max_line_retries, 1);
        assert_eq!(config.dashboard.parking_capacity, 5);
        assert!(config.session.user_id.is_none());
    });
}

#[test]
#[serial]
fn test_environment_overrides() {
    let vars = with_overrides(&[
        ("EWANGE_DB_URL", "https://home-rtdb.example.com"),
        ("EWANGE_DB_AUTH", "db-secret"),
        ("EWANGE_TIMEOUT", "3"),
        ("EWANGE_CHAT_URL", "https://assistant.example.com/chat"),
        ("EWANGE_USER_ID", "u1"),
    ]);
    temp_env::with_vars(vars, || {
        let config = DashboardConfig::from_env().unwrap();
        assert_eq!(config.store.url.as_str(), "https://home-rtdb.example.com/");
        assert_eq!(config.store.auth_token.as_deref(), Some("db-secret"));
        assert_eq!(config.store.timeout, Duration::from_secs(3));
        assert!(config.assistant.chat_url.is_some());
        assert_eq!(config.session.user_id.as_deref(), Some("u1"));
    });
}

#[test]
#[serial]
fn test_invalid_environment_values() {
    temp_env::with_vars(with_overrides(&[("EWANGE_TIMEOUT", "soon")]), || {
        assert!(matches!(
            DashboardConfig::from_env(),
            Err(HomeError::Config(_))
        ));
    });
    temp_env::with_vars(with_overrides(&[("EWANGE_DB_URL", "not a url")]), || {
        assert!(DashboardConfig::from_env().is_err());
    });
}

#[test]
#[serial]
fn test_toml_file_with_env_on_top() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[store]
url = "https://file.example.com"
timeout = "4s"

[assistant]
max_line_retries = 3

[dashboard]
parking_capacity = 8
"#
    )
    .unwrap();

    let vars = with_overrides(&[("EWANGE_DB_AUTH", "from-env")]);
    temp_env::with_vars(vars, || {
        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.store.url.as_str(), "https://file.example.com/");
        assert_eq!(config.store.timeout, Duration::from_secs(4));
        assert_eq!(config.store.auth_token.as_deref(), Some("from-env"));
        assert_eq!(config.assistant.max_line_retries, 3);
        assert_eq!(config.dashboard.parking_capacity, 8);
        assert_eq!(config.session.role_timeout, Duration::from_secs(5));
    });
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = DashboardConfig::default();
    config.dashboard.parking_capacity = 0;
    assert!(config.validate().is_err());

    let mut config = DashboardConfig::default();
    config.admin.url = Some("ftp://admin.example.com".parse().unwrap());
    assert!(config.validate().is_err());
}

#[test]
fn test_toml_round_trip_of_defaults() {
    let config = DashboardConfig::default();
    let text = config.to_toml().unwrap();
    let parsed: DashboardConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed.store.timeout, config.store.timeout);
    assert_eq!(parsed.store.url, config.store.url);
}

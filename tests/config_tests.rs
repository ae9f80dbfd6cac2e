//! Tests for watchdog.toml resolution.

use std::fs;
use tempfile::TempDir;
use watchdog_cnb::{DEFAULT_PROCESS_TYPE, DEFAULT_VERSION, Error, ErrorKind, WatchdogConfig};

#[test]
fn test_resolve_partial_config() {
    let app = TempDir::new().unwrap();
    fs::write(
        app.path().join("watchdog.toml"),
        "[watchdog]\nprocess_type = \"worker\"\n",
    )
    .unwrap();

    let config = WatchdogConfig::resolve(app.path()).unwrap();

    assert_eq!(config.version, DEFAULT_VERSION);
    assert_eq!(config.process_type, "worker");
    assert!(config.env.is_empty());
}

#[test]
fn test_resolve_without_watchdog_table() {
    let app = TempDir::new().unwrap();
    fs::write(app.path().join("watchdog.toml"), "# nothing here\n").unwrap();

    let config = WatchdogConfig::resolve(app.path()).unwrap();

    assert_eq!(config.version, DEFAULT_VERSION);
    assert_eq!(config.process_type, DEFAULT_PROCESS_TYPE);
}

#[test]
fn test_resolve_malformed_config() {
    let app = TempDir::new().unwrap();
    fs::write(app.path().join("watchdog.toml"), "[watchdog]\nversion = 1.2.3.4\n").unwrap();

    let err = WatchdogConfig::resolve(app.path()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    match err {
        Error::Parse { path, .. } => assert!(path.ends_with("watchdog.toml")),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_resolve_wrong_type_is_parse_error() {
    let app = TempDir::new().unwrap();
    fs::write(
        app.path().join("watchdog.toml"),
        "[watchdog]\nversion = \"1.0.0\"\n[watchdog.env]\nport = 8080\n",
    )
    .unwrap();

    let err = WatchdogConfig::resolve(app.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_resolve_checksum() {
    let app = TempDir::new().unwrap();
    fs::write(
        app.path().join("watchdog.toml"),
        "[watchdog]\nsha256 = \"abc123\"\n",
    )
    .unwrap();

    let config = WatchdogConfig::resolve(app.path()).unwrap();
    assert_eq!(config.sha256.as_deref(), Some("abc123"));
}

#[test]
fn test_resolve_non_utf8_is_parse_error() {
    let app = TempDir::new().unwrap();
    fs::write(
        app.path().join("watchdog.toml"),
        b"[watchdog]\nversion = \"\xff\xfe\"\n",
    )
    .unwrap();

    let err = WatchdogConfig::resolve(app.path()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(err.exit_code(), watchdog_cnb::PARSE_CONFIG_ERROR);
}

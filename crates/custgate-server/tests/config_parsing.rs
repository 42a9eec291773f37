use std::fs;

use custgate_server::config::loader::load_config;
use tempfile::TempDir;

#[test]
fn test_load_config_from_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custgate.toml");
    fs::write(
        &path,
        r#"
[server]
host = "127.0.0.1"
port = 9191

[cache]
url = "sqlite::memory:"
max_connections = 1

[session]
cookie_name = "gw"
secure = true
validation_timeout_ms = 1500

[remote]
base_url = "http://localhost:9000/api/"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let cfg = load_config(path.to_str()).unwrap();
    assert_eq!(cfg.addr().to_string(), "127.0.0.1:9191");
    assert_eq!(cfg.cache.url, "sqlite::memory:");
    assert_eq!(cfg.session.cookie_name, "gw");
    assert!(cfg.session.secure);
    assert_eq!(cfg.session.validation_timeout_ms, 1500);
    assert_eq!(
        cfg.remote.base_url.as_deref(),
        Some("http://localhost:9000/api/")
    );
    assert_eq!(cfg.logging.level, "debug");
    // Unset sections keep their defaults
    assert_eq!(cfg.remote.request_timeout_ms, 30_000);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let cfg = load_config(path.to_str()).unwrap();
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.cache.url, "sqlite://customers.db");
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custgate.toml");
    fs::write(
        &path,
        r#"
[session]
cookie_secret = "too-short"
"#,
    )
    .unwrap();

    let err = load_config(path.to_str()).unwrap_err();
    assert!(err.contains("cookie_secret"));
}

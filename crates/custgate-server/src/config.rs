use std::{net::SocketAddr, time::Duration};

use custgate_cache::CacheSettings;
use custgate_remote::erply::ErplySettings;
use serde::{Deserialize, Serialize};

/// Minimum cookie secret length accepted for signing keys.
pub const MIN_COOKIE_SECRET_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Query cache storage
    #[serde(default)]
    pub cache: CacheConfig,
    /// Session cookie and revalidation settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Remote customer API
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.cache.url.is_empty() {
            return Err("cache.url must not be empty".into());
        }
        if self.cache.max_connections == 0 {
            return Err("cache.max_connections must be > 0".into());
        }
        if self.session.cookie_name.is_empty() {
            return Err("session.cookie_name must not be empty".into());
        }
        if self.session.validation_timeout_ms == 0 {
            return Err("session.validation_timeout_ms must be > 0".into());
        }
        if let Some(secret) = &self.session.cookie_secret
            && secret.len() < MIN_COOKIE_SECRET_LEN
        {
            return Err(format!(
                "session.cookie_secret must be at least {MIN_COOKIE_SECRET_LEN} bytes"
            ));
        }
        if self.remote.request_timeout_ms == 0 {
            return Err("remote.request_timeout_ms must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// SQLite query cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite URL, e.g. `sqlite://customers.db` or `sqlite::memory:`
    #[serde(default = "default_cache_url")]
    pub url: String,
    #[serde(default = "default_cache_max_connections")]
    pub max_connections: u32,
}

fn default_cache_url() -> String {
    "sqlite://customers.db".into()
}
fn default_cache_max_connections() -> u32 {
    5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
            max_connections: default_cache_max_connections(),
        }
    }
}

impl CacheConfig {
    pub fn settings(&self) -> CacheSettings {
        CacheSettings {
            url: self.url.clone(),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Secret used to sign session cookies. A random key is generated per
    /// process when unset.
    #[serde(default)]
    pub cookie_secret: Option<String>,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure: bool,
    /// Upper bound for resolving and probing a session on each request
    #[serde(default = "default_validation_timeout_ms")]
    pub validation_timeout_ms: u64,
}

fn default_cookie_name() -> String {
    "session-name".into()
}
fn default_validation_timeout_ms() -> u64 {
    30_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_secret: None,
            secure: false,
            validation_timeout_ms: default_validation_timeout_ms(),
        }
    }
}

impl SessionConfig {
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Fixed API endpoint; derived from the account code when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn settings(&self) -> ErplySettings {
        ErplySettings {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "custgate.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CUSTGATE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("CUSTGATE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

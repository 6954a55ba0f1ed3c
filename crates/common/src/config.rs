//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "CONTENT_POLL";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration. The posts-summary cache stays in-process when absent.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    /// Voter token configuration.
    #[serde(default)]
    pub voting: VotingConfig,
    /// Analytics rollup configuration.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Admin endpoint configuration.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Voter token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// Server-side secret mixed into every voter token hash.
    #[serde(default)]
    pub token_secret: String,
    /// Name of the anonymous voter cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Whether the voter cookie carries the `Secure` attribute.
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            cookie_name: default_cookie_name(),
            secure_cookie: false,
        }
    }
}

/// Analytics rollup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Posts-summary cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Upper bound for one rollup rebuild, in seconds.
    #[serde(default = "default_rollup_timeout_secs")]
    pub rollup_timeout_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            rollup_timeout_secs: default_rollup_timeout_secs(),
        }
    }
}

impl AnalyticsConfig {
    /// Cache TTL as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Rollup timeout as a [`Duration`].
    #[must_use]
    pub const fn rollup_timeout(&self) -> Duration {
        Duration::from_secs(self.rollup_timeout_secs)
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Bearer token required by admin endpoints. Admin endpoints are disabled when unset.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_redis_prefix() -> String {
    "content_poll".to_string()
}

fn default_cookie_name() -> String {
    "content_poll_token".to_string()
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

const fn default_rollup_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (via `dotenvy`, when present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `CONTENT_POLL_ENV`)
    /// 4. Environment variables with `CONTENT_POLL__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("CONTENT_POLL_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml(
            r#"
            [database]
            url = "postgres://localhost/content_poll"
            "#,
        )
        .unwrap_or_else(|e| panic!("config should parse: {e}"));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 20);
        assert!(config.redis.is_none());
        assert_eq!(config.voting.cookie_name, "content_poll_token");
        assert!(config.voting.token_secret.is_empty());
        assert_eq!(config.analytics.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.analytics.rollup_timeout(), Duration::from_secs(30));
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_explicit_sections() {
        let config = Config::from_toml(
            r#"
            [database]
            url = "postgres://localhost/content_poll"

            [redis]
            url = "redis://localhost:6379"

            [voting]
            token_secret = "s3cret"
            secure_cookie = true

            [analytics]
            cache_ttl_secs = 60

            [admin]
            token = "admin-token"
            "#,
        )
        .unwrap_or_else(|e| panic!("config should parse: {e}"));

        let redis = config.redis.unwrap_or_else(|| panic!("redis section missing"));
        assert_eq!(redis.prefix, "content_poll");
        assert_eq!(config.voting.token_secret, "s3cret");
        assert!(config.voting.secure_cookie);
        assert_eq!(config.analytics.cache_ttl_secs, 60);
        assert_eq!(config.analytics.rollup_timeout_secs, 30);
        assert_eq!(config.admin.token.as_deref(), Some("admin-token"));
    }

    #[test]
    fn test_missing_database_is_error() {
        assert!(Config::from_toml("[server]\nport = 8080\n").is_err());
    }
}

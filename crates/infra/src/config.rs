//! Configuration loading and representation.
//!
//! Everything comes from the process environment. Unset variables fall back to
//! development defaults; set-but-malformed numeric values are an error.

use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Postgres connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Process-wide gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub http_port: u16,
    /// Use Postgres-backed stores instead of the in-memory ones.
    pub use_persistent_stores: bool,
    pub database: DatabaseConfig,
    /// Upper bound on waiting for an account row lock.
    pub lock_timeout: Duration,
}

impl GatewayConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let url = match lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => url,
            None => database_url(&get)?,
        };

        let lock_timeout_ms: u64 = parse("LOCK_TIMEOUT_MS", get("LOCK_TIMEOUT_MS", "5000"))?;

        Ok(Self {
            http_port: parse("HTTP_PORT", get("HTTP_PORT", "8080"))?,
            use_persistent_stores: parse("USE_PERSISTENT_STORES", get("USE_PERSISTENT_STORES", "false"))?,
            database: DatabaseConfig {
                url,
                max_connections: parse("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS", "10"))?,
            },
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        })
    }
}

/// Assemble a connection URL from `DB_*` parts, percent-encoding each one.
fn database_url<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str, &str) -> String,
{
    let host = get("DB_HOST", "db");
    let port: u16 = parse("DB_PORT", get("DB_PORT", "5432"))?;
    let user = get("DB_USER", "postgres");
    let password = get("DB_PASSWORD", "postgres");

    let invalid = |key: &'static str, value: String| ConfigError::Invalid { key, value };

    let mut url = Url::parse("postgres://localhost").map_err(|e| invalid("DB_HOST", e.to_string()))?;
    url.set_host(Some(&host)).map_err(|_| invalid("DB_HOST", host.clone()))?;
    url.set_port(Some(port)).map_err(|_| invalid("DB_PORT", port.to_string()))?;
    url.set_username(&user).map_err(|_| invalid("DB_USER", user.clone()))?;
    url.set_password(Some(&password))
        .map_err(|_| invalid("DB_PASSWORD", "<redacted>".to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("DB_NAME", get("DB_NAME", "gateway")))?
        .push(&get("DB_NAME", "gateway"));
    url.query_pairs_mut()
        .append_pair("sslmode", &get("DB_SSL_MODE", "disable"));

    Ok(url.into())
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value })
}

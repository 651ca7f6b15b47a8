//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL; the in-memory store is used when unset
    pub database_url: Option<String>,

    /// JWT validation
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,

    /// Streaming reply behaviour
    pub streaming_enabled: bool,
    pub stream_timeout_secs: u64,
    pub subscriber_queue_capacity: usize,

    /// Agent used when a request names none
    pub default_agent: Option<String>,

    /// Runtime configuration
    pub log_format: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    #[mutants::skip] // Reads the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is required"))?,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
            jwt_audience: env::var("JWT_AUDIENCE").ok(),

            streaming_enabled: parse_or("STREAMING_ENABLED", true),
            stream_timeout_secs: parse_or("STREAM_TIMEOUT_SECS", 120),
            subscriber_queue_capacity: parse_or("SUBSCRIBER_QUEUE_CAPACITY", 64),

            default_agent: env::var("DEFAULT_AGENT").ok().filter(|v| !v.is_empty()),

            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            port: parse_or("PORT", 3000),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_queue_capacity == 0 {
            anyhow::bail!("SUBSCRIBER_QUEUE_CAPACITY must be at least 1");
        }
        if self.stream_timeout_secs == 0 {
            anyhow::bail!("STREAM_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

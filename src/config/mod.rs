//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Connection strings are wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::str::FromStr;

/// Which store backend holds the queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreKind::Redis),
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(Error::Config(format!("unknown store backend: {other}"))),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StoreKind::Redis => "redis",
            StoreKind::Postgres => "postgres",
            StoreKind::Memory => "memory",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct Config {
    pub store: StoreKind,
    /// Connection URL for the chosen backend. `None` only for `memory`.
    pub store_url: Option<SecretString>,
    pub key_prefix: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// For Redis, a missing `PQUEUE_STORE_URL` falls back to
    /// `REDIS_HOST`/`REDIS_PORT` (default `127.0.0.1:6379`).
    pub fn from_env() -> Result<Self> {
        let store = match std::env::var("PQUEUE_STORE") {
            Ok(s) => s.parse()?,
            Err(_) => StoreKind::Redis,
        };

        let store_url = match store {
            StoreKind::Redis => Some(SecretString::from(
                std::env::var("PQUEUE_STORE_URL").unwrap_or_else(|_| default_redis_url()),
            )),
            StoreKind::Postgres => Some(SecretString::from(required_var("PQUEUE_STORE_URL")?)),
            StoreKind::Memory => None,
        };

        let key_prefix = std::env::var("PQUEUE_KEY_PREFIX").unwrap_or_else(|_| "pq".to_string());
        if key_prefix.is_empty() {
            return Err(Error::Config("PQUEUE_KEY_PREFIX must not be empty".to_string()));
        }

        Ok(Self {
            store,
            store_url,
            key_prefix,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn default_redis_url() -> String {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
    format!("redis://{host}:{port}")
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

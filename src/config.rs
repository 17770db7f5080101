//! Service configuration loaded from environment variables (and `.env`).

use std::time::Duration;

use thiserror::Error;

use crate::application::order_workflow::CancellationPolicy;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Reads from environment variables:
/// - `DATABASE_URL` (required)
/// - `REDIS_URL` (default `redis://127.0.0.1:6379`)
/// - `HOST` / `PORT` (default `0.0.0.0:8080`)
/// - `CART_TTL_SECS` (default one day)
/// - `CANCELLATION_WINDOW_SECS` (default ten minutes)
/// - `ALLOW_CANCEL_CONFIRMED` (default `false`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
    pub cart_ttl: Duration,
    pub cancellation_window: chrono::Duration,
    pub allow_cancel_confirmed: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            database_url,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            cart_ttl: Duration::from_secs(parse_or(&lookup, "CART_TTL_SECS", 86_400)?),
            cancellation_window: chrono::Duration::seconds(i64::from(parse_or::<_, u32>(
                &lookup,
                "CANCELLATION_WINDOW_SECS",
                600,
            )?)),
            allow_cancel_confirmed: parse_or(&lookup, "ALLOW_CANCEL_CONFIRMED", false)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cancellation_policy(&self) -> CancellationPolicy {
        CancellationPolicy {
            window: self.cancellation_window,
            allow_confirmed: self.allow_cancel_confirmed,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

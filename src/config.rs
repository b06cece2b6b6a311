// src/config.rs
use std::{env, fmt::Display, str::FromStr};

use http::HeaderValue;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SESSION_COOKIE: &str = "session";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Unset selects the in-process store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Base URL used when building share links, without a trailing slash.
    pub public_url: String,
    pub session_cookie: String,
    pub cors_origin: Option<HeaderValue>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            public_url: format!("http://localhost:{DEFAULT_PORT}"),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let port = try_load("PORT", DEFAULT_PORT)?;
        let max_connections = try_load("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;

        let database_url = var("DATABASE_URL");
        if database_url.is_none() {
            warn!("DATABASE_URL not set, falling back to the in-process store");
        }

        let public_url = var("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let session_cookie =
            var("SESSION_COOKIE").unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());

        let cors_origin = var("CORS_ORIGIN")
            .map(|origin| {
                HeaderValue::from_str(&origin).map_err(|e| ConfigError::Invalid {
                    key: "CORS_ORIGIN",
                    value: origin.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            port,
            database_url,
            max_connections,
            public_url,
            session_cookie,
            cors_origin,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Invalid {key} value: {e}");
                Err(ConfigError::Invalid {
                    key,
                    value: raw,
                    reason: e.to_string(),
                })
            }
        },
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

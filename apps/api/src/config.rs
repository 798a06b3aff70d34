use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if a set variable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Required unless the server runs with in-memory storage.
    pub database_url: Option<String>,
    /// Sessions are kept in process memory when unset.
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub session_ttl: Duration,
    pub remember_me_ttl: Duration,
    pub password_max_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            redis_url: None,
            host: "127.0.0.1".to_string(),
            port: 5000,
            rust_log: "info".to_string(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            remember_me_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            password_max_length: 200,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            redis_url: optional_env("REDIS_URL"),
            host: optional_env("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port)?,
            rust_log: optional_env("RUST_LOG").unwrap_or(defaults.rust_log),
            session_ttl: Duration::from_secs(parse_env(
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )?),
            remember_me_ttl: Duration::from_secs(parse_env(
                "REMEMBER_ME_TTL_SECS",
                defaults.remember_me_ttl.as_secs(),
            )?),
            password_max_length: parse_env("PASSWORD_MAX_LENGTH", defaults.password_max_length)?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("Required environment variable 'DATABASE_URL' is not set")
    }

    pub fn session_ttl_for(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_ttl
        } else {
            self.session_ttl
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => parse_value(key, &raw),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .ok()
        .with_context(|| format!("{key} must be a valid {}, got '{raw}'", std::any::type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dev_server() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.password_max_length, 200);
    }

    #[test]
    fn test_remember_me_uses_long_ttl() {
        let config = Config::default();
        assert!(config.session_ttl_for(true) > config.session_ttl_for(false));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", " 8080 ").unwrap(), 8080);
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_missing_database_url_is_reported() {
        let err = Config::default().require_database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}

//! Process configuration, loaded once at startup and handed to the services.

use std::env;

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://tasks.db";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173";
const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    /// Enables the `Secure` flag on the session cookie.
    pub production: bool,
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_default();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            production: environment.eq_ignore_ascii_case("production"),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3000)?,
            bcrypt_cost: parse_var("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

use std::str::FromStr;

use crate::rate_limit::RateLimitConfig;

pub fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("JWT_SECRET must be at least {0} characters long")]
    WeakSecret(usize),
}

pub const MIN_SECRET_LEN: usize = 32;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub port: u16,
    pub data_dir: String,
    pub database_url: Option<String>,
    pub frontend_url: String,
    pub bcrypt_cost: u32,
    pub enable_hsts: bool,
    pub rate_limit_enabled: bool,
    pub rate_limits: RateLimitConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("PORT", 8000),
            data_dir: std::env::var("PHREDDIT_DATA_DIR").unwrap_or_else(|_| "data".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".into()),
            bcrypt_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST),
            enable_hsts: env_flag("ENABLE_HSTS"),
            rate_limit_enabled: std::env::var("RL_ENABLED").map(|_| env_flag("RL_ENABLED")).unwrap_or(true),
            rate_limits: RateLimitConfig::from_env(),
        }
    }

    /// Checks the secrets the server cannot run without.
    pub fn validate() -> Result<(), ConfigError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret(MIN_SECRET_LEN));
        }
        Ok(())
    }
}

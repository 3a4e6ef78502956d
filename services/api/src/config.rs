//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use jsonwebtoken::Algorithm;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Token signing settings.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub expiration_hours: i64,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub jwt: JwtConfig,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub generation_model: String,
    pub provider_timeout: Duration,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Token Settings ---
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        let algorithm_str = lookup("JWT_ALGORITHM").unwrap_or_else(|| "HS256".to_string());
        let algorithm = Algorithm::from_str(&algorithm_str)
            .ok()
            .filter(|alg| matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "JWT_ALGORITHM".to_string(),
                    format!("'{}' is not a supported HMAC algorithm", algorithm_str),
                )
            })?;

        let expiration_hours = parse_or("JWT_EXPIRATION_HOURS", &lookup, 1i64)?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&expiration_hours) {
            return Err(ConfigError::InvalidValue(
                "JWT_EXPIRATION_HOURS".to_string(),
                format!("must be between 1 and {} hours", MAX_TOKEN_TTL_HOURS),
            ));
        }

        // --- Load Generation Provider Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let openai_api_base = lookup("OPENAI_API_BASE");
        let generation_model =
            lookup("GENERATION_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let provider_timeout =
            Duration::from_secs(parse_or("PROVIDER_TIMEOUT_SECS", &lookup, 30u64)?);

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt: JwtConfig {
                secret,
                algorithm,
                expiration_hours,
            },
            openai_api_key,
            openai_api_base,
            generation_model,
            provider_timeout,
            cors_origin,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/flashcards"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.jwt.algorithm, Algorithm::HS256);
        assert_eq!(config.jwt.expiration_hours, 1);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.generation_model, "gpt-3.5-turbo");
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "JWT_SECRET"));
    }

    #[test]
    fn asymmetric_algorithms_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("JWT_ALGORITHM", "RS256"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "JWT_ALGORITHM"));
    }

    #[test]
    fn non_numeric_ttl_is_invalid() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("JWT_EXPIRATION_HOURS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "JWT_EXPIRATION_HOURS"));
    }

    #[test]
    fn ttl_outside_the_accepted_range_is_invalid() {
        for hours in ["0", "-3", "8785", "3000000000"] {
            let err = Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://x"),
                ("JWT_SECRET", "secret"),
                ("JWT_EXPIRATION_HOURS", hours),
            ]))
            .unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue(var, _) if var == "JWT_EXPIRATION_HOURS"),
                "{hours}: {err}"
            );
        }

        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("JWT_EXPIRATION_HOURS", "8784"),
        ]))
        .unwrap();
        assert_eq!(config.jwt.expiration_hours, MAX_TOKEN_TTL_HOURS);
    }
}

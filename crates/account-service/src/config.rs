use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default bcrypt cost factor (2^12 iterations).
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum accepted bcrypt cost factor.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum accepted bcrypt cost factor.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default access-token lifetime in minutes.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 20;

/// Upper bound on a configured token lifetime (one day).
pub const MAX_TOKEN_LIFETIME_MINUTES: i64 = 1440;

/// Minimum signing secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Which credential store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub bind_address: String,
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_lifetime_minutes: i64,
    pub bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store_backend", &self.store_backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("token_lifetime_minutes", &self.token_lifetime_minutes)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let store_backend = match vars.get("CREDENTIAL_STORE").map(String::as_str) {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "CREDENTIAL_STORE".to_string(),
                    reason: format!("expected 'postgres' or 'memory', got '{}'", other),
                })
            }
        };

        let database_url = vars.get("DATABASE_URL").cloned();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "Expected at least {} bytes, got {}",
                MIN_JWT_SECRET_BYTES,
                jwt_secret.len()
            )));
        }

        let jwt_issuer = required(vars, "JWT_VALID_ISSUER")?;
        let jwt_audience = required(vars, "JWT_VALID_AUDIENCE")?;

        let token_lifetime_minutes = parse_in_range(
            vars,
            "TOKEN_LIFETIME_MINUTES",
            DEFAULT_TOKEN_LIFETIME_MINUTES,
            1..=MAX_TOKEN_LIFETIME_MINUTES,
        )?;

        let bcrypt_cost = parse_in_range(
            vars,
            "BCRYPT_COST",
            DEFAULT_BCRYPT_COST,
            MIN_BCRYPT_COST..=MAX_BCRYPT_COST,
        )?;

        Ok(Config {
            store_backend,
            database_url,
            bind_address,
            jwt_secret: SecretString::from(jwt_secret.clone()),
            jwt_issuer,
            jwt_audience,
            token_lifetime_minutes,
            bcrypt_cost,
        })
    }

    /// Signing secret bytes for the token issuer and verifier.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.expose_secret().as_bytes()
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_in_range<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + fmt::Display + Copy,
{
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value: T = raw.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("'{}' is not a number", raw),
    })?;

    if !range.contains(&value) {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!(
                "{} is outside {}..={}",
                value,
                range.start(),
                range.end()
            ),
        });
    }

    Ok(value)
}

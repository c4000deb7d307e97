//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.
//! Every problem is reported as a [`ConfigError`]; nothing here panics.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::core::auth::jwt::{JwtConfig, JwtError};
use crate::core::auth::password::{
    BcryptHasher, DEFAULT_BCRYPT_COST, PasswordHasher, Sha256Hasher,
};
use crate::core::db::pool::{DbConfig, DbError};
use crate::core::mail::{MailError, SmtpConfig};
use crate::core::register::codes::DEFAULT_CODE_TTL;

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

/// Upper bound for `CONFIRMATION_CODE_TTL_SECS` (one day)
const MAX_CODE_TTL_SECS: u64 = 24 * 60 * 60;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Password digest used for every stored credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasherKind {
    Sha256,
    Bcrypt { cost: u32 },
}

impl HasherKind {
    pub fn build(self) -> Arc<dyn PasswordHasher> {
        match self {
            HasherKind::Sha256 => Arc::new(Sha256Hasher),
            HasherKind::Bcrypt { cost } => Arc::new(BcryptHasher::new(cost)),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Listen address (`SERVER_ADDR`)
    pub server_addr: SocketAddr,

    /// PostgreSQL settings; `None` runs on in-memory stores
    pub database: Option<DbConfig>,

    /// Token signing keys and lifetimes
    pub jwt: JwtConfig,

    /// `PASSWORD_HASHER` (`sha256` or `bcrypt`) and `BCRYPT_COST`
    pub password_hasher: HasherKind,

    /// SMTP relay; `None` logs mail instead of sending it
    pub smtp: Option<SmtpConfig>,

    /// Lifetime of emailed confirmation codes (`CONFIRMATION_CODE_TTL_SECS`)
    pub confirmation_code_ttl: Duration,

    /// `CORS_ALLOWED_ORIGINS`, comma separated; empty allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_addr = parse_or(&lookup, "SERVER_ADDR", || {
            DEFAULT_SERVER_ADDR.parse().map_err(|_| ConfigError::InvalidValue {
                name: "SERVER_ADDR",
                value: DEFAULT_SERVER_ADDR.to_string(),
            })
        })?;

        let database = match lookup("DATABASE_URL") {
            Some(url) if !url.is_empty() => Some(DbConfig::from_lookup(&lookup)?),
            _ => None,
        };

        let password_hasher = match lookup("PASSWORD_HASHER").as_deref() {
            None | Some("sha256") => HasherKind::Sha256,
            Some("bcrypt") => HasherKind::Bcrypt {
                cost: parse_or(&lookup, "BCRYPT_COST", || Ok(DEFAULT_BCRYPT_COST))?,
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "PASSWORD_HASHER",
                    value: other.to_string(),
                });
            }
        };

        let ttl_secs = parse_or(&lookup, "CONFIRMATION_CODE_TTL_SECS", || {
            Ok(DEFAULT_CODE_TTL.as_secs())
        })?;
        if !(1..=MAX_CODE_TTL_SECS).contains(&ttl_secs) {
            return Err(ConfigError::InvalidValue {
                name: "CONFIRMATION_CODE_TTL_SECS",
                value: ttl_secs.to_string(),
            });
        }

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr,
            database,
            jwt: JwtConfig::from_lookup(&lookup)?,
            password_hasher,
            smtp: SmtpConfig::from_lookup(&lookup)?,
            confirmation_code_ttl: Duration::from_secs(ttl_secs),
            cors_allowed_origins,
        })
    }

    /// Check if database is configured
    pub fn has_database(&self) -> bool {
        self.database.is_some()
    }

    /// Check if SMTP is configured
    pub fn has_smtp(&self) -> bool {
        self.smtp.is_some()
    }
}

/// Parse `name` if set, otherwise fall back to `default`
fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    default: impl FnOnce() -> Result<T, ConfigError>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => default(),
    }
}

//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use chrono::Duration;
use std::env;
use std::fmt;

/// Secret used when none is configured outside production.
pub const DEV_JWT_SECRET: &str = "dev-secret-key";

/// Longest accepted token lifetime.
pub const MAX_JWT_EXPIRES_IN_DAYS: i64 = 3650;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Credential and token configuration
    pub auth: AuthConfig,

    /// PostgreSQL connection string; in-memory store when absent
    pub database_url: Option<String>,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Path prefix for every route except `/health` (empty for root)
    pub prefix: String,
}

/// Credential and token configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Token signing secret
    pub jwt_secret: String,
    /// Token lifetime
    pub jwt_expires_in: Duration,
    /// bcrypt cost factor
    pub bcrypt_cost: u32,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Environment {
    /// Whether error responses may carry diagnostic detail.
    pub fn exposes_errors(self) -> bool {
        self != Environment::Production
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> DaemonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = load_environment(&lookup)?;
        let api = load_api_config(&lookup)?;
        let auth = load_auth_config(&lookup, environment)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            api,
            auth,
            database_url,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                prefix: "/api".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-key".to_string(),
                jwt_expires_in: Duration::days(7),
                bcrypt_cost: 4,
            },
            database_url: None,
            environment: Environment::Test,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3333,
                prefix: "/api".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expires_in: Duration::days(7),
                bcrypt_cost: 10,
            },
            database_url: None,
            environment: Environment::Development,
        }
    }
}

fn load_environment<F: Fn(&str) -> Option<String>>(lookup: &F) -> DaemonResult<Environment> {
    let env_str = lookup("ORDERLY_ENV").unwrap_or_else(|| "development".to_string());

    match env_str.to_lowercase().as_str() {
        "test" => Ok(Environment::Test),
        "development" | "dev" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(DaemonError::Config(format!(
            "Invalid ORDERLY_ENV: {}. Expected: test, development, production",
            other
        ))),
    }
}

fn load_api_config<F: Fn(&str) -> Option<String>>(lookup: &F) -> DaemonResult<ApiConfig> {
    let host = lookup("ORDERLY_API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port_str = lookup("ORDERLY_API_PORT").unwrap_or_else(|| "3333".to_string());

    let port = port_str
        .parse::<u16>()
        .map_err(|_| DaemonError::Config(format!("Invalid ORDERLY_API_PORT: {}", port_str)))?;

    let prefix = normalize_prefix(&lookup("ORDERLY_API_PREFIX").unwrap_or_else(|| "/api".to_string()));

    Ok(ApiConfig { host, port, prefix })
}

fn load_auth_config<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    environment: Environment,
) -> DaemonResult<AuthConfig> {
    let jwt_secret = match lookup("ORDERLY_JWT_SECRET").filter(|s| !s.is_empty()) {
        Some(secret) => secret,
        None if environment == Environment::Production => {
            return Err(DaemonError::Config(
                "ORDERLY_JWT_SECRET must be set in production".to_string(),
            ));
        },
        None => DEV_JWT_SECRET.to_string(),
    };

    let expires_str = lookup("ORDERLY_JWT_EXPIRES_IN").unwrap_or_else(|| "7d".to_string());
    let jwt_expires_in = parse_duration(&expires_str)
        .filter(|ttl| *ttl <= Duration::days(MAX_JWT_EXPIRES_IN_DAYS))
        .ok_or_else(|| {
            DaemonError::Config(format!(
                "Invalid ORDERLY_JWT_EXPIRES_IN: {}. Expected at most {}d",
                expires_str, MAX_JWT_EXPIRES_IN_DAYS
            ))
        })?;

    let cost_str = lookup("ORDERLY_BCRYPT_COST").unwrap_or_else(|| "10".to_string());
    let bcrypt_cost = cost_str
        .parse::<u32>()
        .ok()
        .filter(|cost| (4..=31).contains(cost))
        .ok_or_else(|| {
            DaemonError::Config(format!(
                "Invalid ORDERLY_BCRYPT_COST: {}. Expected 4..=31",
                cost_str
            ))
        })?;

    Ok(AuthConfig {
        jwt_secret,
        jwt_expires_in,
        bcrypt_cost,
    })
}

/// Parse `<n>d`, `<n>h`, `<n>m`, `<n>s` or plain seconds into a positive duration.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c.to_ascii_lowercase())),
        _ => (raw, None),
    };

    let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;
    match unit {
        Some('d') => Duration::try_days(amount),
        Some('h') => Duration::try_hours(amount),
        Some('m') => Duration::try_minutes(amount),
        Some('s') | None => Duration::try_seconds(amount),
        Some(_) => None,
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expires_in", &self.jwt_expires_in)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! # Server Configuration
//!
//! Everything the HTTP server needs at startup. Values come from the `serve`
//! command line (each flag also reads an environment variable, see
//! [`crate::cli::ServeArgs`]) and are checked once by
//! [`ServerConfig::validate`] before anything is bound.

use clap::ValueEnum;
use std::num::NonZeroU32;
use std::path::PathBuf;
use thiserror::Error;

/// Shortest accepted JWT signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:4000";

/// Default lifetime of issued tokens.
pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 30;

/// Default number of login attempts accepted per minute, server-wide.
pub const DEFAULT_LOGIN_RATE: u32 = 30;

/// Default capacity of the live message channel.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// bcrypt cost used for new password hashes.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

const MIB: u64 = 1024 * 1024;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Database size at which the startup cleanup deletes read conversations.
    #[must_use]
    pub fn db_size_limit_bytes(self) -> u64 {
        match self {
            Self::Test => 8 * MIB,
            Self::Development | Self::Production => 150 * MIB,
        }
    }
}

/// Web Push signing material.
#[derive(Debug, Clone)]
pub struct VapidConfig {
    /// EC P-256 private key in PEM form.
    pub private_key_pem: String,
    /// Contact URI sent in the VAPID `sub` claim, e.g. `mailto:admin@example.org`.
    pub subject: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token secret is empty")]
    EmptySecret,
    #[error("token secret must be at least {min} bytes")]
    ShortSecret { min: usize },
    #[error("bind address is empty")]
    EmptyBind,
    #[error("login rate must be greater than zero")]
    ZeroLoginRate,
    #[error("message bus capacity must be greater than zero")]
    ZeroBusCapacity,
    #[error("token lifetime must be at least one day")]
    ZeroTokenTtl,
    #[error("VAPID subject is empty")]
    EmptyVapidSubject,
    #[error("bcrypt cost must be between 4 and 31, got {0}")]
    BcryptCost(u32),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub environment: Environment,
    pub token_secret: String,
    pub token_ttl_days: u32,
    pub vapid: Option<VapidConfig>,
    /// Prebuilt frontend served for non-GraphQL GET requests.
    pub static_dir: Option<PathBuf>,
    pub admin_token: Option<String>,
    /// User names allowed to run administrative mutations.
    pub admins: Vec<String>,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    pub login_rate_per_minute: u32,
    pub bus_capacity: usize,
    pub bcrypt_cost: u32,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the signing secret.
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            environment: Environment::default(),
            token_secret: token_secret.into(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            vapid: None,
            static_dir: None,
            admin_token: None,
            admins: Vec::new(),
            cors_origins: Vec::new(),
            login_rate_per_minute: DEFAULT_LOGIN_RATE,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.token_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ShortSecret {
                min: MIN_SECRET_LEN,
            });
        }
        if self.bind.trim().is_empty() {
            return Err(ConfigError::EmptyBind);
        }
        if self.login_rate_per_minute == 0 {
            return Err(ConfigError::ZeroLoginRate);
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        if self.token_ttl_days == 0 {
            return Err(ConfigError::ZeroTokenTtl);
        }
        if self
            .vapid
            .as_ref()
            .is_some_and(|v| v.subject.trim().is_empty())
        {
            return Err(ConfigError::EmptyVapidSubject);
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCost(self.bcrypt_cost));
        }
        Ok(())
    }

    pub fn login_quota(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.login_rate_per_minute).ok_or(ConfigError::ZeroLoginRate)
    }

    pub fn db_size_limit_bytes(&self) -> u64 {
        self.environment.db_size_limit_bytes()
    }

    pub fn is_admin_name(&self, name: &str) -> bool {
        self.admins.iter().any(|a| a == name)
    }
}

/// Split a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123";

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(ServerConfig::new(SECRET).validate(), Ok(()));
    }

    #[test]
    fn test_secret_rules() {
        assert_eq!(
            ServerConfig::new("").validate(),
            Err(ConfigError::EmptySecret)
        );
        assert_eq!(
            ServerConfig::new("short").validate(),
            Err(ConfigError::ShortSecret {
                min: MIN_SECRET_LEN
            })
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = ServerConfig::new(SECRET);
        config.login_rate_per_minute = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroLoginRate));

        let mut config = ServerConfig::new(SECRET);
        config.bus_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroBusCapacity));

        let mut config = ServerConfig::new(SECRET);
        config.bind = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyBind));
    }

    #[test]
    fn test_vapid_subject_required() {
        let mut config = ServerConfig::new(SECRET);
        config.vapid = Some(VapidConfig {
            private_key_pem: "pem".to_string(),
            subject: String::new(),
        });
        assert_eq!(config.validate(), Err(ConfigError::EmptyVapidSubject));
    }

    #[test]
    fn test_size_limit_per_environment() {
        assert_eq!(Environment::Test.db_size_limit_bytes(), 8 * 1024 * 1024);
        assert_eq!(
            Environment::Production.db_size_limit_bytes(),
            150 * 1024 * 1024
        );
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}

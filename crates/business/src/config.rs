//! Platform configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a working configuration.
//!
//! ```toml
//! [database]
//! url = "sqlite:pandaloto.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [fraud]
//! rapid_deposit_count = 5
//! velocity_max_transactions = 5
//!
//! [bonus]
//! welcome_amount = "50.00"
//! welcome_wager_requirement = "100.00"
//!
//! [betting]
//! payout_multiplier = "2"
//!
//! [logging]
//! level = "info"
//! ```

use pandaloto_core::FraudThresholds;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("config file not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub database: DatabaseConfig,
    pub fraud: FraudThresholds,
    pub bonus: BonusConfig,
    pub betting: BettingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:pandaloto.db".to_string(),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

/// Welcome bonus granted on registration. A zero amount disables it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    pub welcome_amount: Decimal,
    pub welcome_wager_requirement: Decimal,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            welcome_amount: Decimal::new(5000, 2),
            welcome_wager_requirement: Decimal::new(10000, 2),
        }
    }
}

/// Mock payout projection for placed bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BettingConfig {
    pub payout_multiplier: Decimal,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            payout_multiplier: Decimal::new(2, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from string
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlatformConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url is empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        self.fraud
            .validate()
            .map_err(|e| ConfigError::Validation(format!("fraud: {}", e)))?;

        if self.bonus.welcome_amount < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "bonus.welcome_amount must not be negative".to_string(),
            ));
        }
        if self.bonus.welcome_wager_requirement < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "bonus.welcome_wager_requirement must not be negative".to_string(),
            ));
        }
        if self.betting.payout_multiplier <= Decimal::ZERO {
            return Err(ConfigError::Validation(
                "betting.payout_multiplier must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Override the database URL (CLI `--db`)
    pub fn with_database_url(mut self, url: &str) -> Self {
        self.database.url = url.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PlatformConfig::load_str("").unwrap();
        assert_eq!(config, PlatformConfig::default());
        assert_eq!(config.bonus.welcome_amount, dec!(50.00));
        assert_eq!(config.betting.payout_multiplier, dec!(2));
        assert_eq!(config.fraud.velocity_max_transactions, 5);
    }

    #[test]
    fn test_partial_sections() {
        let config = PlatformConfig::load_str(
            r#"
            [database]
            url = "sqlite::memory:"

            [fraud]
            velocity_max_transactions = 20

            [bonus]
            welcome_amount = "0"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.fraud.velocity_max_transactions, 20);
        assert_eq!(config.fraud.rapid_deposit_count, 5);
        assert_eq!(config.bonus.welcome_amount, dec!(0));
        assert_eq!(config.bonus.welcome_wager_requirement, dec!(100.00));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = PlatformConfig::load_str("[betting]\npayout_multiplier = \"0\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = PlatformConfig::load_str("[database]\nmax_connections = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = PlatformConfig::load_str("[database\nurl = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = PlatformConfig::load_file("/nonexistent/pandaloto.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(PlatformConfig::load_or_default(None).is_ok());
    }
}

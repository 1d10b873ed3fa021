//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                 | Default        |
//! |--------------------------|----------------|
//! | `TILL_HTTP_PORT`         | `8080`         |
//! | `TILL_DATABASE_PATH`     | `./till.db`    |
//! | `TILL_MAX_CONNECTIONS`   | `5`            |
//! | `TILL_UNIT_TIMEOUT_SECS` | `10`           |
//! | `TILL_STOCK_POLICY`      | `separate`     |

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use till_db::{DbConfig, StockPolicy};

/// Till API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size, and so the number of units of work in flight
    pub max_connections: u32,

    /// Deadline for one unit of work
    pub unit_timeout_secs: u64,

    /// Whether a sale commit also decrements stock
    pub stock_policy: StockPolicy,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = ApiConfig {
            http_port: var("TILL_HTTP_PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TILL_HTTP_PORT".to_string()))?,

            database_path: var("TILL_DATABASE_PATH", "./till.db"),

            max_connections: var("TILL_MAX_CONNECTIONS", "5")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TILL_MAX_CONNECTIONS".to_string()))?,

            unit_timeout_secs: var("TILL_UNIT_TIMEOUT_SECS", "10")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TILL_UNIT_TIMEOUT_SECS".to_string()))?,

            stock_policy: var("TILL_STOCK_POLICY", "separate")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TILL_STOCK_POLICY".to_string()))?,
        };

        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TILL_DATABASE_PATH".to_string()));
        }
        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TILL_MAX_CONNECTIONS".to_string()));
        }
        if config.unit_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("TILL_UNIT_TIMEOUT_SECS".to_string()));
        }

        Ok(config)
    }

    /// Database configuration derived from these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .unit_timeout(Duration::from_secs(self.unit_timeout_secs))
            .stock_policy(self.stock_policy)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "./till.db");
        assert_eq!(config.stock_policy, StockPolicy::Separate);

        let db = config.db_config();
        assert_eq!(db.max_connections, 5);
        assert_eq!(db.unit_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TILL_HTTP_PORT", "9000"),
            ("TILL_STOCK_POLICY", "decrement_in_sale"),
            ("TILL_UNIT_TIMEOUT_SECS", "3"),
        ])
        .unwrap();

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.stock_policy, StockPolicy::DecrementInSale);
        assert_eq!(config.db_config().stock_policy, StockPolicy::DecrementInSale);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("TILL_HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TILL_STOCK_POLICY", "sometimes")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TILL_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TILL_DATABASE_PATH", " ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}

//! Configuration management

use ptw_common::{PtwError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default warehouse URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/ptw";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default rows per multi-row INSERT statement.
pub const DEFAULT_LOAD_CHUNK_SIZE: usize = 500;

/// Default number of attempts for a connectivity-failed bulk load.
pub const DEFAULT_LOAD_MAX_RETRIES: u32 = 3;

/// Default base delay between load retries in seconds.
pub const DEFAULT_LOAD_RETRY_DELAY_SECS: u64 = 2;

/// Default upper bound on one bulk load operation in seconds.
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 60;

/// ETL configuration.
///
/// Handed to the pipeline at construction; nothing reads connection state
/// from the process environment after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    pub load: LoadConfig,
}

/// Warehouse connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Bulk load behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub chunk_size: usize,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub load_timeout_secs: u64,
}

impl EtlConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = EtlConfig {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            load: LoadConfig {
                chunk_size: std::env::var("PTW_LOAD_CHUNK_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_LOAD_CHUNK_SIZE),
                max_retries: std::env::var("PTW_LOAD_MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_LOAD_MAX_RETRIES),
                retry_delay_secs: std::env::var("PTW_LOAD_RETRY_DELAY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_LOAD_RETRY_DELAY_SECS),
                load_timeout_secs: std::env::var("PTW_LOAD_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_LOAD_TIMEOUT_SECS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(PtwError::Config("Database URL cannot be empty".to_string()));
        }

        if self.database.max_connections == 0 {
            return Err(PtwError::Config(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        if self.load.chunk_size == 0 {
            return Err(PtwError::Config(
                "Load chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.load.max_retries == 0 {
            return Err(PtwError::Config(
                "Load max_retries must be at least 1".to_string(),
            ));
        }

        if self.load.load_timeout_secs == 0 {
            return Err(PtwError::Config(
                "Load timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            load: LoadConfig {
                chunk_size: DEFAULT_LOAD_CHUNK_SIZE,
                max_retries: DEFAULT_LOAD_MAX_RETRIES,
                retry_delay_secs: DEFAULT_LOAD_RETRY_DELAY_SECS,
                load_timeout_secs: DEFAULT_LOAD_TIMEOUT_SECS,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EtlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.load.chunk_size, DEFAULT_LOAD_CHUNK_SIZE);
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config = EtlConfig::default();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = EtlConfig::default();
        config.load.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = EtlConfig::default();
        config.load.max_retries = 0;
        assert!(config.validate().is_err());
    }
}

//! Configuration module for outpost-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::RuntimeConfig;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Resolve it into the runtime configuration
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        Ok(RuntimeConfig::from_file(file_config))
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.dispatcher.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatcher.workers must be at least 1".to_string(),
            ));
        }
        if config.dispatcher.batch_size < 1 {
            return Err(ConfigError::ValidationError(
                "dispatcher.batch_size must be at least 1".to_string(),
            ));
        }
        if config.dispatcher.backoff_max_exponent > 30 {
            return Err(ConfigError::ValidationError(
                "dispatcher.backoff_max_exponent must be 30 or less".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for route in &config.delivery.routes {
            if !seen.insert(route.event_type.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate delivery route for event type {}",
                    route.event_type
                )));
            }
        }
        Ok(())
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::{DeliverySection, DispatcherSection, RouteConfig, ServerConfig};

    fn base_config() -> FileConfig {
        FileConfig {
            server: ServerConfig {
                listen: "127.0.0.1:8080".parse().unwrap(),
            },
            dispatcher: DispatcherSection::default(),
            delivery: DeliverySection::default(),
        }
    }

    #[test]
    fn rejects_zero_workers() {
        let loader = ConfigLoader::new("unused.toml", None);
        let mut config = base_config();
        config.dispatcher.workers = 0;
        assert!(matches!(
            loader.validate(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_duplicate_routes() {
        let loader = ConfigLoader::new("unused.toml", None);
        let mut config = base_config();
        let url: url::Url = "https://example.com/hook".parse().unwrap();
        config.delivery.routes = vec![
            RouteConfig {
                event_type: "ORDER_CREATED".to_string(),
                url: url.clone(),
            },
            RouteConfig {
                event_type: "ORDER_CREATED".to_string(),
                url,
            },
        ];
        assert!(matches!(
            loader.validate(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn accepts_default_config() {
        let loader = ConfigLoader::new("unused.toml", None);
        assert!(loader.validate(&base_config()).is_ok());
    }
}

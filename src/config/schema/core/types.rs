use super::super::{DatabaseConfig, GatewayConfig, JanitorConfig};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed on load, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Max tracing level: "error" | "warn" | "info" | "debug" | "trace"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub janitor: JanitorConfig,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(self.log_level.trim()).map_err(|_| {
            ConfigError::Validation(format!("unknown log_level '{}'", self.log_level))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.max_level()?;
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            log_level: default_log_level(),
            database: DatabaseConfig::default(),
            gateway: GatewayConfig::default(),
            janitor: JanitorConfig::default(),
        }
    }
}

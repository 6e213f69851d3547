// File: backend/src/config/manager.rs
use super::Config;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        Self::validate(&config)?;

        info!(
            "Loaded configuration: {}:{}, database {}, health checks every {}s",
            config.host,
            config.port,
            config.database_path,
            config.registry.health_check_interval_seconds
        );

        Ok(config)
    }

    fn validate(config: &Config) -> Result<()> {
        let registry = &config.registry;

        if config.database_path.trim().is_empty() {
            return Err(anyhow!("database_path must not be empty"));
        }
        if registry.health_check_interval_seconds == 0 {
            return Err(anyhow!("registry.health_check_interval_seconds must be at least 1"));
        }
        if registry.probe_timeout_seconds == 0 {
            return Err(anyhow!("registry.probe_timeout_seconds must be at least 1"));
        }
        if registry.healthy_threshold == 0 || registry.failed_threshold == 0 {
            return Err(anyhow!("registry thresholds must be at least 1"));
        }
        if registry.repository_timeout_ms == 0 || registry.dependency_timeout_ms == 0 {
            return Err(anyhow!("registry timeouts must be greater than zero"));
        }

        Ok(())
    }
}

// File: snapshotter/src/config/manager.rs
use super::Config;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_configuration(config_dir.as_ref()).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &Path) -> Result<Config> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .await
            .map_err(|e| anyhow!("Failed to read config {}: {}", config_path.display(), e))?;

        let config = Config::from_toml(&content)
            .map_err(|e| anyhow!("{} ({})", e, config_path.display()))?;

        info!(
            "Loaded {} nodes, snapshot_dir={}, interval={}h",
            config.nodes.len(),
            config.snapshot_dir,
            config.snapshot_interval_hours
        );

        Ok(config)
    }
}

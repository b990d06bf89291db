// File: snapshotter/src/config/mod.rs
pub mod manager;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub use manager::ConfigManager;

use crate::constants::service::DEFAULT_SETTLE_DELAY_SECONDS;
use crate::constants::snapshot::MAX_INTERVAL_HOURS;
use crate::types::{NodeEndpoint, NodeKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub snapshot_dir: String,
    pub snapshot_interval_hours: u64,
    pub log_file: String,
    pub server_port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_seconds: u64,
    pub archive_timeout_minutes: Option<u64>,
    pub nodes: Vec<NodeConfig>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_use_sudo() -> bool {
    true
}

fn default_settle_delay() -> u64 {
    DEFAULT_SETTLE_DELAY_SECONDS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Client name, used for the per-client directory and artifact names
    pub name: String,
    pub kind: NodeKind,
    pub rpc_url: String,
    pub service_name: String,
    pub data_dir: String,
    pub snapshot_type: String,
}

impl NodeConfig {
    pub fn endpoint(&self) -> NodeEndpoint {
        NodeEndpoint {
            name: self.name.clone(),
            kind: self.kind,
            health_url: self.rpc_url.clone(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot_dir.trim().is_empty() {
            return Err(anyhow!("snapshot_dir must not be empty"));
        }
        if self.log_file.trim().is_empty() {
            return Err(anyhow!("log_file must not be empty"));
        }
        if self.snapshot_interval_hours == 0 {
            return Err(anyhow!("snapshot_interval_hours must be at least 1"));
        }
        if self.snapshot_interval_hours > MAX_INTERVAL_HOURS {
            return Err(anyhow!(
                "snapshot_interval_hours is too large (max {})",
                MAX_INTERVAL_HOURS
            ));
        }
        if self.server_port == 0 {
            return Err(anyhow!("server_port must be non-zero"));
        }
        if matches!(self.archive_timeout_minutes, Some(0)) {
            return Err(anyhow!("archive_timeout_minutes must be at least 1 when set"));
        }
        if let Some(minutes) = self.archive_timeout_minutes {
            if minutes.checked_mul(60).is_none() {
                return Err(anyhow!("archive_timeout_minutes is too large"));
            }
        }
        if self.nodes.is_empty() {
            return Err(anyhow!("At least one [[nodes]] entry is required"));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            for (field, value) in [
                ("name", &node.name),
                ("rpc_url", &node.rpc_url),
                ("service_name", &node.service_name),
                ("data_dir", &node.data_dir),
                ("snapshot_type", &node.snapshot_type),
            ] {
                if value.trim().is_empty() {
                    return Err(anyhow!("Node '{}': {} must not be empty", node.name, field));
                }
            }
            if node.name.contains('/') || node.snapshot_type.contains('/') {
                return Err(anyhow!(
                    "Node '{}': name and snapshot_type must not contain '/'",
                    node.name
                ));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(anyhow!("Duplicate node name '{}'", node.name));
            }
        }

        Ok(())
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_hours * 3600)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_seconds)
    }

    pub fn archive_timeout(&self) -> Option<Duration> {
        self.archive_timeout_minutes
            .map(|minutes| Duration::from_secs(minutes * 60))
    }

    /// `{snapshot_dir}/{client}` - artifacts and the latest pointer live here
    pub fn client_dir(&self, client: &str) -> PathBuf {
        PathBuf::from(&self.snapshot_dir).join(client)
    }
}

//! Temporary on-disk environment with two configured nodes

use snapshotter::config::{Config, NodeConfig};
use snapshotter::services::{CommandRunner, ServiceController};
use snapshotter::sync::SyncCheck;
use snapshotter::types::NodeKind;
use snapshotter::SnapshotOrchestrator;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const EXECUTION_NODE: &str = "geth";
pub const CONSENSUS_NODE: &str = "cosmos";

pub struct TestEnv {
    pub root: TempDir,
    pub config: Arc<Config>,
}

impl TestEnv {
    /// `geth` (execution, "pruned") and `cosmos` (consensus, "archive"), both
    /// with populated data directories and no sudo or settle delay
    pub fn new() -> Self {
        Self::with(|_| {})
    }

    pub fn with(customize: impl FnOnce(&mut Config)) -> Self {
        let root = TempDir::new().unwrap();
        let data = root.path().join("data");

        for name in [EXECUTION_NODE, CONSENSUS_NODE] {
            let dir = data.join(name);
            fs::create_dir_all(dir.join("chaindata")).unwrap();
            fs::write(dir.join("chaindata/000001.ldb"), format!("{} blocks", name)).unwrap();
            fs::write(dir.join("node.key"), format!("{} key", name)).unwrap();
        }

        let mut config = Config {
            snapshot_dir: root.path().join("snapshots").to_string_lossy().to_string(),
            snapshot_interval_hours: 6,
            log_file: root.path().join("snapshotter.log").to_string_lossy().to_string(),
            server_port: 8080,
            host: "127.0.0.1".to_string(),
            use_sudo: false,
            settle_delay_seconds: 0,
            archive_timeout_minutes: None,
            nodes: vec![
                NodeConfig {
                    name: EXECUTION_NODE.to_string(),
                    kind: NodeKind::Execution,
                    rpc_url: "http://127.0.0.1:8545".to_string(),
                    service_name: "geth".to_string(),
                    data_dir: data.join(EXECUTION_NODE).to_string_lossy().to_string(),
                    snapshot_type: "pruned".to_string(),
                },
                NodeConfig {
                    name: CONSENSUS_NODE.to_string(),
                    kind: NodeKind::Consensus,
                    rpc_url: "http://127.0.0.1:26657/status".to_string(),
                    service_name: "cosmosd".to_string(),
                    data_dir: data.join(CONSENSUS_NODE).to_string_lossy().to_string(),
                    snapshot_type: "archive".to_string(),
                },
            ],
        };
        customize(&mut config);

        Self {
            root,
            config: Arc::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn client_dir(&self, client: &str) -> PathBuf {
        self.config.client_dir(client)
    }

    /// Sorted file names in a client directory, empty if it does not exist
    pub fn client_files(&self, client: &str) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(self.client_dir(client)) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    pub fn orchestrator(
        &self,
        runner: Arc<dyn CommandRunner>,
        checkers: Vec<Arc<dyn SyncCheck>>,
    ) -> SnapshotOrchestrator {
        let services = ServiceController::new(runner, self.config.use_sudo)
            .with_stop_timeout(Duration::from_millis(200));
        SnapshotOrchestrator::new(self.config.clone(), checkers, services).unwrap()
    }
}

//! Snapshot cycle orchestration
//!
//! One cycle runs the stages in strict order:
//!
//! ```text
//! Idle -> CheckingSync -> Stopping -> Archiving -> Publishing -> Retaining -> Restarting -> Idle
//!              |              |
//!              v              v
//!           Aborted        Aborted -> Restarting (services already stopped)
//! ```
//!
//! Sync and stop failures abort the cycle. Archive, publish and retention
//! failures only affect the client they happened on. Every service that was
//! stopped is started again before the cycle returns.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::config::{Config, NodeConfig};
use crate::constants::snapshot::{DEFAULT_MAX_RETAINED, PARTIAL_SUFFIX};
use crate::errors::ArchiveError;
use crate::services::{ServiceController, SystemCommandRunner};
use crate::snapshot::{self, CancelFlag};
use crate::sync::{self, SyncCheck};
use crate::types::{
    artifact_file_name, artifact_prefix, ClientReport, CycleOutcome, CycleReport, CycleStage,
    SnapshotArtifact,
};

pub struct SnapshotOrchestrator {
    config: Arc<Config>,
    checkers: Vec<Arc<dyn SyncCheck>>,
    services: ServiceController,
    max_retained: usize,
    archive_timeout: Option<Duration>,
    stage: RwLock<CycleStage>,
}

impl SnapshotOrchestrator {
    /// `checkers` must hold exactly one checker per configured node, in any order.
    pub fn new(
        config: Arc<Config>,
        checkers: Vec<Arc<dyn SyncCheck>>,
        services: ServiceController,
    ) -> Result<Self> {
        let mut ordered = Vec::with_capacity(config.nodes.len());
        for node in &config.nodes {
            let checker = checkers
                .iter()
                .find(|c| c.node_name() == node.name)
                .ok_or_else(|| anyhow!("No sync checker for node {}", node.name))?;
            ordered.push(checker.clone());
        }
        if checkers.len() != ordered.len() {
            return Err(anyhow!(
                "Got {} sync checkers for {} configured nodes",
                checkers.len(),
                ordered.len()
            ));
        }

        let archive_timeout = config.archive_timeout();
        Ok(Self {
            config,
            checkers: ordered,
            services,
            max_retained: DEFAULT_MAX_RETAINED,
            archive_timeout,
            stage: RwLock::new(CycleStage::Idle),
        })
    }

    /// Wire up HTTP sync checkers and the real service manager
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let endpoints = config.nodes.iter().map(NodeConfig::endpoint).collect();
        let checkers = sync::checkers_for(endpoints)
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
        let services = ServiceController::new(Arc::new(SystemCommandRunner), config.use_sudo);
        Self::new(config, checkers, services)
    }

    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained.max(1);
        self
    }

    /// Per-client archive deadline; overrides `archive_timeout_minutes`
    pub fn with_archive_timeout(mut self, limit: Duration) -> Self {
        self.archive_timeout = Some(limit);
        self
    }

    pub async fn current_stage(&self) -> CycleStage {
        *self.stage.read().await
    }

    async fn enter(&self, stage: CycleStage) {
        let mut current = self.stage.write().await;
        if *current != stage {
            info!("Snapshot cycle stage: {:?} -> {:?}", *current, stage);
            *current = stage;
        }
    }

    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle; `timestamp` names every artifact produced by it
    pub async fn run_cycle_at(&self, timestamp: DateTime<Utc>) -> CycleReport {
        let started_at = Utc::now();
        let mut clients: Vec<ClientReport> = self
            .config
            .nodes
            .iter()
            .map(|node| ClientReport::new(&node.name))
            .collect();
        let mut restart_errors = Vec::new();

        info!("Starting snapshot process for {} nodes", self.config.nodes.len());

        self.enter(CycleStage::CheckingSync).await;
        if let Some(outcome) = self.check_sync().await {
            self.enter(CycleStage::Aborted).await;
            return self.finish(started_at, outcome, clients, restart_errors).await;
        }

        self.enter(CycleStage::Stopping).await;
        let mut stopped: Vec<usize> = Vec::new();
        for (index, node) in self.config.nodes.iter().enumerate() {
            match self.services.stop(&node.service_name).await {
                Ok(()) => stopped.push(index),
                Err(e) => {
                    error!("Error stopping {} service {}: {}", node.name, node.service_name, e);
                    self.enter(CycleStage::Aborted).await;
                    self.restart(&stopped, &mut clients, &mut restart_errors).await;
                    let outcome = CycleOutcome::StopFailed {
                        service: node.service_name.clone(),
                        reason: e.to_string(),
                    };
                    return self.finish(started_at, outcome, clients, restart_errors).await;
                }
            }
        }

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            info!("All services stopped, waiting {}s before archiving", settle.as_secs());
            tokio::time::sleep(settle).await;
        }

        self.enter(CycleStage::Archiving).await;
        for (node, report) in self.config.nodes.iter().zip(clients.iter_mut()) {
            info!("Creating {} snapshot...", node.name);
            match self.archive_node(node, timestamp).await {
                Ok(artifact) => {
                    info!("{} snapshot created at {}", node.name, artifact.path.display());
                    report.artifact = Some(artifact);
                }
                Err(e) => {
                    error!("Error archiving {} data directory {}: {}", node.name, node.data_dir, e);
                    report.archive_error = Some(e);
                }
            }
        }

        self.enter(CycleStage::Publishing).await;
        for (node, report) in self.config.nodes.iter().zip(clients.iter_mut()) {
            let Some(artifact) = report.artifact.clone() else {
                continue;
            };
            let dir = self.config.client_dir(&node.name);
            let client = node.name.clone();
            let snapshot_type = node.snapshot_type.clone();
            let result = run_blocking(move || {
                snapshot::publish_latest(&dir, &client, &snapshot_type, &artifact.path)
            })
            .await;
            match result {
                Ok(_) => report.published = true,
                Err(e) => {
                    error!("Error updating latest pointer for {}: {}", node.name, e);
                    report.publish_error = Some(e.to_string());
                }
            }
        }

        self.enter(CycleStage::Retaining).await;
        for (node, report) in self.config.nodes.iter().zip(clients.iter_mut()) {
            let dir = self.config.client_dir(&node.name);
            let prefix = artifact_prefix(&node.name, &node.snapshot_type);
            let max_retained = self.max_retained;
            match run_blocking(move || snapshot::prune(&dir, &prefix, max_retained)).await {
                Ok(retention) => report.retention = Some(retention),
                Err(e) => {
                    warn!("Error applying retention for {}: {}", node.name, e);
                    report.retention_error = Some(e.to_string());
                }
            }
        }

        self.restart(&stopped, &mut clients, &mut restart_errors).await;
        self.finish(started_at, CycleOutcome::Completed, clients, restart_errors)
            .await
    }

    /// Poll every node concurrently; `None` means all are synced
    async fn check_sync(&self) -> Option<CycleOutcome> {
        let results = join_all(self.checkers.iter().map(|checker| async move {
            (checker.node_name().to_string(), checker.check_synced().await)
        }))
        .await;

        let mut failures = Vec::new();
        let mut not_synced = Vec::new();
        for (node, result) in results {
            match result {
                Ok(true) => info!("{} is synced", node),
                Ok(false) => {
                    info!("{} is not synced yet", node);
                    not_synced.push(node);
                }
                Err(e) => {
                    error!("Error checking {} sync status: {}", node, e);
                    failures.push(e.to_string());
                }
            }
        }

        if !failures.is_empty() {
            info!("Snapshot process aborted: sync status unavailable");
            return Some(CycleOutcome::SyncCheckFailed {
                reason: failures.join("; "),
            });
        }
        if !not_synced.is_empty() {
            info!("One or more nodes are not synced. Snapshot process aborted.");
            return Some(CycleOutcome::NotSynced { nodes: not_synced });
        }

        info!("All nodes are synced. Proceeding with snapshot.");
        None
    }

    /// Archive into `{artifact}.partial`, then rename into place. Anything left
    /// under the partial name is removed on failure.
    async fn archive_node(
        &self,
        node: &NodeConfig,
        timestamp: DateTime<Utc>,
    ) -> Result<SnapshotArtifact, String> {
        let dir = self.config.client_dir(&node.name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;

        let file_name = artifact_file_name(&node.name, &node.snapshot_type, timestamp);
        let final_path = dir.join(&file_name);
        let partial_path = dir.join(format!("{}{}", file_name, PARTIAL_SUFFIX));

        let source = PathBuf::from(&node.data_dir);
        let dest = partial_path.clone();
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            snapshot::archive_with_cancel(&source, &dest, &worker_cancel)
        });

        let joined = match self.archive_timeout {
            Some(limit) => match timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Archive of {} exceeded {:?}, cancelling", node.name, limit);
                    cancel.cancel();
                    let _ = handle.await;
                    Ok(Err(ArchiveError::Timeout {
                        path: node.data_dir.clone(),
                        limit,
                    }))
                }
            },
            None => handle.await,
        };

        let result = match joined {
            Ok(Ok(stats)) => {
                info!(
                    "Archived {} entries ({} bytes) for {}",
                    stats.entries, stats.bytes, node.name
                );
                tokio::fs::rename(&partial_path, &final_path)
                    .await
                    .map_err(|e| format!("failed to move archive into place: {}", e))
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("archive task failed: {}", e)),
        };

        if let Err(e) = result {
            remove_partial(&partial_path).await;
            return Err(e);
        }

        Ok(SnapshotArtifact {
            client_name: node.name.clone(),
            snapshot_type: node.snapshot_type.clone(),
            created_at: timestamp,
            path: final_path,
        })
    }

    async fn restart(
        &self,
        stopped: &[usize],
        clients: &mut [ClientReport],
        restart_errors: &mut Vec<String>,
    ) {
        if stopped.is_empty() {
            return;
        }
        self.enter(CycleStage::Restarting).await;

        for &index in stopped {
            let node = &self.config.nodes[index];
            if let Err(e) = self.services.start(&node.service_name).await {
                error!(
                    "Error starting {} service {}: {} - node stays down until the next cycle or manual intervention",
                    node.name, node.service_name, e
                );
                clients[index].restart_error = Some(e.to_string());
                restart_errors.push(e.to_string());
            }
        }
    }

    async fn finish(
        &self,
        started_at: DateTime<Utc>,
        outcome: CycleOutcome,
        clients: Vec<ClientReport>,
        restart_errors: Vec<String>,
    ) -> CycleReport {
        self.enter(CycleStage::Idle).await;
        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            outcome,
            clients,
            restart_errors,
        };

        match &report.outcome {
            CycleOutcome::Completed => {
                let archived = report.clients.iter().filter(|c| c.artifact.is_some()).count();
                info!(
                    "Snapshot process completed: {}/{} clients archived, {} restart failures, took {}s",
                    archived,
                    report.clients.len(),
                    report.restart_errors.len(),
                    (report.finished_at - report.started_at).num_seconds()
                );
            }
            other => warn!("Snapshot cycle aborted: {:?}", other),
        }

        report
    }
}

async fn run_blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("Removed incomplete archive {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove incomplete archive {}: {}", path.display(), e),
    }
}

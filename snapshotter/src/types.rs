use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::snapshot::{ARCHIVE_SUFFIX, LATEST_LABEL, TIMESTAMP_FORMAT};

// === NODE DESCRIPTION ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Ethereum-style execution client answering `eth_syncing`
    #[serde(alias = "geth")]
    Execution,
    /// CometBFT/Cosmos consensus client exposing `/status`
    #[serde(alias = "cosmos")]
    Consensus,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Execution => write!(f, "execution"),
            NodeKind::Consensus => write!(f, "consensus"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEndpoint {
    pub name: String,
    pub kind: NodeKind,
    pub health_url: String,
}

// === ARTIFACTS ===

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotArtifact {
    pub client_name: String,
    pub snapshot_type: String,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

/// `{client}_{type}_` - the shared prefix of every artifact of one client and type
pub fn artifact_prefix(client: &str, snapshot_type: &str) -> String {
    format!("{}_{}_", client, snapshot_type)
}

/// `{client}_{type}_{YYYYMMDDHHMM}.tar.lz4`
pub fn artifact_file_name(client: &str, snapshot_type: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        artifact_prefix(client, snapshot_type),
        created_at.format(TIMESTAMP_FORMAT),
        ARCHIVE_SUFFIX
    )
}

/// `{client}_{type}_latest.tar.lz4`
pub fn latest_pointer_name(client: &str, snapshot_type: &str) -> String {
    format!(
        "{}{}{}",
        artifact_prefix(client, snapshot_type),
        LATEST_LABEL,
        ARCHIVE_SUFFIX
    )
}

// === CYCLE REPORTING ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleStage {
    Idle,
    CheckingSync,
    Stopping,
    Archiving,
    Publishing,
    Retaining,
    Restarting,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CycleOutcome {
    /// All stages ran; individual clients may still have failed
    Completed,
    /// At least one node is still catching up
    NotSynced { nodes: Vec<String> },
    /// A sync poll failed
    SyncCheckFailed { reason: String },
    /// A service could not be confirmed stopped
    StopFailed { service: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RetentionReport {
    pub kept: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    pub client: String,
    pub artifact: Option<SnapshotArtifact>,
    pub archive_error: Option<String>,
    pub published: bool,
    pub publish_error: Option<String>,
    pub retention: Option<RetentionReport>,
    pub retention_error: Option<String>,
    pub restart_error: Option<String>,
}

impl ClientReport {
    pub fn new(client: &str) -> Self {
        Self {
            client: client.to_string(),
            artifact: None,
            archive_error: None,
            published: false,
            publish_error: None,
            retention: None,
            retention_error: None,
            restart_error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub clients: Vec<ClientReport>,
    pub restart_errors: Vec<String>,
}

impl CycleReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == CycleOutcome::Completed
    }

    pub fn client(&self, name: &str) -> Option<&ClientReport> {
        self.clients.iter().find(|c| c.client == name)
    }
}

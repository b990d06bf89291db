//! Node sync monitoring
//!
//! Both node kinds expose an "is still catching up" signal through different
//! wire shapes. Each kind gets its own [`SyncCheck`] implementation, picked
//! once from configuration by [`checker_for`].

mod consensus;
mod execution;
pub mod types;

pub use consensus::ConsensusSyncChecker;
pub use execution::ExecutionSyncChecker;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;

use crate::constants;
use crate::errors::SyncError;
use crate::types::{NodeEndpoint, NodeKind};

#[async_trait]
pub trait SyncCheck: Send + Sync {
    /// Name of the node being polled, for logging
    fn node_name(&self) -> &str;

    /// `Ok(true)` once the node has caught up with the chain head
    async fn check_synced(&self) -> Result<bool, SyncError>;
}

pub fn build_http_client(timeout: Duration) -> Result<HttpClient, reqwest::Error> {
    HttpClient::builder().timeout(timeout).build()
}

pub fn checker_for(endpoint: NodeEndpoint, client: HttpClient) -> Arc<dyn SyncCheck> {
    match endpoint.kind {
        NodeKind::Execution => Arc::new(ExecutionSyncChecker::new(endpoint, client)),
        NodeKind::Consensus => Arc::new(ConsensusSyncChecker::new(endpoint, client)),
    }
}

/// Build one checker per endpoint, sharing a client with the default 10s timeout
pub fn checkers_for(endpoints: Vec<NodeEndpoint>) -> Result<Vec<Arc<dyn SyncCheck>>, reqwest::Error> {
    let client = build_http_client(constants::sync::REQUEST_TIMEOUT)?;
    Ok(endpoints
        .into_iter()
        .map(|endpoint| checker_for(endpoint, client.clone()))
        .collect())
}

pub(crate) fn classify_request_error(node: &str, err: reqwest::Error) -> SyncError {
    let reason = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    SyncError::Network {
        node: node.to_string(),
        reason,
    }
}

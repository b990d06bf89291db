//! Consensus client (CometBFT `/status`) sync checking

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;

use super::{classify_request_error, SyncCheck};
use crate::errors::SyncError;
use crate::types::NodeEndpoint;

pub struct ConsensusSyncChecker {
    endpoint: NodeEndpoint,
    client: HttpClient,
}

impl ConsensusSyncChecker {
    pub fn new(endpoint: NodeEndpoint, client: HttpClient) -> Self {
        Self { endpoint, client }
    }

    fn protocol_error(&self, reason: impl Into<String>) -> SyncError {
        SyncError::Protocol {
            node: self.endpoint.name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SyncCheck for ConsensusSyncChecker {
    fn node_name(&self) -> &str {
        &self.endpoint.name
    }

    async fn check_synced(&self) -> Result<bool, SyncError> {
        let response = self
            .client
            .get(&self.endpoint.health_url)
            .send()
            .await
            .map_err(|e| classify_request_error(&self.endpoint.name, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(&self.endpoint.name, e))?;

        if !status.is_success() {
            return Err(self.protocol_error(format!("HTTP {}: {}", status, body.trim())));
        }

        let reply: Value = serde_json::from_str(&body)
            .map_err(|e| self.protocol_error(format!("invalid status reply: {}", e)))?;

        match reply.pointer("/result/sync_info/catching_up") {
            Some(Value::Bool(catching_up)) => Ok(!catching_up),
            Some(other) => Err(self.protocol_error(format!(
                "result.sync_info.catching_up is not a boolean: {}",
                other
            ))),
            None => Err(self.protocol_error("missing result.sync_info.catching_up")),
        }
    }
}

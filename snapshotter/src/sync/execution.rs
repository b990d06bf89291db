//! Execution client (geth and friends) sync checking

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::debug;

use super::types::{EthSyncingResponse, JsonRpcRequest};
use super::{classify_request_error, SyncCheck};
use crate::constants::sync::ETH_SYNCING_METHOD;
use crate::errors::SyncError;
use crate::types::NodeEndpoint;

pub struct ExecutionSyncChecker {
    endpoint: NodeEndpoint,
    client: HttpClient,
}

impl ExecutionSyncChecker {
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
impl SyncCheck for ExecutionSyncChecker {
    fn node_name(&self) -> &str {
        &self.endpoint.name
    }

    async fn check_synced(&self) -> Result<bool, SyncError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: ETH_SYNCING_METHOD,
            params: Vec::new(),
            id: 1,
        };

        let response = self
            .client
            .post(&self.endpoint.health_url)
            .json(&request)
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

        let reply: EthSyncingResponse = serde_json::from_str(&body)
            .map_err(|e| self.protocol_error(format!("invalid JSON-RPC reply: {}", e)))?;

        if let Some(error) = reply.error {
            return Err(self.protocol_error(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        match reply.result {
            Some(Value::Bool(false)) => Ok(true),
            Some(Value::Null) | None => Err(self.protocol_error("reply has no result field")),
            Some(progress) => {
                debug!("{} still syncing: {}", self.endpoint.name, progress);
                Ok(false)
            }
        }
    }
}

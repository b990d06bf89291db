//! RPC request and response structures for sync polling

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'a str,
    pub method: &'a str,
    pub params: Vec<serde_json::Value>,
    pub id: u64,
}

/// Reply to `eth_syncing`. `result` is either `false` or a progress object
/// (some clients send a hex string instead).
#[derive(Debug, Clone, Deserialize)]
pub struct EthSyncingResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

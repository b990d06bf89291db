//! Mock RPC server simulating execution and consensus node health endpoints

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockRpcServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockRpcServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    pub fn status_url(&self) -> String {
        format!("{}/status", self.base_url)
    }

    /// `eth_syncing` answering with the given `result` value
    pub async fn mock_eth_syncing(&self, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "method": "eth_syncing",
                "id": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": result
            })))
            .mount(&self.server)
            .await;
    }

    /// Any POST answered with a raw status and body
    pub async fn mock_post_raw(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// CometBFT `/status` with the given `catching_up` value
    pub async fn mock_status(&self, catching_up: Value) {
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": -1,
                "result": {
                    "node_info": { "network": "test-1", "moniker": "test-node" },
                    "sync_info": {
                        "latest_block_height": "123456",
                        "catching_up": catching_up
                    }
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// `/status` answered with a raw status and body
    pub async fn mock_status_raw(&self, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Every request answered only after `delay`
    pub async fn mock_slow(&self, delay: Duration) {
        Mock::given(wiremock::matchers::any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": false }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }
}

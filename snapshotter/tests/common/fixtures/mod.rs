//! Reusable test utilities:
//! - Scripted command runner standing in for systemctl/kill
//! - Fixed-answer sync checkers
//! - Mock RPC servers for both node kinds
//! - Temporary snapshot environments with populated data directories

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_runner;
pub mod fake_sync;
pub mod mock_rpc;
pub mod test_config;

pub use fake_runner::{Behavior, FakeRunner};
pub use fake_sync::{Answer, FakeSyncCheck};
pub use mock_rpc::MockRpcServer;
pub use test_config::TestEnv;

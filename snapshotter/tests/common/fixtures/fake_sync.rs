//! Sync checkers with a fixed answer

use async_trait::async_trait;
use snapshotter::errors::SyncError;
use snapshotter::sync::SyncCheck;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum Answer {
    Synced,
    NotSynced,
    NetworkError,
    ProtocolError,
}

pub struct FakeSyncCheck {
    name: String,
    answer: Answer,
    delay: Duration,
    polls: AtomicUsize,
}

impl FakeSyncCheck {
    pub fn new(name: &str, answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer,
            delay: Duration::ZERO,
            polls: AtomicUsize::new(0),
        })
    }

    pub fn slow(name: &str, answer: Answer, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer,
            delay,
            polls: AtomicUsize::new(0),
        })
    }

    pub fn synced(name: &str) -> Arc<Self> {
        Self::new(name, Answer::Synced)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncCheck for FakeSyncCheck {
    fn node_name(&self) -> &str {
        &self.name
    }

    async fn check_synced(&self) -> Result<bool, SyncError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.answer {
            Answer::Synced => Ok(true),
            Answer::NotSynced => Ok(false),
            Answer::NetworkError => Err(SyncError::Network {
                node: self.name.clone(),
                reason: "connection refused".to_string(),
            }),
            Answer::ProtocolError => Err(SyncError::Protocol {
                node: self.name.clone(),
                reason: "missing result".to_string(),
            }),
        }
    }
}

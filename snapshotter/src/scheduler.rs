//! Fixed-interval, single-flight scheduling of snapshot cycles
//!
//! The first cycle runs immediately at startup, later ones every
//! `snapshot_interval_hours`. A trigger that arrives while a cycle is still
//! running is skipped rather than queued.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::orchestrator::SnapshotOrchestrator;
use crate::types::CycleReport;

pub struct SnapshotScheduler {
    orchestrator: Arc<SnapshotOrchestrator>,
    interval: Duration,
    running: Mutex<()>,
    completed_cycles: AtomicU64,
}

impl SnapshotScheduler {
    pub fn new(orchestrator: Arc<SnapshotOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            running: Mutex::new(()),
            completed_cycles: AtomicU64::new(0),
        }
    }

    /// Run one cycle unless another is already in progress
    pub async fn trigger(&self) -> Option<CycleReport> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous snapshot cycle still running, skipping this trigger");
            return None;
        };

        let report = self.orchestrator.run_cycle().await;
        let count = self.completed_cycles.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Snapshot cycle #{} finished: {:?}", count, report.outcome);
        Some(report)
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::SeqCst)
    }

    /// Tick until `shutdown` resolves. A cycle in progress is allowed to finish
    /// before the loop exits.
    pub async fn run<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Snapshot scheduler started, interval {}h",
            self.interval.as_secs() / 3600
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping snapshot scheduler");
                    break;
                }
                _ = interval.tick() => {
                    self.trigger().await;
                }
            }
        }
    }
}

// File: snapshotter/src/main.rs
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use snapshotter::logging::init_file_logging;
use snapshotter::{ConfigManager, SnapshotOrchestrator, SnapshotScheduler};

#[derive(Debug, Parser)]
#[command(name = "snapshotter", about = "Periodic snapshots of blockchain node data directories")]
struct Cli {
    /// Directory containing config.toml
    #[arg(short, long, default_value = "./config")]
    config: PathBuf,

    /// Run a single snapshot cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config).await?;
    let config = config_manager.get_current_config();

    init_file_logging(&config.log_file, "snapshotter")?;

    info!(
        "Starting snapshot service: {} nodes, snapshot_dir={}, every {}h",
        config.nodes.len(),
        config.snapshot_dir,
        config.snapshot_interval_hours
    );
    for node in &config.nodes {
        info!(
            "Node {} ({}): service={}, data_dir={}, type={}",
            node.name, node.kind, node.service_name, node.data_dir, node.snapshot_type
        );
    }
    if config.archive_timeout().is_none() {
        warn!("No archive_timeout_minutes configured - a stuck archive delays the next cycle indefinitely");
    }

    let orchestrator = Arc::new(SnapshotOrchestrator::from_config(config.clone())?);

    if cli.once {
        let report = orchestrator.run_cycle().await;
        info!("Single snapshot cycle finished: {:?}", report.outcome);
        return Ok(());
    }

    let scheduler = Arc::new(SnapshotScheduler::new(orchestrator, config.snapshot_interval()));
    scheduler.run(shutdown_signal()).await;

    info!("Snapshot service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

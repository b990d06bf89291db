// File: file-server/src/main.rs
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use snapshotter::logging::init_file_logging;
use snapshotter::ConfigManager;

#[derive(Debug, Parser)]
#[command(name = "file-server", about = "Serve node snapshots over HTTP")]
struct Cli {
    /// Directory containing config.toml
    #[arg(short, long, default_value = "./config")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config).await?;
    let config = config_manager.get_current_config();

    init_file_logging(&config.log_file, "file_server")?;
    info!(
        "Serving {} for {} clients",
        config.snapshot_dir,
        config.nodes.len()
    );

    file_server::start_server(config).await
}

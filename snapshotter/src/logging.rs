use anyhow::{anyhow, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

/// Route all tracing output to `log_file` (appending). Failing to open the
/// file is a startup error.
pub fn init_file_logging(log_file: &str, target: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| anyhow!("Failed to open log file {}: {}", log_file, e))?;

    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("{}=info", target).parse()?)
        .add_directive("snapshotter=info".parse()?)
        .add_directive("tower_http=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    Ok(())
}

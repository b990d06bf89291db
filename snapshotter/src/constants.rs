//! Timeouts, limits and naming constants used across the service

use std::time::Duration;

/// Sync polling constants
pub mod sync {
    use super::Duration;

    /// Upper bound for a single health request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// JSON-RPC method asking an execution client for sync progress
    pub const ETH_SYNCING_METHOD: &str = "eth_syncing";
}

/// Service manager constants
pub mod service {
    use super::Duration;

    /// Graceful stop budget before escalating to a forced kill
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

    /// Pause between stopping the nodes and reading their data directories
    pub const DEFAULT_SETTLE_DELAY_SECONDS: u64 = 10;
}

/// Artifact naming and retention constants
pub mod snapshot {
    /// Suffix of every artifact and pointer
    pub const ARCHIVE_SUFFIX: &str = ".tar.lz4";

    /// Suffix appended to an artifact while it is being written
    pub const PARTIAL_SUFFIX: &str = ".partial";

    /// Label used in pointer names in place of the timestamp
    pub const LATEST_LABEL: &str = "latest";

    /// Artifact timestamp format (UTC)
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

    /// Longest accepted interval between cycles (one year)
    pub const MAX_INTERVAL_HOURS: u64 = 24 * 365;

    /// Artifacts kept per (client, snapshot type)
    pub const DEFAULT_MAX_RETAINED: usize = 2;
}

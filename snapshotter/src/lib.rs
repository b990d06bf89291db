pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod scheduler;
pub mod services;
pub mod snapshot;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigManager, NodeConfig};
pub use errors::{ArchiveError, ServiceError, SyncError};
pub use orchestrator::SnapshotOrchestrator;
pub use scheduler::SnapshotScheduler;
pub use services::{CommandRunner, ServiceController, SystemCommandRunner};
pub use sync::SyncCheck;
pub use types::{CycleOutcome, CycleReport, CycleStage, NodeKind, SnapshotArtifact};

//! Error types for the snapshot service
//!
//! Steady-state errors are contained inside a snapshot cycle; only the
//! startup path (configuration, log file) is allowed to terminate the process.

use std::fmt;
use std::io;
use std::time::Duration;

/// Errors produced while polling a node's sync status
#[derive(Debug)]
pub enum SyncError {
    /// Node unreachable, connection refused or request timed out
    Network { node: String, reason: String },

    /// Node answered, but not with the shape we expect
    Protocol { node: String, reason: String },
}

/// Errors produced by the service controller
#[derive(Debug)]
pub enum ServiceError {
    /// Service could not be confirmed stopped
    StopFailed { service: String, reason: String },

    /// Service manager refused or failed to start the service
    StartFailed { service: String, reason: String },

    /// Introspection query against the service manager failed
    Query { service: String, reason: String },
}

/// Errors produced while writing an archive
#[derive(Debug)]
pub enum ArchiveError {
    /// Underlying filesystem error, with the path being processed
    Io { path: String, source: io::Error },

    /// Archive was cancelled before completion
    Cancelled { path: String },

    /// Archive did not finish within the configured deadline
    Timeout { path: String, limit: Duration },
}

impl SyncError {
    pub fn node(&self) -> &str {
        match self {
            SyncError::Network { node, .. } | SyncError::Protocol { node, .. } => node,
        }
    }
}

impl ArchiveError {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Network { node, reason } => {
                write!(f, "Network error polling {}: {}", node, reason)
            }
            SyncError::Protocol { node, reason } => {
                write!(f, "Unexpected response from {}: {}", node, reason)
            }
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::StopFailed { service, reason } => {
                write!(f, "Failed to stop service {}: {}", service, reason)
            }
            ServiceError::StartFailed { service, reason } => {
                write!(f, "Failed to start service {}: {}", service, reason)
            }
            ServiceError::Query { service, reason } => {
                write!(f, "Failed to query service {}: {}", service, reason)
            }
        }
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Io { path, source } => {
                write!(f, "I/O error at '{}': {}", path, source)
            }
            ArchiveError::Cancelled { path } => {
                write!(f, "Archive of '{}' was cancelled", path)
            }
            ArchiveError::Timeout { path, limit } => {
                write!(f, "Archive of '{}' exceeded its {:?} deadline", path, limit)
            }
        }
    }
}

impl std::error::Error for SyncError {}
impl std::error::Error for ServiceError {}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiveError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

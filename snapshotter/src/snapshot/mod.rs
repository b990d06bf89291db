//! Snapshot artifact handling: archiving, publishing and retention

pub mod archive;
pub mod publish;
pub mod retention;

pub use archive::{archive, archive_with_cancel, unpack, ArchiveStats, CancelFlag};
pub use publish::{publish_latest, resolve_latest};
pub use retention::prune;

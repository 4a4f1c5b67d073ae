use inksync_core::SnapshotError;
use thiserror::Error;

/// Errors surfaced by whiteboard commands. A failed command leaves the
/// collection and history untouched.
#[derive(Error, Debug)]
pub enum WhiteboardError {
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

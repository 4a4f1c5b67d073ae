//! Error types for snapshot export/import.

use std::path::PathBuf;

use thiserror::Error;

use crate::element::ElementId;

/// Why a persisted snapshot could not be loaded or written
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Not a JSON array of element records
    #[error("invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// The same identifier appears twice
    #[error("duplicate element id in snapshot: {0}")]
    DuplicateId(ElementId),

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FamilyError>;

/// Failure of the underlying graph store. Propagated unchanged, never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure while writing, reading or removing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode/decode: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot path rejected: {0}")]
    Path(String),
}

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("{0} wasn't found")]
    NotFound(String),

    #[error("invalid batch: {0}")]
    Validation(String),

    #[error("graph store: {0}")]
    Store(#[from] StoreError),

    #[error("snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    /// A prune pass removed nothing while the subject still had children.
    #[error("pruning the descendants of {0} made no progress (cyclic lineage?)")]
    PruneStalled(String),

    #[error("cancelled before {0}")]
    Cancelled(&'static str),

    /// The store may still be pruned; `snapshot` holds the pre-query graph.
    #[error(
        "graph store left inconsistent, recover with restore of {}: {cause}",
        snapshot.display()
    )]
    Inconsistent {
        snapshot: PathBuf,
        #[source]
        cause: Box<FamilyError>,
    },
}

impl FamilyError {
    pub(crate) fn snapshot(path: impl Into<PathBuf>, source: impl Into<SnapshotError>) -> Self {
        FamilyError::Snapshot {
            path: path.into(),
            source: source.into(),
        }
    }

    /// NotFound and Validation are the caller's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, FamilyError::NotFound(_) | FamilyError::Validation(_))
    }
}

impl From<rusqlite::Error> for FamilyError {
    fn from(e: rusqlite::Error) -> Self {
        FamilyError::Store(StoreError::Sqlite(e))
    }
}

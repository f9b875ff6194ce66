use std::io;
use std::path::PathBuf;

use crate::TransactionState;

/// All failures surfaced by patch, revert, and generated-file operations.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A staged source file vanished or is not a regular file.
    #[error("staged source file is missing: {}", .path.display())]
    SourceMissing { path: PathBuf },

    #[error("backup phase failed to copy {}", .path.display())]
    BackupWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("install phase failed to write {}", .path.display())]
    InstallWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cleanup after an aborted commit did not finish. The target root needs
    /// manual inspection before any further patch operation.
    #[error("{trigger}; rollback also failed: {rollback}; manual inspection required")]
    RollbackFailed {
        trigger: Box<PatchError>,
        rollback: Box<PatchError>,
    },

    #[error("revert failed to restore {} from backup", .path.display())]
    RestoreFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a patch session is already applied ({}); revert it first", .record.display())]
    SessionActive { record: PathBuf },

    #[error("an interrupted patch commit was found ({}); revert it first", .journal.display())]
    InterruptedSession { journal: PathBuf },

    #[error("transaction cannot commit from state {state:?}")]
    TransactionClosed { state: TransactionState },

    #[error("unknown client version '{version}' (available: {})", .available.join(", "))]
    UnknownVersion {
        version: String,
        available: Vec<String>,
    },

    #[error("overlay layer directory not found: {}", .path.display())]
    LayerMissing { path: PathBuf },

    #[error("failed to read record {}", .path.display())]
    RecordRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse record {}", .path.display())]
    RecordParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write record {}", .path.display())]
    RecordWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("record {} lists an unsafe path: {entry}", .path.display())]
    UnsafeRecordPath { path: PathBuf, entry: String },

    #[error("{context}: {}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PatchError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PatchError> = std::result::Result<T, E>;

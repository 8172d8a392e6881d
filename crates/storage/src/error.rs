use std::path::PathBuf;

/// All errors that can be returned by a `RunLogger` or `ReportSink`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A file or directory could not be created or written.
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A trace or report could not be encoded as JSON.
    #[error("cannot serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The run was already sealed with a final report; its record is immutable.
    #[error("run {run_id} is already finalized")]
    AlreadyFinalized { run_id: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialize(what: &'static str, source: serde_json::Error) -> Self {
        StorageError::Serialize { what, source }
    }
}

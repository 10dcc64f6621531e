//! Mirror error types.

use std::path::PathBuf;

/// Errors that stop a run before any transfer happens.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("source path not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("cannot inspect source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MirrorError {
    /// Maps a metadata error on `path`, folding "not found" into
    /// [`MirrorError::SourceNotFound`].
    pub(crate) fn from_metadata(path: PathBuf, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            MirrorError::SourceNotFound(path)
        } else {
            MirrorError::Io { path, source: err }
        }
    }
}

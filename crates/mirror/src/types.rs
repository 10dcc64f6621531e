//! Public types for transfer runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sharecopy_session::RetryPolicy;
use sharecopy_transfer::{DEFAULT_CHUNK_ATTEMPTS, TransferStats};

use crate::error::MirrorError;

/// Whole-file attempts before a file is reported failed.
pub const DEFAULT_FILE_ATTEMPTS: u32 = 3;

/// Pause between consecutive files of one directory.
pub const DEFAULT_INTER_FILE_DELAY: Duration = Duration::from_millis(200);

/// What to copy, and where.
#[derive(Debug, Clone)]
pub struct TransferTask {
    source: PathBuf,
    destination: String,
    skip_existing: bool,
}

impl TransferTask {
    /// Creates a task. Fails when `source` is neither a file nor a
    /// directory.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<String>,
        skip_existing: bool,
    ) -> Result<Self, MirrorError> {
        let source = source.into();
        let metadata = std::fs::metadata(&source)
            .map_err(|e| MirrorError::from_metadata(source.clone(), e))?;
        if !metadata.is_file() && !metadata.is_dir() {
            return Err(MirrorError::SourceNotFound(source));
        }
        Ok(Self {
            source,
            destination: destination.into(),
            skip_existing,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Remote destination directory, `/` or `\` separated.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }
}

/// Retry and pacing knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// In-place retry of a single chunk write.
    pub chunk_write: RetryPolicy,
    /// Whole-file attempts, each after a reconnect.
    pub file_attempts: u32,
    pub inter_file_delay: Duration,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            chunk_write: RetryPolicy::immediate(DEFAULT_CHUNK_ATTEMPTS),
            file_attempts: DEFAULT_FILE_ATTEMPTS,
            inter_file_delay: DEFAULT_INTER_FILE_DELAY,
        }
    }
}

/// A path that could not be handled, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub path: String,
    pub reason: String,
}

impl FailedEntry {
    pub fn new(path: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result of the destination-root pre-pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootOutcome {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    /// The prefix the pre-pass stopped at, if it stopped early.
    pub failed: Option<FailedEntry>,
}

impl RootOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// Everything a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub files_transferred: Vec<String>,
    pub files_skipped: Vec<String>,
    pub files_failed: Vec<FailedEntry>,
    pub directories_created: Vec<String>,
    pub directories_existing: Vec<String>,
    pub directories_failed: Vec<FailedEntry>,
    /// Local directories that could not be listed and entries whose
    /// names cannot be sent.
    pub local_failures: Vec<FailedEntry>,
    /// Local directories reached again through a symlink, left out.
    pub local_skipped: Vec<FailedEntry>,
    /// Bytes sent and time spent sending them.
    pub transferred: TransferStats,
    pub reconnects: u32,
    /// Reconnect was exhausted and the run stopped.
    pub session_lost: bool,
}

impl TransferReport {
    pub fn is_success(&self) -> bool {
        !self.session_lost
            && self.files_failed.is_empty()
            && self.directories_failed.is_empty()
            && self.local_failures.is_empty()
    }

    /// Folds the destination pre-pass into the report.
    pub(crate) fn record_root(&mut self, root: RootOutcome) {
        self.directories_created.extend(root.created);
        self.directories_existing.extend(root.existing);
        self.directories_failed.extend(root.failed);
    }
}

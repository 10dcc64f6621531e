//! Mirror a local file or directory tree onto a remote share.
//!
//! # Pipeline
//!
//! 1. **Root**: create the destination directory chain, best-effort
//! 2. **Walk**: depth-first over the local tree, files before subdirectories
//! 3. **Send**: chunked upload per file, reconnecting between whole-file attempts
//! 4. **Teardown**: the session is closed whatever happened

pub mod error;
pub mod mirror;
pub mod orchestrator;
pub mod recovery;
pub mod types;

// Re-export primary types for convenience.
pub use error::MirrorError;
pub use mirror::DirectoryMirror;
pub use orchestrator::TransferOrchestrator;
pub use recovery::{FileRecovery, FileResult};
pub use types::{
    DEFAULT_FILE_ATTEMPTS, DEFAULT_INTER_FILE_DELAY, FailedEntry, RootOutcome, TransferPolicy,
    TransferReport, TransferTask,
};

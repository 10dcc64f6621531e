//! Chunked upload of a single local file to a remote share.
//!
//! Files are streamed in chunks no larger than the write size negotiated
//! by the session, with a bounded in-place retry per chunk. Failures that
//! need a fresh session are returned to the caller, which owns reconnect.

mod chunked;
pub mod path;
mod progress;
mod types;
mod writer;

use std::path::PathBuf;

use sharecopy_protocol::ShareError;

pub use chunked::ChunkReader;
pub use progress::{TransferStats, format_rate};
pub use types::{WriteChunk, WriteOutcome};
pub use writer::{ChunkedFileWriter, DEFAULT_CHUNK_ATTEMPTS};

/// Chunk size used when the server reports a max write size of 0.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Errors produced while writing one file.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to open remote file {path}: {source}")]
    Open { path: String, source: ShareError },

    #[error("write to {path} at offset {offset} failed: {source}")]
    Write {
        path: String,
        offset: u64,
        source: ShareError,
    },

    #[error("server ran out of credits writing {path} at offset {offset}")]
    ResourceExhausted { path: String, offset: u64 },

    #[error("failed to read local file {}: {source}", path.display())]
    Local {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("session is not connected")]
    NotConnected,
}

impl WriteError {
    /// Whether recovering needs a fresh session. Local read failures do
    /// not.
    pub fn escalates(&self) -> bool {
        !matches!(self, WriteError::Local { .. })
    }
}

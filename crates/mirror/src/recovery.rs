//! Whole-file retry across reconnects.
//!
//! The writer only retries single chunks in place. When a file fails in
//! a way that needs a fresh session, this layer reconnects and restarts
//! the file from offset zero, up to a bounded number of attempts.

use std::path::Path;

use sharecopy_protocol::{EventSink, TransferEvent};
use sharecopy_session::{RemoteSession, RetryPolicy};
use sharecopy_transfer::{ChunkedFileWriter, TransferStats, WriteOutcome};
use tracing::{error, info, warn};

/// Final result of sending one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileResult {
    Transferred(TransferStats),
    Skipped,
    /// The file could not be sent; the session is still usable.
    Failed(String),
    /// Reconnect was exhausted; nothing more can be sent.
    SessionLost(String),
}

/// Sends files through a [`ChunkedFileWriter`], reconnecting the session
/// between whole-file attempts.
#[derive(Debug, Clone)]
pub struct FileRecovery {
    writer: ChunkedFileWriter,
    attempts: RetryPolicy,
    events: EventSink,
}

impl FileRecovery {
    pub fn new(writer: ChunkedFileWriter, file_attempts: u32, events: EventSink) -> Self {
        Self {
            writer,
            attempts: RetryPolicy::immediate(file_attempts),
            events,
        }
    }

    /// Sends `local` to `remote`.
    ///
    /// Every escalating failure, the last one included, is followed by a
    /// reconnect so the session is left usable for the next file.
    pub async fn send(
        &self,
        session: &mut RemoteSession,
        local: &Path,
        remote: &str,
    ) -> FileResult {
        let size = tokio::fs::metadata(local)
            .await
            .map(|m| m.len())
            .unwrap_or_default();
        info!(path = %remote, size, "creating file");
        self.events.emit(TransferEvent::FileStarted {
            local: local.display().to_string(),
            remote: remote.to_string(),
            size,
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.writer.write_file(session, local, remote).await {
                Ok(WriteOutcome::Transferred(stats)) => {
                    info!(
                        path = %remote,
                        bytes = stats.bytes,
                        rate = %stats.rate(),
                        "file transferred"
                    );
                    self.events.emit(TransferEvent::FileTransferred {
                        remote: remote.to_string(),
                        bytes: stats.bytes,
                        elapsed: stats.elapsed,
                    });
                    return FileResult::Transferred(stats);
                }
                Ok(WriteOutcome::Skipped) => {
                    info!(path = %remote, "skipped (already exists)");
                    self.events.emit(TransferEvent::FileSkipped {
                        remote: remote.to_string(),
                    });
                    return FileResult::Skipped;
                }
                Err(e) => e,
            };

            let reason = err.to_string();
            if !err.escalates() {
                error!(path = %remote, error = %reason, "file failed");
                return self.failed(remote, reason);
            }

            warn!(
                path = %remote,
                attempt,
                max_attempts = self.attempts.limit(),
                error = %reason,
                "file attempt failed, reconnecting"
            );
            self.events.emit(TransferEvent::FileAttemptFailed {
                remote: remote.to_string(),
                attempt,
                reason: reason.clone(),
            });

            if !session.reconnect().await {
                error!(path = %remote, "session lost, abandoning file");
                self.events.emit(TransferEvent::FileFailed {
                    remote: remote.to_string(),
                    reason: reason.clone(),
                });
                return FileResult::SessionLost(reason);
            }

            if self.attempts.is_last(attempt) {
                error!(path = %remote, attempts = attempt, error = %reason, "giving up on file");
                return self.failed(remote, reason);
            }
        }
    }

    fn failed(&self, remote: &str, reason: String) -> FileResult {
        self.events.emit(TransferEvent::FileFailed {
            remote: remote.to_string(),
            reason: reason.clone(),
        });
        FileResult::Failed(reason)
    }
}

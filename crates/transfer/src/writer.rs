use std::path::Path;

use sharecopy_protocol::{
    AccessIntent, EventSink, ExistsPolicy, FileHandle, FileStore, TransferEvent,
};
use sharecopy_session::{RemoteSession, RetryPolicy};
use tracing::{debug, warn};

use crate::WriteError;
use crate::chunked::ChunkReader;
use crate::progress::TransferStats;
use crate::types::{WriteChunk, WriteOutcome};

/// Chunk write attempts before a write failure escalates.
pub const DEFAULT_CHUNK_ATTEMPTS: u32 = 3;

/// Streams one local file to one remote path.
///
/// The remote handle is always closed once opened, whatever happens
/// while streaming. Close failures are reported but never change the
/// outcome.
#[derive(Debug, Clone)]
pub struct ChunkedFileWriter {
    chunk_policy: RetryPolicy,
    skip_existing: bool,
    events: EventSink,
}

impl ChunkedFileWriter {
    pub fn new(chunk_policy: RetryPolicy, skip_existing: bool, events: EventSink) -> Self {
        Self {
            chunk_policy,
            skip_existing,
            events,
        }
    }

    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }

    fn exists_policy(&self) -> ExistsPolicy {
        if self.skip_existing {
            ExistsPolicy::FailIfExists
        } else {
            ExistsPolicy::OverwriteIf
        }
    }

    /// Copies `local` to `remote` through the session's current share
    /// handle, starting at offset zero.
    pub async fn write_file(
        &self,
        session: &RemoteSession,
        local: &Path,
        remote: &str,
    ) -> Result<WriteOutcome, WriteError> {
        let mut reader = ChunkReader::open(local, session.max_write_size())
            .await
            .map_err(|e| WriteError::Local {
                path: local.to_path_buf(),
                source: e,
            })?;
        let store = session.store().map_err(|_| WriteError::NotConnected)?;

        let handle = match store
            .create_file(remote, AccessIntent::Write, self.exists_policy())
            .await
        {
            Ok(handle) => handle,
            Err(e) if self.skip_existing && e.is_collision() => {
                debug!(path = %remote, "remote file exists, skipping");
                return Ok(WriteOutcome::Skipped);
            }
            Err(e) if e.is_resource_exhausted() => {
                warn!(path = %remote, error = %e, "open failed: out of credits");
                return Err(WriteError::ResourceExhausted {
                    path: remote.to_string(),
                    offset: 0,
                });
            }
            Err(e) => {
                warn!(path = %remote, error = %e, "failed to open remote file");
                return Err(WriteError::Open {
                    path: remote.to_string(),
                    source: e,
                });
            }
        };

        let started = tokio::time::Instant::now();
        let result = self.stream(store, &handle, &mut reader, remote).await;
        self.close(store, handle, remote).await;

        let bytes = result?;
        if bytes != reader.file_size() {
            warn!(
                path = %remote,
                expected = reader.file_size(),
                sent = bytes,
                "local file changed size during transfer"
            );
        }
        let stats = TransferStats::new(bytes, started.elapsed());
        debug!(path = %remote, bytes, rate = %stats.rate(), "file written");
        Ok(WriteOutcome::Transferred(stats))
    }

    async fn stream(
        &self,
        store: &dyn FileStore,
        handle: &FileHandle,
        reader: &mut ChunkReader,
        remote: &str,
    ) -> Result<u64, WriteError> {
        loop {
            let chunk = reader.next_chunk().await.map_err(|e| WriteError::Local {
                path: reader.path().to_path_buf(),
                source: e,
            })?;
            let Some(chunk) = chunk else {
                return Ok(reader.offset());
            };
            self.write_chunk(store, handle, &chunk, remote).await?;
        }
    }

    /// Writes one chunk, retrying in place up to the chunk policy.
    /// Credit exhaustion is never retried here.
    async fn write_chunk(
        &self,
        store: &dyn FileStore,
        handle: &FileHandle,
        chunk: &WriteChunk,
        remote: &str,
    ) -> Result<(), WriteError> {
        let policy = self.chunk_policy;
        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                policy.wait().await;
            }
            let err = match store.write_at(handle, chunk.offset, &chunk.data).await {
                Ok(written) => {
                    if written as usize != chunk.data.len() {
                        debug!(
                            path = %remote,
                            offset = chunk.offset,
                            written,
                            requested = chunk.data.len(),
                            "short write reported"
                        );
                    }
                    return Ok(());
                }
                Err(e) => e,
            };

            warn!(
                path = %remote,
                offset = chunk.offset,
                attempt,
                max_attempts = policy.limit(),
                error = %err,
                "chunk write failed"
            );
            self.events.emit(TransferEvent::ChunkWriteFailed {
                remote: remote.to_string(),
                offset: chunk.offset,
                attempt,
                max_attempts: policy.limit(),
                error: err.clone(),
            });

            if err.is_resource_exhausted() {
                return Err(WriteError::ResourceExhausted {
                    path: remote.to_string(),
                    offset: chunk.offset,
                });
            }
            if policy.is_last(attempt) {
                return Err(WriteError::Write {
                    path: remote.to_string(),
                    offset: chunk.offset,
                    source: err,
                });
            }
        }
    }

    async fn close(&self, store: &dyn FileStore, handle: FileHandle, remote: &str) {
        if let Err(e) = store.close(handle).await {
            warn!(path = %remote, error = %e, "failed to close remote file");
            self.events.emit(TransferEvent::CloseFailed {
                path: remote.to_string(),
                error: e,
            });
        }
    }
}

impl Default for ChunkedFileWriter {
    fn default() -> Self {
        Self::new(
            RetryPolicy::immediate(DEFAULT_CHUNK_ATTEMPTS),
            false,
            EventSink::disabled(),
        )
    }
}

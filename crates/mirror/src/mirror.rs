//! Recursive directory mirroring.
//!
//! Walks a local tree depth-first and recreates it under a remote
//! directory. Directory creation is idempotent: a name collision means the
//! directory is already there, which counts as success.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sharecopy_protocol::{EventSink, ShareError, TransferEvent};
use sharecopy_session::RemoteSession;
use sharecopy_transfer::ChunkedFileWriter;
use sharecopy_transfer::path::{is_current_dir, join, normalize, prefixes};
use tracing::{debug, info, warn};

use crate::recovery::{FileRecovery, FileResult};
use crate::types::{FailedEntry, RootOutcome, TransferPolicy, TransferReport};

/// Outcome of one remote directory creation.
#[derive(Debug)]
enum DirStatus {
    Created,
    Existed,
    /// Created, but the directory handle could not be closed.
    CloseFailed(ShareError),
    Failed(ShareError),
}

/// One pending directory of the walk.
struct Frame {
    local: PathBuf,
    remote: String,
    /// Whether the remote directory still has to be created.
    create: bool,
}

/// Mirrors local files and directories onto the session's share.
#[derive(Debug, Clone)]
pub struct DirectoryMirror {
    recovery: FileRecovery,
    inter_file_delay: Duration,
    events: EventSink,
}

impl DirectoryMirror {
    pub fn new(policy: &TransferPolicy, skip_existing: bool, events: EventSink) -> Self {
        let writer = ChunkedFileWriter::new(policy.chunk_write, skip_existing, events.clone());
        Self {
            recovery: FileRecovery::new(writer, policy.file_attempts, events.clone()),
            inter_file_delay: policy.inter_file_delay,
            events,
        }
    }

    /// Creates every prefix of `path` from the share root down.
    ///
    /// Best-effort: the first prefix that can neither be created nor found
    /// stops the pre-pass, and the outcome records where.
    pub async fn ensure_destination_root(
        &self,
        session: &RemoteSession,
        path: &str,
    ) -> RootOutcome {
        let mut outcome = RootOutcome::default();
        if is_current_dir(path) {
            debug!("destination is the share root, nothing to create");
            return outcome;
        }

        for prefix in prefixes(path) {
            debug!(path = %prefix, "creating destination directory if missing");
            match self.create_directory(session, &prefix).await {
                DirStatus::Created => outcome.created.push(prefix),
                DirStatus::Existed => outcome.existing.push(prefix),
                DirStatus::CloseFailed(e) | DirStatus::Failed(e) => {
                    warn!(path = %prefix, error = %e, "stopping destination pre-pass");
                    outcome.failed = Some(FailedEntry::new(prefix, e));
                    break;
                }
            }
        }
        outcome
    }

    /// Mirrors the contents of `local_dir` into `remote_dir`.
    ///
    /// Each directory's files are sent first, then each subdirectory is
    /// created and walked completely before its next sibling. Stops when
    /// the session is lost.
    ///
    /// Symlinks are followed, but a directory whose real path was already
    /// walked is left out, so a link back to an ancestor cannot loop.
    pub async fn mirror(
        &self,
        session: &mut RemoteSession,
        local_dir: &Path,
        remote_dir: &str,
        report: &mut TransferReport,
    ) {
        let mut visited = HashSet::new();
        let mut stack = vec![Frame {
            local: local_dir.to_path_buf(),
            remote: normalize(remote_dir),
            create: false,
        }];

        while let Some(frame) = stack.pop() {
            // An unresolvable path is reported by the listing below.
            if let Ok(real) = tokio::fs::canonicalize(&frame.local).await {
                if !visited.insert(real) {
                    self.skip_local(&frame.local, "directory already mirrored", report);
                    continue;
                }
            }

            if frame.create {
                self.record_directory(session, &frame.remote, report).await;
            }

            let listing = match list_dir(&frame.local).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(path = %frame.local.display(), error = %e, "cannot list local directory");
                    report
                        .local_failures
                        .push(FailedEntry::new(frame.local.display().to_string(), e));
                    continue;
                }
            };

            for path in &listing.unnamed {
                let reason = "file name is not valid UTF-8";
                warn!(path = %path.display(), reason, "skipping local entry");
                self.events.emit(TransferEvent::LocalEntrySkipped {
                    path: path.display().to_string(),
                    reason: reason.to_string(),
                });
                report
                    .local_failures
                    .push(FailedEntry::new(path.display().to_string(), reason));
            }

            for (index, (name, local)) in listing.files.iter().enumerate() {
                if index > 0 && !self.inter_file_delay.is_zero() {
                    tokio::time::sleep(self.inter_file_delay).await;
                }
                let remote = join(&frame.remote, name);
                if !self.send_file(session, local, &remote, report).await {
                    return;
                }
            }

            // Reverse so the first name is popped first.
            for (name, local) in listing.dirs.into_iter().rev() {
                stack.push(Frame {
                    remote: join(&frame.remote, &name),
                    local,
                    create: true,
                });
            }
        }
    }

    /// Sends one file with whole-file recovery and records the result.
    /// Returns `false` once the session is lost.
    pub async fn send_file(
        &self,
        session: &mut RemoteSession,
        local: &Path,
        remote: &str,
        report: &mut TransferReport,
    ) -> bool {
        match self.recovery.send(session, local, remote).await {
            FileResult::Transferred(stats) => {
                report.files_transferred.push(remote.to_string());
                report.transferred.accumulate(stats);
                true
            }
            FileResult::Skipped => {
                report.files_skipped.push(remote.to_string());
                true
            }
            FileResult::Failed(reason) => {
                report.files_failed.push(FailedEntry::new(remote, reason));
                true
            }
            FileResult::SessionLost(reason) => {
                report.files_failed.push(FailedEntry::new(remote, reason));
                report.session_lost = true;
                false
            }
        }
    }

    fn skip_local(&self, local: &Path, reason: &str, report: &mut TransferReport) {
        let path = local.display().to_string();
        warn!(path = %path, reason, "skipping local directory");
        self.events.emit(TransferEvent::LocalEntrySkipped {
            path: path.clone(),
            reason: reason.to_string(),
        });
        report.local_skipped.push(FailedEntry::new(path, reason));
    }

    async fn record_directory(
        &self,
        session: &RemoteSession,
        remote: &str,
        report: &mut TransferReport,
    ) {
        match self.create_directory(session, remote).await {
            DirStatus::Created | DirStatus::CloseFailed(_) => {
                report.directories_created.push(remote.to_string());
            }
            DirStatus::Existed => report.directories_existing.push(remote.to_string()),
            // The remote side may still hold the subtree, so the walk
            // goes on below this node.
            DirStatus::Failed(e) => report.directories_failed.push(FailedEntry::new(remote, e)),
        }
    }

    async fn create_directory(&self, session: &RemoteSession, path: &str) -> DirStatus {
        let store = match session.store() {
            Ok(store) => store,
            Err(e) => return DirStatus::Failed(ShareError::Transport(e.to_string())),
        };

        match store.create_directory(path).await {
            Ok(handle) => {
                info!(path = %path, "directory created");
                self.events.emit(TransferEvent::DirectoryCreated {
                    path: path.to_string(),
                });
                if let Err(e) = store.close(handle).await {
                    warn!(path = %path, error = %e, "could not close directory");
                    self.events.emit(TransferEvent::CloseFailed {
                        path: path.to_string(),
                        error: e.clone(),
                    });
                    return DirStatus::CloseFailed(e);
                }
                DirStatus::Created
            }
            Err(e) if e.is_collision() => {
                info!(path = %path, "directory already exists");
                self.events.emit(TransferEvent::DirectoryExists {
                    path: path.to_string(),
                });
                DirStatus::Existed
            }
            Err(e) => {
                warn!(path = %path, error = %e, "failed to create directory");
                self.events.emit(TransferEvent::DirectoryFailed {
                    path: path.to_string(),
                    error: e.clone(),
                });
                DirStatus::Failed(e)
            }
        }
    }
}

type Entries = Vec<(String, PathBuf)>;

/// Contents of one local directory.
#[derive(Debug, Default)]
struct Listing {
    /// Regular files, sorted by name.
    files: Entries,
    /// Subdirectories, sorted by name.
    dirs: Entries,
    /// Entries whose names are not valid UTF-8.
    unnamed: Vec<PathBuf>,
}

/// Lists `dir`. Symlinks are followed; entry kinds other than files and
/// directories are ignored.
async fn list_dir(dir: &Path) -> std::io::Result<Listing> {
    let mut listing = Listing::default();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !metadata.is_dir() && !metadata.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            listing.unnamed.push(path);
            continue;
        };
        if metadata.is_dir() {
            listing.dirs.push((name, path));
        } else {
            listing.files.push((name, path));
        }
    }

    listing.files.sort();
    listing.dirs.sort();
    listing.unnamed.sort();
    Ok(listing)
}

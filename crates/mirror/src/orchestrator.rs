//! Top-level transfer run.

use sharecopy_protocol::EventSink;
use sharecopy_session::RemoteSession;
use sharecopy_transfer::path::join;
use tracing::{info, warn};

use crate::error::MirrorError;
use crate::mirror::DirectoryMirror;
use crate::types::{TransferPolicy, TransferReport, TransferTask};

/// Runs one [`TransferTask`] over a connected session, then tears the
/// session down.
pub struct TransferOrchestrator {
    session: RemoteSession,
    policy: TransferPolicy,
    events: EventSink,
}

impl TransferOrchestrator {
    pub fn new(session: RemoteSession, policy: TransferPolicy, events: EventSink) -> Self {
        Self {
            session,
            policy,
            events,
        }
    }

    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    /// Copies `task.source` (a file or a whole tree) under
    /// `task.destination`.
    ///
    /// The session is closed on every path out of this call. A lost
    /// session is reported through [`TransferReport::session_lost`], not
    /// as an error.
    pub async fn run(mut self, task: TransferTask) -> Result<TransferReport, MirrorError> {
        let result = self.execute(&task).await;
        self.session.close().await;
        result
    }

    async fn execute(&mut self, task: &TransferTask) -> Result<TransferReport, MirrorError> {
        let source = task.source();
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| MirrorError::from_metadata(source.to_path_buf(), e))?;

        let config = self.session.config();
        info!(
            "Copying files from {} to \\\\{}\\{}\\{}",
            source.display(),
            config.address,
            config.share,
            task.destination()
        );

        let mirror = DirectoryMirror::new(&self.policy, task.skip_existing(), self.events.clone());
        let reconnects_before = self.session.reconnect_count();
        let mut report = TransferReport::default();

        let root = mirror
            .ensure_destination_root(&self.session, task.destination())
            .await;
        if let Some(failed) = &root.failed {
            warn!(path = %failed.path, reason = %failed.reason, "destination root incomplete");
        }
        report.record_root(root);

        if metadata.is_dir() {
            mirror
                .mirror(&mut self.session, source, task.destination(), &mut report)
                .await;
        } else {
            let name = source
                .file_name()
                .ok_or_else(|| MirrorError::SourceNotFound(source.to_path_buf()))?
                .to_string_lossy();
            let remote = join(task.destination(), &name);
            mirror
                .send_file(&mut self.session, source, &remote, &mut report)
                .await;
        }

        report.reconnects = self.session.reconnect_count() - reconnects_before;
        info!(
            transferred = report.files_transferred.len(),
            skipped = report.files_skipped.len(),
            failed = report.files_failed.len(),
            bytes = report.transferred.bytes,
            rate = %report.transferred.rate(),
            reconnects = report.reconnects,
            session_lost = report.session_lost,
            "transfer finished"
        );
        Ok(report)
    }
}

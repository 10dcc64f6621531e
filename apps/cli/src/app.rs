//! One copy run: connect, mirror, report.

use sharecopy_local_share::MountedShareConnector;
use sharecopy_mirror::{TransferOrchestrator, TransferReport, TransferTask};
use sharecopy_protocol::{Credentials, EventSink, TransferEvent};
use sharecopy_session::{RemoteSession, SessionConfig};
use sharecopy_transfer::format_rate;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::Cli;
use crate::config::Config;

/// Runs the copy described by `cli`. Returns `true` when nothing failed.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<bool> {
    // Validate the source before touching the network.
    let task = TransferTask::new(&cli.source, &cli.destination, cli.skip_existing)?;

    let mount_root = cli.mount_root.unwrap_or_else(|| config.mount_root());
    let connector = MountedShareConnector::new(mount_root)
        .with_max_write_size(config.local_share.max_write_size);

    let session_config = SessionConfig {
        address: cli.server,
        share: cli.tree,
        domain: cli.domain,
        credentials: Credentials::new(cli.username, cli.password),
    };

    let (events, rx) = EventSink::channel();
    let printer = tokio::spawn(print_events(rx));

    let connected = RemoteSession::connect(
        Box::new(connector),
        session_config,
        config.reconnect_policy(),
        events.clone(),
    )
    .await;

    let session = match connected {
        Ok(session) => session,
        Err(e) => {
            drop(events);
            let _ = printer.await;
            return Err(e.into());
        }
    };

    let limits = session.limits();
    info!(
        max_read = limits.max_read_size,
        max_write = limits.max_write_size,
        max_transact = limits.max_transact_size,
        "negotiated limits"
    );

    let result = TransferOrchestrator::new(session, config.transfer_policy(), events)
        .run(task)
        .await;

    // Every sender is gone once the orchestrator is consumed.
    let _ = printer.await;

    let report = result?;
    print_summary(&report);
    Ok(report.is_success())
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<TransferEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = describe(&event) {
            println!("{line}");
        }
    }
}

/// Renders an event as a console line. `None` for events not worth a line.
fn describe(event: &TransferEvent) -> Option<String> {
    let line = match event {
        TransferEvent::Connecting { .. } => return None,
        TransferEvent::Connected { address, share, .. } => {
            format!("Connected to \\\\{address}\\{share}")
        }
        TransferEvent::ConnectFailed { stage, error } => {
            format!("Connection failed at {stage:?}: {error}")
        }
        TransferEvent::Reconnecting {
            attempt,
            max_attempts,
            delay,
        } => format!(
            "Reconnecting in {}s (attempt {attempt}/{max_attempts})",
            delay.as_secs()
        ),
        TransferEvent::ReconnectFailed { attempt } => {
            format!("Reconnect attempt {attempt} failed")
        }
        TransferEvent::Reconnected { attempt } => {
            format!("Reconnected after {attempt} attempt(s)")
        }
        TransferEvent::ReconnectExhausted { attempts } => {
            format!("Giving up after {attempts} reconnect attempts")
        }
        TransferEvent::Disconnected => "Disconnected".to_string(),
        TransferEvent::DirectoryCreated { path } => {
            format!("Creating directory {path}: created")
        }
        TransferEvent::DirectoryExists { path } => {
            format!("Creating directory {path}: already exists")
        }
        TransferEvent::DirectoryFailed { path, error } => {
            format!("Creating directory {path}: failed ({error})")
        }
        TransferEvent::FileStarted { remote, size, .. } => {
            format!("Copying {remote} ({size} bytes)")
        }
        TransferEvent::FileSkipped { remote } => format!("  {remote}: skipped, already exists"),
        TransferEvent::ChunkWriteFailed {
            offset,
            attempt,
            max_attempts,
            error,
            ..
        } => format!("  write at offset {offset} failed (attempt {attempt}/{max_attempts}): {error}"),
        TransferEvent::FileAttemptFailed {
            attempt, reason, ..
        } => format!("  attempt {attempt} failed: {reason}"),
        TransferEvent::FileTransferred {
            bytes, elapsed, ..
        } => {
            let secs = elapsed.as_secs_f64();
            let rate = if secs > 0.0 {
                format_rate((*bytes as f64 / secs) as u64)
            } else {
                format_rate(*bytes)
            };
            format!("  {bytes} bytes in {secs:.2}s ({rate})")
        }
        TransferEvent::FileFailed { remote, reason } => format!("  {remote}: failed ({reason})"),
        TransferEvent::LocalEntrySkipped { path, reason } => {
            format!("Skipping {path}: {reason}")
        }
        TransferEvent::CloseFailed { path, error } => {
            format!("  could not close {path}: {error}")
        }
    };
    Some(line)
}

fn print_summary(report: &TransferReport) {
    println!(
        "Done: {} copied, {} skipped, {} failed, {} bytes ({}), {} reconnect(s)",
        report.files_transferred.len(),
        report.files_skipped.len(),
        report.files_failed.len(),
        report.transferred.bytes,
        report.transferred.rate(),
        report.reconnects,
    );
    for failed in report
        .directories_failed
        .iter()
        .chain(&report.files_failed)
        .chain(&report.local_failures)
    {
        println!("  FAILED {}: {}", failed.path, failed.reason);
    }
    if report.session_lost {
        println!("Session lost; the run stopped early");
    }
}

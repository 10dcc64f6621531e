//! End-to-end runs against the in-memory share.

use std::fs;
use std::path::Path;
use std::time::Duration;

use sharecopy_mirror::{TransferOrchestrator, TransferPolicy, TransferReport, TransferTask};
use sharecopy_protocol::events::drain;
use sharecopy_protocol::memory::{MemoryShare, Op};
use sharecopy_protocol::{Credentials, EventSink, ShareError, Status, TransferEvent};
use sharecopy_session::{RemoteSession, RetryPolicy, SessionConfig};
use tempfile::TempDir;

async fn session(share: &MemoryShare, events: EventSink) -> RemoteSession {
    RemoteSession::connect(
        Box::new(share.clone()),
        SessionConfig {
            address: "fileserver".into(),
            share: "backup".into(),
            domain: "WORKGROUP".into(),
            credentials: Credentials::new(Some("copier".into()), Some("hunter2".into())),
        },
        RetryPolicy::reconnect(),
        events,
    )
    .await
    .unwrap()
}

async fn run(share: &MemoryShare, task: TransferTask, events: EventSink) -> TransferReport {
    let session = session(share, events.clone()).await;
    TransferOrchestrator::new(session, TransferPolicy::default(), events)
        .run(task)
        .await
        .unwrap()
}

/// `A/{f1.txt, B/{f2.txt}}`
fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("f1.txt"), b"first file").unwrap();
    fs::create_dir(root.join("B")).unwrap();
    fs::write(root.join("B").join("f2.txt"), b"second file").unwrap();
    dir
}

fn position(ops: &[Op], wanted: &Op) -> usize {
    ops.iter()
        .position(|op| op == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} not found in {ops:?}"))
}

fn write_offsets(ops: &[Op]) -> Vec<u64> {
    ops.iter()
        .filter_map(|op| match op {
            Op::Write { offset, .. } => Some(*offset),
            _ => None,
        })
        .collect()
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn write_file(dir: &Path, name: &str, data: &[u8]) {
    fs::write(dir.join(name), data).unwrap();
}

#[tokio::test(start_paused = true)]
async fn mirrors_tree_under_destination() {
    let share = MemoryShare::new();
    let tree = sample_tree();
    let task = TransferTask::new(tree.path(), "D", false).unwrap();

    let report = run(&share, task, EventSink::disabled()).await;

    assert!(report.is_success());
    assert_eq!(share.file("D\\f1.txt").unwrap(), b"first file");
    assert_eq!(share.file("D\\B\\f2.txt").unwrap(), b"second file");
    assert_eq!(report.directories_created, vec!["D", "D\\B"]);
    assert_eq!(report.files_transferred, vec!["D\\f1.txt", "D\\B\\f2.txt"]);

    let ops = share.ops();
    let mkdir_b = position(&ops, &Op::CreateDirectory { path: "D\\B".into() });
    let create_f2 = position(
        &ops,
        &Op::CreateFile {
            path: "D\\B\\f2.txt".into(),
            policy: sharecopy_protocol::ExistsPolicy::OverwriteIf,
        },
    );
    let create_f1 = position(
        &ops,
        &Op::CreateFile {
            path: "D\\f1.txt".into(),
            policy: sharecopy_protocol::ExistsPolicy::OverwriteIf,
        },
    );
    assert!(create_f1 < mkdir_b);
    assert!(mkdir_b < create_f2);
    assert_eq!(share.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn rerun_with_skip_sees_only_collisions() {
    let share = MemoryShare::new();
    let tree = sample_tree();
    run(
        &share,
        TransferTask::new(tree.path(), "D", true).unwrap(),
        EventSink::disabled(),
    )
    .await;
    share.clear_ops();

    let (events, mut rx) = EventSink::channel();
    let report = run(
        &share,
        TransferTask::new(tree.path(), "D", true).unwrap(),
        events,
    )
    .await;

    assert!(report.is_success());
    assert!(report.directories_created.is_empty());
    assert_eq!(report.directories_existing, vec!["D", "D\\B"]);
    assert_eq!(report.files_skipped, vec!["D\\f1.txt", "D\\B\\f2.txt"]);
    assert!(write_offsets(&share.ops()).is_empty());

    let events = drain(&mut rx);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, TransferEvent::DirectoryCreated { .. }))
    );
    let existing = events
        .iter()
        .filter(|e| matches!(e, TransferEvent::DirectoryExists { .. }))
        .count();
    assert_eq!(existing, 2);
}

#[tokio::test(start_paused = true)]
async fn rerun_without_skip_overwrites_with_same_bytes() {
    let share = MemoryShare::new();
    let tree = sample_tree();
    run(
        &share,
        TransferTask::new(tree.path(), "D", false).unwrap(),
        EventSink::disabled(),
    )
    .await;
    let before = share.file("D\\f1.txt").unwrap();

    let report = run(
        &share,
        TransferTask::new(tree.path(), "D", false).unwrap(),
        EventSink::disabled(),
    )
    .await;

    assert!(report.is_success());
    assert_eq!(report.directories_existing, vec!["D", "D\\B"]);
    assert_eq!(report.files_transferred.len(), 2);
    assert_eq!(share.file("D\\f1.txt").unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn credit_exhaustion_mid_file_restarts_from_zero() {
    let share = MemoryShare::new().with_max_write_size(4);
    let dir = TempDir::new().unwrap();
    let data = patterned(20);
    write_file(dir.path(), "big.bin", &data);
    share.script_writes([None, Some(ShareError::InsufficientCredits)]);

    let task = TransferTask::new(dir.path().join("big.bin"), ".", false).unwrap();
    let report = run(&share, task, EventSink::disabled()).await;

    assert!(report.is_success());
    assert_eq!(report.reconnects, 1);
    assert_eq!(share.file("big.bin").unwrap(), data);

    let ops = share.ops();
    let second_connect = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, Op::Connect))
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(write_offsets(&ops[..second_connect]), vec![0]);
    assert_eq!(write_offsets(&ops[second_connect..]), vec![0, 4, 8, 12, 16]);
}

#[tokio::test(start_paused = true)]
async fn lost_session_fails_file_and_keeps_earlier_siblings() {
    let share = MemoryShare::new();
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"alpha");
    write_file(dir.path(), "b.txt", b"bravo");
    write_file(dir.path(), "c.txt", b"charlie");

    let (events, mut rx) = EventSink::channel();
    let session = session(&share, events.clone()).await;
    share.fail_connects(u32::MAX);
    share.script_writes([None, Some(ShareError::InsufficientCredits)]);

    let start = tokio::time::Instant::now();
    let task = TransferTask::new(dir.path(), "D", false).unwrap();
    let report = TransferOrchestrator::new(session, TransferPolicy::default(), events)
        .run(task)
        .await
        .unwrap();

    assert!(report.session_lost);
    assert!(!report.is_success());
    assert_eq!(report.files_transferred, vec!["D\\a.txt"]);
    assert_eq!(report.files_failed.len(), 1);
    assert_eq!(report.files_failed[0].path, "D\\b.txt");
    assert_eq!(share.file("D\\a.txt").unwrap(), b"alpha");
    assert!(share.file("D\\c.txt").is_none());

    // Ten reconnect attempts, 20 s apart, plus one inter-file pause.
    assert_eq!(
        start.elapsed(),
        Duration::from_secs(200) + Duration::from_millis(200)
    );
    assert!(share.ops().contains(&Op::Logoff));
    assert_eq!(share.open_handles(), 0);
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e, TransferEvent::ReconnectExhausted { attempts: 10 }))
    );
}

#[tokio::test(start_paused = true)]
async fn chunk_failures_below_bound_need_no_reconnect() {
    let share = MemoryShare::new();
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "f.txt", b"payload");
    let failure = ShareError::Status(Status::SharingViolation);
    share.script_writes([Some(failure.clone()), Some(failure)]);

    let task = TransferTask::new(dir.path().join("f.txt"), "D", false).unwrap();
    let report = run(&share, task, EventSink::disabled()).await;

    assert!(report.is_success());
    assert_eq!(report.reconnects, 0);
    assert_eq!(share.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn chunk_failures_at_bound_trigger_one_reconnect() {
    let share = MemoryShare::new();
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "f.txt", b"payload");
    let failure = ShareError::Status(Status::SharingViolation);
    share.script_writes(std::iter::repeat_n(Some(failure), 3));

    let task = TransferTask::new(dir.path().join("f.txt"), "D", false).unwrap();
    let report = run(&share, task, EventSink::disabled()).await;

    assert!(report.is_success());
    assert_eq!(report.reconnects, 1);
    assert_eq!(share.file("D\\f.txt").unwrap(), b"payload");
}

#[tokio::test(start_paused = true)]
async fn chunk_sizes_follow_negotiated_limit() {
    let share = MemoryShare::new().with_max_write_size(1000);
    let dir = TempDir::new().unwrap();
    let data = patterned(2500);
    write_file(dir.path(), "f.bin", &data);

    let task = TransferTask::new(dir.path().join("f.bin"), "D", false).unwrap();
    let report = run(&share, task, EventSink::disabled()).await;

    assert_eq!(report.transferred.bytes, 2500);
    let lens: Vec<usize> = share
        .ops()
        .iter()
        .filter_map(|op| match op {
            Op::Write { len, .. } => Some(*len),
            _ => None,
        })
        .collect();
    assert_eq!(lens, vec![1000, 1000, 500]);
    assert_eq!(share.file("D\\f.bin").unwrap(), data);
}

//! Progress and diagnostic events emitted during a transfer run.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::client::NegotiatedLimits;
use crate::error::ShareError;

/// Stage of the connect sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    Connect,
    Login,
    TreeConnect,
}

/// A discrete state transition of the transfer engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// Connect sequence started.
    Connecting { address: String, share: String },
    /// Session is authenticated and attached to the share.
    Connected {
        address: String,
        share: String,
        limits: NegotiatedLimits,
    },
    /// One stage of the connect sequence failed.
    ConnectFailed {
        stage: ConnectStage,
        error: ShareError,
    },
    /// Waiting before reconnect attempt `attempt`.
    Reconnecting {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    ReconnectFailed { attempt: u32 },
    Reconnected { attempt: u32 },
    /// All reconnect attempts failed; the session stays down.
    ReconnectExhausted { attempts: u32 },
    /// Session torn down.
    Disconnected,

    DirectoryCreated { path: String },
    /// Directory creation hit a collision, which counts as success.
    DirectoryExists { path: String },
    DirectoryFailed { path: String, error: ShareError },

    FileStarted {
        local: String,
        remote: String,
        size: u64,
    },
    /// Remote file already existed and the skip policy is on.
    FileSkipped { remote: String },
    ChunkWriteFailed {
        remote: String,
        offset: u64,
        attempt: u32,
        max_attempts: u32,
        error: ShareError,
    },
    /// One whole-file attempt failed and will be retried after reconnect.
    FileAttemptFailed {
        remote: String,
        attempt: u32,
        reason: String,
    },
    FileTransferred {
        remote: String,
        bytes: u64,
        elapsed: Duration,
    },
    FileFailed { remote: String, reason: String },
    /// A local entry was left out of the walk.
    LocalEntrySkipped { path: String, reason: String },
    /// Closing a handle failed. The transfer outcome is unaffected.
    CloseFailed { path: String, error: ShareError },
}

/// Cloneable sender side of the event stream.
///
/// A disabled sink drops every event, and a sink whose receiver was
/// dropped behaves the same. Emitting never blocks.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<TransferEvent>>,
}

impl EventSink {
    /// Creates a sink and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: TransferEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Drains every event currently buffered in `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(TransferEvent::DirectoryCreated { path: "a".into() });
        sink.emit(TransferEvent::DirectoryExists { path: "a".into() });

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                TransferEvent::DirectoryCreated { path: "a".into() },
                TransferEvent::DirectoryExists { path: "a".into() },
            ]
        );
    }

    #[test]
    fn disabled_sink_is_silent() {
        let sink = EventSink::disabled();
        sink.emit(TransferEvent::Disconnected);
    }

    #[test]
    fn emit_after_receiver_dropped_does_not_panic() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(TransferEvent::Disconnected);
    }

    #[test]
    fn clones_share_one_stream() {
        let (sink, mut rx) = EventSink::channel();
        let other = sink.clone();
        sink.emit(TransferEvent::Disconnected);
        other.emit(TransferEvent::ReconnectFailed { attempt: 1 });
        assert_eq!(drain(&mut rx).len(), 2);
    }
}

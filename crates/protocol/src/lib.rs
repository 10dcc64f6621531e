//! Contract between the transfer engine and a remote file-share protocol
//! client, plus the event stream the engine reports progress through.

pub mod client;
pub mod error;
pub mod events;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod status;

// Re-export primary types for convenience.
pub use client::{
    AccessIntent, Credentials, ExistsPolicy, FileHandle, FileStore, NegotiatedLimits,
    ShareClient, ShareConnector,
};
pub use error::ShareError;
pub use events::{ConnectStage, EventSink, TransferEvent};
pub use status::Status;

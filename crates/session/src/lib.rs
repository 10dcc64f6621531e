//! Remote share session with in-place reconnect.
//!
//! A [`RemoteSession`] owns one protocol client and one share handle at a
//! time. When writes start failing the transfer layer asks it to
//! [`reconnect`](RemoteSession::reconnect), which tears the old state down
//! and retries the whole connect sequence under a [`RetryPolicy`].

pub mod error;
pub mod session;
pub mod types;

pub use error::SessionError;
pub use session::RemoteSession;
pub use types::{
    ConnectionState, DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY, RetryPolicy,
    SessionConfig,
};

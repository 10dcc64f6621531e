//! Client-side contract of the remote file-access protocol.
//!
//! The transfer engine never speaks the wire protocol itself. A backend
//! implements these traits on top of a real protocol stack (or a mounted
//! share, or memory for tests).

use std::fmt;

use futures_util::future::BoxFuture;

use crate::error::ShareError;

/// Transfer sizes negotiated with the server at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedLimits {
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub max_transact_size: u32,
}

impl Default for NegotiatedLimits {
    fn default() -> Self {
        Self {
            max_read_size: 65_536,
            max_write_size: 65_536,
            max_transact_size: 65_536,
        }
    }
}

/// Login credentials. An absent username logs in anonymously.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What the opener intends to do with a created file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessIntent {
    Write,
    ReadWrite,
}

/// Behaviour of `create_file` when the target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsPolicy {
    /// Fail with `STATUS_OBJECT_NAME_COLLISION`.
    FailIfExists,
    /// Truncate and reuse the existing file.
    OverwriteIf,
}

/// Opaque handle to an open remote file or directory.
///
/// Not `Clone`: [`FileStore::close`] consumes it, so a closed handle
/// cannot be used again.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Wraps a backend-specific handle id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Produces fresh, unconnected clients. A session asks for a new client
/// on every (re)connect so no protocol state survives a reconnect.
pub trait ShareConnector: Send + Sync {
    fn client(&self) -> Box<dyn ShareClient>;
}

/// One protocol connection to a server.
pub trait ShareClient: Send + Sync {
    /// Opens the transport to `address`.
    fn connect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<(), ShareError>>;

    /// Authenticates against `domain`.
    fn login<'a>(
        &'a self,
        domain: &'a str,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<(), ShareError>>;

    /// Attaches to a share and returns its file store.
    fn tree_connect<'a>(
        &'a self,
        share: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn FileStore>, ShareError>>;

    /// Sizes negotiated during `connect`.
    fn limits(&self) -> NegotiatedLimits;

    fn logoff(&self) -> BoxFuture<'_, Result<(), ShareError>>;

    /// Closes the transport. Idempotent.
    fn disconnect(&self) -> BoxFuture<'_, ()>;
}

/// File operations on one attached share. Paths are relative to the
/// share root and backslash separated.
pub trait FileStore: Send + Sync {
    fn create_file<'a>(
        &'a self,
        path: &'a str,
        access: AccessIntent,
        policy: ExistsPolicy,
    ) -> BoxFuture<'a, Result<FileHandle, ShareError>>;

    /// Creates a directory. An existing one reports
    /// `STATUS_OBJECT_NAME_COLLISION`.
    fn create_directory<'a>(&'a self, path: &'a str)
    -> BoxFuture<'a, Result<FileHandle, ShareError>>;

    /// Writes `data` at `offset` and returns the byte count the server
    /// acknowledged.
    fn write_at<'a>(
        &'a self,
        handle: &'a FileHandle,
        offset: u64,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<u32, ShareError>>;

    fn close(&self, handle: FileHandle) -> BoxFuture<'_, Result<(), ShareError>>;

    /// Detaches from the share.
    fn disconnect(&self) -> BoxFuture<'_, Result<(), ShareError>>;
}

//! Share backend over a locally mounted share root.
//!
//! A server `srv` with share `data` is expected at
//! `<mount_root>/srv/data`, which is how CIFS/SMB mounts are usually laid
//! out. Every protocol call becomes a `tokio::fs` operation, and
//! filesystem errors are reported as the status codes an SMB server would
//! return for the same condition.

mod resolve;

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use sharecopy_protocol::{
    AccessIntent, Credentials, ExistsPolicy, FileHandle, FileStore, NegotiatedLimits,
    ShareClient, ShareConnector, ShareError, Status,
};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

pub use resolve::{map_io, resolve};

/// Write size advertised when none is configured: 64 KiB.
pub const DEFAULT_MAX_WRITE_SIZE: u32 = 64 * 1024;

/// Creates clients that talk to shares mounted under one directory.
#[derive(Debug, Clone)]
pub struct MountedShareConnector {
    mount_root: PathBuf,
    max_write_size: u32,
}

impl MountedShareConnector {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
            max_write_size: DEFAULT_MAX_WRITE_SIZE,
        }
    }

    /// Overrides the advertised write size. Zero keeps the default.
    pub fn with_max_write_size(mut self, size: u32) -> Self {
        if size > 0 {
            self.max_write_size = size;
        }
        self
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }
}

impl ShareConnector for MountedShareConnector {
    fn client(&self) -> Box<dyn ShareClient> {
        Box::new(MountedClient {
            mount_root: self.mount_root.clone(),
            max_write_size: self.max_write_size,
            server: Mutex::new(None),
            handles: Arc::new(HandleTable::default()),
        })
    }
}

enum OpenHandle {
    File(tokio::fs::File),
    Directory,
}

/// Open handles of one client. Cleared when the client disconnects.
#[derive(Default)]
struct HandleTable {
    open: Mutex<HashMap<u64, (PathBuf, OpenHandle)>>,
    next: AtomicU64,
}

impl HandleTable {
    async fn insert(&self, path: PathBuf, handle: OpenHandle) -> FileHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.open.lock().await.insert(id, (path, handle));
        FileHandle::new(id)
    }
}

struct MountedClient {
    mount_root: PathBuf,
    max_write_size: u32,
    /// Server directory, set once connected.
    server: Mutex<Option<PathBuf>>,
    handles: Arc<HandleTable>,
}

impl ShareClient for MountedClient {
    fn connect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<(), ShareError>> {
        Box::pin(async move {
            if address.is_empty() {
                return Err(ShareError::Transport("empty server address".into()));
            }
            let server = resolve(&self.mount_root, address)?;
            let is_dir = tokio::fs::metadata(&server)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(ShareError::Transport(format!(
                    "server {address} is not mounted under {}",
                    self.mount_root.display()
                )));
            }
            debug!(server = %server.display(), "mounted server found");
            *self.server.lock().await = Some(server);
            Ok(())
        })
    }

    fn login<'a>(
        &'a self,
        domain: &'a str,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<(), ShareError>> {
        Box::pin(async move {
            if self.server.lock().await.is_none() {
                return Err(ShareError::Transport("not connected".into()));
            }
            // The mount already carries its own credentials.
            debug!(domain, username = credentials.username(), "login accepted");
            Ok(())
        })
    }

    fn tree_connect<'a>(
        &'a self,
        share: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn FileStore>, ShareError>> {
        Box::pin(async move {
            let Some(server) = self.server.lock().await.clone() else {
                return Err(ShareError::Transport("not connected".into()));
            };
            if share.is_empty() {
                return Err(Status::BadNetworkName.into());
            }
            let root = resolve(&server, share)?;
            let is_dir = tokio::fs::metadata(&root)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(Status::BadNetworkName.into());
            }
            let store: Box<dyn FileStore> = Box::new(MountedStore {
                root,
                handles: Arc::clone(&self.handles),
            });
            Ok(store)
        })
    }

    fn limits(&self) -> NegotiatedLimits {
        NegotiatedLimits {
            max_read_size: self.max_write_size,
            max_write_size: self.max_write_size,
            max_transact_size: self.max_write_size,
        }
    }

    fn logoff(&self) -> BoxFuture<'_, Result<(), ShareError>> {
        Box::pin(async move { Ok(()) })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.handles.open.lock().await.clear();
            *self.server.lock().await = None;
        })
    }
}

struct MountedStore {
    root: PathBuf,
    handles: Arc<HandleTable>,
}

impl FileStore for MountedStore {
    fn create_file<'a>(
        &'a self,
        path: &'a str,
        access: AccessIntent,
        policy: ExistsPolicy,
    ) -> BoxFuture<'a, Result<FileHandle, ShareError>> {
        Box::pin(async move {
            let full = resolve(&self.root, path)?;
            let mut options = tokio::fs::OpenOptions::new();
            options.write(true).read(access == AccessIntent::ReadWrite);
            match policy {
                ExistsPolicy::FailIfExists => options.create_new(true),
                ExistsPolicy::OverwriteIf => options.create(true).truncate(true),
            };
            let file = options.open(&full).await.map_err(map_io)?;
            Ok(self.handles.insert(full, OpenHandle::File(file)).await)
        })
    }

    fn create_directory<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FileHandle, ShareError>> {
        Box::pin(async move {
            let full = resolve(&self.root, path)?;
            tokio::fs::create_dir(&full).await.map_err(map_io)?;
            Ok(self.handles.insert(full, OpenHandle::Directory).await)
        })
    }

    fn write_at<'a>(
        &'a self,
        handle: &'a FileHandle,
        offset: u64,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<u32, ShareError>> {
        Box::pin(async move {
            let mut open = self.handles.open.lock().await;
            let file = match open.get_mut(&handle.id()) {
                Some((_, OpenHandle::File(file))) => file,
                Some((_, OpenHandle::Directory)) => {
                    return Err(Status::InvalidParameter.into());
                }
                None => return Err(Status::FileClosed.into()),
            };
            file.seek(SeekFrom::Start(offset)).await.map_err(map_io)?;
            file.write_all(data).await.map_err(map_io)?;
            Ok(data.len() as u32)
        })
    }

    fn close(&self, handle: FileHandle) -> BoxFuture<'_, Result<(), ShareError>> {
        Box::pin(async move {
            let entry = self.handles.open.lock().await.remove(&handle.id());
            match entry {
                Some((_, OpenHandle::File(mut file))) => file.flush().await.map_err(map_io),
                Some((_, OpenHandle::Directory)) => Ok(()),
                None => Err(Status::FileClosed.into()),
            }
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), ShareError>> {
        Box::pin(async move {
            let mut open = self.handles.open.lock().await;
            let root = &self.root;
            open.retain(|_, (path, _)| !path.starts_with(root));
            Ok(())
        })
    }
}

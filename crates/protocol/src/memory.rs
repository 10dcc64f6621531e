//! In-memory share with fault injection.
//!
//! Behaves like a small SMB server: directories must exist before
//! anything is created inside them, existing objects report
//! `STATUS_OBJECT_NAME_COLLISION`, and handles die with the client that
//! opened them. Every call is recorded in an operation log so tests can
//! assert on exactly what reached the wire.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::BoxFuture;

use crate::client::{
    AccessIntent, Credentials, ExistsPolicy, FileHandle, FileStore, NegotiatedLimits,
    ShareClient, ShareConnector,
};
use crate::error::ShareError;
use crate::status::Status;

/// One recorded protocol call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect,
    Login { domain: String, username: String },
    TreeConnect { share: String },
    TreeDisconnect,
    Logoff,
    Disconnect,
    CreateDirectory { path: String },
    CreateFile { path: String, policy: ExistsPolicy },
    Write { path: String, offset: u64, len: usize },
    /// A write that was answered with an error.
    WriteRejected { path: String, offset: u64 },
    Close { path: String },
}

#[derive(Debug)]
struct OpenEntry {
    path: String,
    client: u64,
}

#[derive(Debug)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    open: HashMap<u64, OpenEntry>,
    next_handle: u64,
    next_client: u64,
    ops: Vec<Op>,
    limits: NegotiatedLimits,
    write_script: VecDeque<Option<ShareError>>,
    connect_failures: u32,
    login_failures: u32,
    close_failures: u32,
    directory_faults: HashMap<String, ShareError>,
    open_faults: HashMap<String, VecDeque<ShareError>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            dirs: BTreeSet::new(),
            files: BTreeMap::new(),
            open: HashMap::new(),
            next_handle: 1,
            next_client: 1,
            ops: Vec::new(),
            limits: NegotiatedLimits::default(),
            write_script: VecDeque::new(),
            connect_failures: 0,
            login_failures: 0,
            close_failures: 0,
            directory_faults: HashMap::new(),
            open_faults: HashMap::new(),
        }
    }
}

impl State {
    fn parent_exists(&self, path: &str) -> bool {
        match path.rsplit_once('\\') {
            Some((parent, _)) => self.dirs.contains(parent),
            None => true,
        }
    }

    fn open_handle(&mut self, path: &str, client: u64) -> FileHandle {
        let id = self.next_handle;
        self.next_handle += 1;
        self.open.insert(
            id,
            OpenEntry {
                path: path.to_string(),
                client,
            },
        );
        FileHandle::new(id)
    }
}

/// Normalizes a share path the way the server sees it.
fn share_path(path: &str) -> String {
    path.replace('/', "\\").trim_matches('\\').to_string()
}

/// A shared in-memory share. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryShare {
    state: Arc<Mutex<State>>,
}

impl MemoryShare {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write size advertised to new connections.
    pub fn with_max_write_size(self, size: u32) -> Self {
        self.lock().limits.max_write_size = size;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Pre-creates a directory (parents are not created).
    pub fn add_directory(&self, path: &str) {
        self.lock().dirs.insert(share_path(path));
    }

    /// Pre-creates a file with `data`.
    pub fn add_file(&self, path: &str, data: &[u8]) {
        self.lock().files.insert(share_path(path), data.to_vec());
    }

    /// Contents of a remote file.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&share_path(path)).cloned()
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.lock().dirs.contains(&share_path(path))
    }

    /// All remote file paths, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// Snapshot of the operation log.
    pub fn ops(&self) -> Vec<Op> {
        self.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.lock().ops.clear();
    }

    /// Number of handles currently open across all clients.
    pub fn open_handles(&self) -> usize {
        self.lock().open.len()
    }

    /// Number of transport connects attempted so far, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Connect))
            .count()
    }

    /// Scripts the outcome of upcoming writes, in order.
    ///
    /// `None` lets a write through; `Some(err)` rejects it. Once the script
    /// runs out every write succeeds.
    pub fn script_writes<I>(&self, script: I)
    where
        I: IntoIterator<Item = Option<ShareError>>,
    {
        self.lock().write_script.extend(script);
    }

    /// Makes the next `count` transport connects fail.
    pub fn fail_connects(&self, count: u32) {
        self.lock().connect_failures = count;
    }

    /// Makes the next `count` logins fail with `STATUS_LOGON_FAILURE`.
    pub fn fail_logins(&self, count: u32) {
        self.lock().login_failures = count;
    }

    /// Makes the next opens of the file at `path` fail, one error per open.
    pub fn fail_opens<I>(&self, path: &str, errors: I)
    where
        I: IntoIterator<Item = ShareError>,
    {
        self.lock()
            .open_faults
            .entry(share_path(path))
            .or_default()
            .extend(errors);
    }

    /// Makes the next `count` handle closes fail.
    pub fn fail_closes(&self, count: u32) {
        self.lock().close_failures = count;
    }

    /// Makes every creation of the directory at `path` fail with `error`.
    pub fn fail_directory(&self, path: &str, error: ShareError) {
        self.lock().directory_faults.insert(share_path(path), error);
    }
}

impl ShareConnector for MemoryShare {
    fn client(&self) -> Box<dyn ShareClient> {
        let id = {
            let mut state = self.lock();
            let id = state.next_client;
            state.next_client += 1;
            id
        };
        Box::new(MemoryClient {
            share: self.clone(),
            id,
        })
    }
}

struct MemoryClient {
    share: MemoryShare,
    id: u64,
}

impl ShareClient for MemoryClient {
    fn connect<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<(), ShareError>> {
        Box::pin(async move {
            let mut state = self.share.lock();
            state.ops.push(Op::Connect);
            if address.is_empty() {
                return Err(ShareError::Transport("empty address".into()));
            }
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err(ShareError::Transport(format!(
                    "connection to {address} refused"
                )));
            }
            Ok(())
        })
    }

    fn login<'a>(
        &'a self,
        domain: &'a str,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<(), ShareError>> {
        Box::pin(async move {
            let mut state = self.share.lock();
            state.ops.push(Op::Login {
                domain: domain.to_string(),
                username: credentials.username().to_string(),
            });
            if state.login_failures > 0 {
                state.login_failures -= 1;
                return Err(Status::LogonFailure.into());
            }
            Ok(())
        })
    }

    fn tree_connect<'a>(
        &'a self,
        share: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn FileStore>, ShareError>> {
        Box::pin(async move {
            self.share.lock().ops.push(Op::TreeConnect {
                share: share.to_string(),
            });
            if share.is_empty() {
                return Err(ShareError::Status(Status::BadNetworkName));
            }
            let store: Box<dyn FileStore> = Box::new(MemoryStore {
                share: self.share.clone(),
                client: self.id,
            });
            Ok(store)
        })
    }

    fn limits(&self) -> NegotiatedLimits {
        self.share.lock().limits
    }

    fn logoff(&self) -> BoxFuture<'_, Result<(), ShareError>> {
        Box::pin(async move {
            self.share.lock().ops.push(Op::Logoff);
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.share.lock();
            state.ops.push(Op::Disconnect);
            let client = self.id;
            state.open.retain(|_, entry| entry.client != client);
        })
    }
}

struct MemoryStore {
    share: MemoryShare,
    client: u64,
}

impl FileStore for MemoryStore {
    fn create_file<'a>(
        &'a self,
        path: &'a str,
        _access: AccessIntent,
        policy: ExistsPolicy,
    ) -> BoxFuture<'a, Result<FileHandle, ShareError>> {
        Box::pin(async move {
            let path = share_path(path);
            let mut state = self.share.lock();
            state.ops.push(Op::CreateFile {
                path: path.clone(),
                policy,
            });
            if let Some(error) = state.open_faults.get_mut(&path).and_then(VecDeque::pop_front) {
                return Err(error);
            }
            if !state.parent_exists(&path) {
                return Err(Status::ObjectPathNotFound.into());
            }
            if state.dirs.contains(&path) {
                return Err(Status::ObjectNameCollision.into());
            }
            if state.files.contains_key(&path) && policy == ExistsPolicy::FailIfExists {
                return Err(Status::ObjectNameCollision.into());
            }
            // New files start empty and overwritten ones are truncated.
            state.files.insert(path.clone(), Vec::new());
            Ok(state.open_handle(&path, self.client))
        })
    }

    fn create_directory<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FileHandle, ShareError>> {
        Box::pin(async move {
            let path = share_path(path);
            let mut state = self.share.lock();
            state.ops.push(Op::CreateDirectory { path: path.clone() });
            if let Some(error) = state.directory_faults.get(&path) {
                return Err(error.clone());
            }
            if state.dirs.contains(&path) || state.files.contains_key(&path) {
                return Err(Status::ObjectNameCollision.into());
            }
            if !state.parent_exists(&path) {
                return Err(Status::ObjectPathNotFound.into());
            }
            state.dirs.insert(path.clone());
            Ok(state.open_handle(&path, self.client))
        })
    }

    fn write_at<'a>(
        &'a self,
        handle: &'a FileHandle,
        offset: u64,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<u32, ShareError>> {
        Box::pin(async move {
            let mut state = self.share.lock();
            let Some(path) = state.open.get(&handle.id()).map(|e| e.path.clone()) else {
                return Err(Status::FileClosed.into());
            };
            if let Some(Some(error)) = state.write_script.pop_front() {
                state.ops.push(Op::WriteRejected { path, offset });
                return Err(error);
            }
            let file = state.files.entry(path.clone()).or_default();
            let start = offset as usize;
            let end = start + data.len();
            if file.len() < end {
                file.resize(end, 0);
            }
            file[start..end].copy_from_slice(data);
            state.ops.push(Op::Write {
                path,
                offset,
                len: data.len(),
            });
            Ok(data.len() as u32)
        })
    }

    fn close(&self, handle: FileHandle) -> BoxFuture<'_, Result<(), ShareError>> {
        Box::pin(async move {
            let mut state = self.share.lock();
            let Some(entry) = state.open.remove(&handle.id()) else {
                return Err(Status::FileClosed.into());
            };
            state.ops.push(Op::Close { path: entry.path });
            if state.close_failures > 0 {
                state.close_failures -= 1;
                return Err(ShareError::Transport("close timed out".into()));
            }
            Ok(())
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<(), ShareError>> {
        Box::pin(async move {
            self.share.lock().ops.push(Op::TreeDisconnect);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn attach(share: &MemoryShare) -> (Box<dyn ShareClient>, Box<dyn FileStore>) {
        let client = share.client();
        client.connect("server").await.unwrap();
        client
            .login("WORKGROUP", &Credentials::default())
            .await
            .unwrap();
        let store = client.tree_connect("data").await.unwrap();
        (client, store)
    }

    #[tokio::test]
    async fn directory_creation_reports_collision() {
        let share = MemoryShare::new();
        let (_client, store) = attach(&share).await;

        let handle = store.create_directory("backup").await.unwrap();
        store.close(handle).await.unwrap();

        let err = store.create_directory("backup").await.unwrap_err();
        assert!(err.is_collision());
        assert!(share.has_directory("backup"));
    }

    #[tokio::test]
    async fn creation_requires_parent_directory() {
        let share = MemoryShare::new();
        let (_client, store) = attach(&share).await;

        let err = store.create_directory("a\\b").await.unwrap_err();
        assert_eq!(err.status(), Some(Status::ObjectPathNotFound));

        let err = store
            .create_file("a\\f.txt", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::ObjectPathNotFound));
    }

    #[tokio::test]
    async fn write_at_offsets_builds_file() {
        let share = MemoryShare::new();
        let (_client, store) = attach(&share).await;

        let handle = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap();
        store.write_at(&handle, 0, b"Hello").await.unwrap();
        store.write_at(&handle, 5, b" World").await.unwrap();
        store.close(handle).await.unwrap();

        assert_eq!(share.file("f.bin").unwrap(), b"Hello World");
        assert_eq!(share.open_handles(), 0);
    }

    #[tokio::test]
    async fn fail_if_exists_rejects_and_overwrite_truncates() {
        let share = MemoryShare::new();
        share.add_file("f.bin", b"old contents");
        let (_client, store) = attach(&share).await;

        let err = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::FailIfExists)
            .await
            .unwrap_err();
        assert!(err.is_collision());

        let handle = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap();
        store.close(handle).await.unwrap();
        assert_eq!(share.file("f.bin").unwrap(), b"");
    }

    #[tokio::test]
    async fn scripted_write_faults_apply_in_order() {
        let share = MemoryShare::new();
        share.script_writes([None, Some(ShareError::InsufficientCredits)]);
        let (_client, store) = attach(&share).await;

        let handle = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap();
        assert!(store.write_at(&handle, 0, b"ab").await.is_ok());
        assert_eq!(
            store.write_at(&handle, 2, b"cd").await.unwrap_err(),
            ShareError::InsufficientCredits
        );
        assert!(store.write_at(&handle, 2, b"cd").await.is_ok());
        store.close(handle).await.unwrap();

        assert_eq!(share.file("f.bin").unwrap(), b"abcd");
        assert!(share.ops().contains(&Op::WriteRejected {
            path: "f.bin".into(),
            offset: 2
        }));
    }

    #[tokio::test]
    async fn disconnect_invalidates_client_handles() {
        let share = MemoryShare::new();
        let (client, store) = attach(&share).await;

        let handle = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap();
        client.disconnect().await;

        let err = store.write_at(&handle, 0, b"x").await.unwrap_err();
        assert_eq!(err.status(), Some(Status::FileClosed));
        assert_eq!(share.open_handles(), 0);
    }

    #[tokio::test]
    async fn connect_failures_are_consumed() {
        let share = MemoryShare::new();
        share.fail_connects(1);

        assert!(share.client().connect("server").await.is_err());
        assert!(share.client().connect("server").await.is_ok());
        assert_eq!(share.connect_count(), 2);
    }

    #[tokio::test]
    async fn login_failures_are_consumed() {
        let share = MemoryShare::new();
        share.fail_logins(1);
        let client = share.client();
        client.connect("server").await.unwrap();

        let err = client
            .login("WORKGROUP", &Credentials::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::LogonFailure));
        assert!(client.login("WORKGROUP", &Credentials::default()).await.is_ok());
    }

    #[tokio::test]
    async fn open_faults_apply_once_per_open() {
        let share = MemoryShare::new();
        share.fail_opens("f.bin", [ShareError::InsufficientCredits]);
        let (_client, store) = attach(&share).await;

        let err = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap_err();
        assert!(err.is_resource_exhausted());
        assert!(share.file("f.bin").is_none());

        let handle = store
            .create_file("f.bin", AccessIntent::Write, ExistsPolicy::OverwriteIf)
            .await
            .unwrap();
        store.close(handle).await.unwrap();
    }

    #[test]
    fn paths_are_normalized_to_backslashes() {
        let share = MemoryShare::new();
        share.add_directory("/a/b/");
        assert!(share.has_directory("a\\b"));
    }
}

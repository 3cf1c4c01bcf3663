//! fsweave - asynchronous filesystem orchestration.
//!
//! [`FileService`] binds a [`Backend`], a [`TaskEngine`] and a
//! [`WatchRegistry`] behind one object. Long operations (listing, copy,
//! move, batch copy, batch delete) return immediately with a handle that
//! delivers progress and exactly one terminal result; short queries run on
//! the caller's thread.
//!
//! ```rust,no_run
//! use fsweave::{EngineConfig, FileService, OverwritePolicy};
//!
//! # async fn run() -> fsweave::FsResult<()> {
//! let service = FileService::local(EngineConfig::default())?;
//!
//! let transfer = service.copy("/tmp/a.bin", "/tmp/b.bin", OverwritePolicy::FailIfExists);
//! let outcome = transfer
//!     .wait_with(|tick| println!("{:.0}%", tick.percentage()))
//!     .await?;
//! println!("copied {} bytes", outcome.bytes_transferred);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

pub use fsweave_core::{
    AppDescriptor, Backend, CancelToken, ConfigError, EngineConfig, EngineConfigBuilder,
    ErrorKind, FileKind, FileRecord, FilesystemUsage, FsError, FsResult, Location, MountEntry,
    MountKind, OverwritePolicy, TransferMode, TransferOutcome, TransferProgress, TransferResult,
    WatchEvent, WatchEventKind,
};
pub use fsweave_local::LocalBackend;
pub use fsweave_ops::{
    BatchEvent, BatchHandle, BatchItem, BatchSummary, DeleteEvent, DeleteHandle, ListHandle,
    TaskEngine, TaskEvent, TaskHandle, TaskId, TransferHandle, WatchRegistry,
};
pub use fsweave_scan::{Enumerator, Listing};

/// A running copy or move together with its cancellation token.
#[derive(Debug)]
pub struct Transfer {
    token: CancelToken,
    handle: TransferHandle,
}

impl Transfer {
    /// The token guarding this transfer.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Request cancellation. Returns `false` if the transfer already
    /// finished or was already cancelled.
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    pub fn id(&self) -> TaskId {
        self.handle.id()
    }

    /// Split into the token and the raw task handle.
    pub fn into_parts(self) -> (CancelToken, TransferHandle) {
        (self.token, self.handle)
    }

    pub async fn wait(self) -> TransferResult {
        self.handle.wait().await
    }

    pub async fn wait_with(self, on_progress: impl FnMut(TransferProgress)) -> TransferResult {
        self.handle.wait_with(on_progress).await
    }
}

/// Filesystem operations over one backend.
pub struct FileService<B: Backend> {
    backend: Arc<B>,
    engine: TaskEngine,
    watches: WatchRegistry,
}

impl<B: Backend> std::fmt::Debug for FileService<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("engine", &self.engine)
            .field("watches", &self.watches)
            .finish()
    }
}

impl FileService<LocalBackend> {
    /// A service over the local disk on the current tokio runtime.
    pub fn local(config: EngineConfig) -> FsResult<Self> {
        let backend = LocalBackend::new(&config);
        Self::new(backend, config)
    }
}

impl<B: Backend> FileService<B> {
    /// Create a service on the current tokio runtime.
    ///
    /// Fails with `BackendUnavailable` when called outside a runtime.
    pub fn new(backend: B, config: EngineConfig) -> FsResult<Self> {
        Ok(Self::with_engine(
            Arc::new(backend),
            TaskEngine::current(config)?,
        ))
    }

    /// Create a service from an existing engine; clones of one engine share
    /// its concurrency limit.
    pub fn with_engine(backend: Arc<B>, engine: TaskEngine) -> Self {
        debug!(config = ?engine.config(), "file service created");
        Self {
            backend,
            engine,
            watches: WatchRegistry::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    fn follow_symlinks(&self) -> bool {
        self.config().follow_symlinks_in_listing
    }

    // Enumeration

    /// Lazily enumerate `path` on the caller's thread.
    pub fn enumerate(&self, path: &str) -> FsResult<Enumerator<'_>> {
        fsweave_scan::enumerate(self.backend.as_ref(), path, self.follow_symlinks())
    }

    /// Enumerate `path` in the background.
    pub fn list(&self, path: &str) -> ListHandle {
        fsweave_ops::start_list(
            &self.engine,
            Arc::clone(&self.backend),
            path,
            self.follow_symlinks(),
        )
    }

    pub fn count_children(&self, path: &str) -> FsResult<usize> {
        fsweave_ops::count_children(self.backend.as_ref(), path)
    }

    pub fn stat(&self, path: &str) -> FsResult<FileRecord> {
        fsweave_ops::stat(self.backend.as_ref(), path)
    }

    pub fn exists(&self, path: &str) -> FsResult<bool> {
        fsweave_ops::exists(self.backend.as_ref(), path)
    }

    pub fn is_dir(&self, path: &str) -> FsResult<bool> {
        fsweave_ops::is_dir(self.backend.as_ref(), path)
    }

    // Transfers

    /// Start copying `source` to `dest` under a fresh token.
    pub fn copy(&self, source: &str, dest: &str, policy: OverwritePolicy) -> Transfer {
        let token = CancelToken::new();
        let handle = fsweave_ops::start_copy(
            &self.engine,
            Arc::clone(&self.backend),
            source,
            dest,
            policy,
            token.clone(),
        );
        Transfer { token, handle }
    }

    /// Start moving `source` to `dest` under a fresh token.
    pub fn move_to(&self, source: &str, dest: &str) -> Transfer {
        let token = CancelToken::new();
        let handle = fsweave_ops::start_move(
            &self.engine,
            Arc::clone(&self.backend),
            source,
            dest,
            token.clone(),
        );
        Transfer { token, handle }
    }

    pub fn copy_batch(&self, items: Vec<BatchItem>, policy: OverwritePolicy) -> BatchHandle {
        fsweave_ops::start_copy_batch(&self.engine, Arc::clone(&self.backend), items, policy)
    }

    // Mutations

    pub fn make_directory(&self, path: &str) -> FsResult<()> {
        fsweave_ops::make_directory(self.backend.as_ref(), path)
    }

    pub fn delete(&self, path: &str, use_trash: bool) -> FsResult<()> {
        fsweave_ops::delete(self.backend.as_ref(), path, use_trash)
    }

    pub fn delete_batch(&self, paths: Vec<String>, use_trash: bool) -> DeleteHandle {
        fsweave_ops::start_delete_batch(&self.engine, Arc::clone(&self.backend), paths, use_trash)
    }

    pub fn set_executable(&self, path: &str, executable: bool) -> FsResult<()> {
        fsweave_ops::set_executable(self.backend.as_ref(), path, executable)
    }

    // Volumes and applications

    pub fn list_mounts(&self) -> FsResult<Vec<MountEntry>> {
        fsweave_ops::list_mounts(self.backend.as_ref())
    }

    pub fn disk_usage(&self, path: &str) -> FsResult<FilesystemUsage> {
        fsweave_ops::disk_usage(self.backend.as_ref(), path)
    }

    pub fn default_handler(&self, path: &str) -> FsResult<Option<AppDescriptor>> {
        fsweave_ops::default_handler(self.backend.as_ref(), path)
    }

    // Watches

    /// Watch `path`, replacing any watch already registered for it.
    pub fn watch<F>(&self, path: &str, handler: F) -> FsResult<()>
    where
        F: FnMut(WatchEvent) + Send + 'static,
    {
        self.watches.watch(self.backend.as_ref(), path, handler)
    }

    pub fn watch_channel(&self, path: &str) -> FsResult<mpsc::UnboundedReceiver<WatchEvent>> {
        self.watches.watch_channel(self.backend.as_ref(), path)
    }

    pub fn unwatch(&self, path: &str) -> FsResult<()> {
        self.watches.unwatch(path)
    }
}

//! Copy handles, routing policy and the per-adaptor copy table.
//!
//! The router only decides *which* adaptor owns a copy. The owning adaptor
//! keeps a [`CopyTable`] that runs transfers, bounds how many run at once,
//! and answers status and cancel requests without blocking on the transfer.

use async_trait::async_trait;
use dashmap::DashMap;
use fileway_props::{PropertyError, PropertySet};
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::LOCAL_ADAPTOR_NAME;
use crate::error::{FilesError, FilesResult};
use crate::ops::{InputStream, OutputStream};
use crate::path::Path;
use crate::types::{CopyMode, CopyOption};

/// Property suffix for the transfer chunk size (SIZE).
pub const COPY_BUFFER_PROPERTY: &str = "copy.buffer";
/// Property suffix for the number of concurrently running transfers (NATURAL).
pub const COPY_PARALLEL_PROPERTY: &str = "copy.parallel";

/// Finished copies kept for status queries before the oldest are evicted.
pub const FINISHED_COPY_RETENTION: usize = 1024;

pub const DEFAULT_COPY_BUFFER: &str = "64k";
pub const DEFAULT_COPY_PARALLEL: &str = "4";

// ============================================================================
// Handles and status
// ============================================================================

/// Identifier of one copy (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CopyId(uuid::Uuid);

impl CopyId {
    /// Create a new time-ordered id.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for display only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }
}

impl Default for CopyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CopyId({})", self.short())
    }
}

/// Opaque token for one copy, routed back to its owner.
#[derive(Debug, Clone)]
pub struct CopyHandle {
    id: CopyId,
    owner: String,
    source: Path,
    target: Path,
}

impl CopyHandle {
    pub(crate) fn new(owner: impl Into<String>, source: Path, target: Path) -> Self {
        Self {
            id: CopyId::new(),
            owner: owner.into(),
            source,
            target,
        }
    }

    pub fn id(&self) -> CopyId {
        self.id
    }

    /// Name of the adaptor running the copy.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl PartialEq for CopyHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CopyHandle {}

impl Hash for CopyHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for CopyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "copy {} ({} -> {})", self.id.short(), self.source, self.target)
    }
}

/// Lifecycle state of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CopyState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl CopyState {
    /// True for Completed, Failed and Cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Snapshot of a copy's progress.
///
/// Once [`CopyStatus::done`] is true the status never changes.
#[derive(Debug, Clone)]
pub struct CopyStatus {
    pub state: CopyState,
    pub bytes_copied: u64,
    /// Bytes this transfer will move, once known.
    pub bytes_to_copy: Option<u64>,
    /// Why the copy failed or was cancelled.
    pub error: Option<Arc<FilesError>>,
}

impl CopyStatus {
    fn pending() -> Self {
        Self {
            state: CopyState::Pending,
            bytes_copied: 0,
            bytes_to_copy: None,
            error: None,
        }
    }

    pub fn done(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.state == CopyState::Running
    }

    pub fn succeeded(&self) -> bool {
        self.state == CopyState::Completed
    }
}

// ============================================================================
// Routing policy
// ============================================================================

/// Pick the adaptor that owns a copy between two adaptors.
///
/// Same adaptor, then local source (target's adaptor), then local target
/// (source's adaptor). Anything else is a third-party copy.
pub fn route_copy<'a>(source_adaptor: &'a str, target_adaptor: &'a str) -> FilesResult<&'a str> {
    if source_adaptor == target_adaptor {
        Ok(source_adaptor)
    } else if source_adaptor == LOCAL_ADAPTOR_NAME {
        Ok(target_adaptor)
    } else if target_adaptor == LOCAL_ADAPTOR_NAME {
        Ok(source_adaptor)
    } else {
        Err(FilesError::ThirdPartyCopy {
            source_adaptor: source_adaptor.to_string(),
            target_adaptor: target_adaptor.to_string(),
        })
    }
}

/// Pick the adaptor that owns a move. Only same-adaptor moves are allowed.
pub fn route_move<'a>(source_adaptor: &'a str, target_adaptor: &'a str) -> FilesResult<&'a str> {
    if source_adaptor == target_adaptor {
        Ok(source_adaptor)
    } else {
        Err(FilesError::CrossAdaptorMove {
            source_adaptor: source_adaptor.to_string(),
            target_adaptor: target_adaptor.to_string(),
        })
    }
}

// ============================================================================
// Endpoints and transfer
// ============================================================================

/// Byte-level access to one side of a copy.
///
/// The owning adaptor supplies an endpoint for each side: its own storage,
/// or the local disk when the other side is local.
#[async_trait]
pub trait CopyEndpoint: Send + Sync {
    /// Size of the regular file at `path`, `None` if nothing exists there.
    ///
    /// Directories and other non-regular entries fail with `IsADirectory` or
    /// `InvalidPath`.
    async fn file_size(&self, path: &Path) -> FilesResult<Option<u64>>;

    /// Read `path` starting at `offset`.
    async fn open_read(&self, path: &Path, offset: u64) -> FilesResult<InputStream>;

    /// Write `path`, appending or creating/truncating.
    async fn open_write(&self, path: &Path, append: bool) -> FilesResult<OutputStream>;

    /// Key naming the storage `path` resolves to.
    ///
    /// Two paths with equal identities are the same file, whatever handles
    /// they were reached through.
    fn identity(&self, path: &Path) -> String;
}

/// One side of a transfer.
pub struct Endpoint<'a> {
    pub access: &'a dyn CopyEndpoint,
    pub path: &'a Path,
}

/// Shared, mutex-guarded status of one copy.
///
/// The first terminal state wins; later updates are ignored.
#[derive(Debug)]
pub struct CopyProgress {
    status: Mutex<CopyStatus>,
}

impl Default for CopyProgress {
    fn default() -> Self {
        Self {
            status: Mutex::new(CopyStatus::pending()),
        }
    }
}

impl CopyProgress {
    pub fn snapshot(&self) -> CopyStatus {
        self.status.lock().clone()
    }

    fn update(&self, f: impl FnOnce(&mut CopyStatus)) {
        let mut status = self.status.lock();
        if !status.done() {
            f(&mut status);
        }
    }

    fn start(&self, bytes_to_copy: u64) {
        self.update(|s| {
            s.state = CopyState::Running;
            s.bytes_to_copy = Some(bytes_to_copy);
        });
    }

    fn advance(&self, bytes: u64) {
        self.update(|s| s.bytes_copied += bytes);
    }

    fn complete(&self) {
        self.update(|s| s.state = CopyState::Completed);
    }

    fn fail(&self, error: FilesError) {
        self.update(|s| {
            s.state = CopyState::Failed;
            s.error = Some(Arc::new(error));
        });
    }

    fn cancel(&self, reason: impl Into<String>) {
        self.update(|s| {
            s.state = CopyState::Cancelled;
            s.error = Some(Arc::new(FilesError::Cancelled(reason.into())));
        });
    }
}

/// Move bytes from `source` to `target` according to `mode`.
///
/// Cancellation is checked before every chunk.
pub async fn transfer(
    source: Endpoint<'_>,
    target: Endpoint<'_>,
    mode: CopyMode,
    chunk_size: usize,
    progress: &CopyProgress,
    cancel: &CancellationToken,
) -> FilesResult<()> {
    let size = source
        .access
        .file_size(source.path)
        .await?
        .ok_or_else(|| FilesError::not_found(source.path))?;
    let existing = target.access.file_size(target.path).await?;

    let (offset, append) = match (mode, existing) {
        (CopyMode::Create, Some(_)) => return Err(FilesError::already_exists(target.path)),
        (CopyMode::Ignore, Some(_)) => {
            progress.start(0);
            return Ok(());
        }
        (CopyMode::Create | CopyMode::Ignore | CopyMode::Replace, _) => (0, false),
        (CopyMode::Append, Some(_)) => (0, true),
        (CopyMode::Append | CopyMode::Resume, None) => {
            return Err(FilesError::not_found(target.path));
        }
        (CopyMode::Resume, Some(partial)) if partial <= size => (partial, true),
        (CopyMode::Resume, Some(partial)) => {
            return Err(FilesError::invalid_options(format!(
                "cannot resume {}: target has {partial} bytes, source only {size}",
                target.path
            )));
        }
    };

    progress.start(size - offset);
    let mut reader = source.access.open_read(source.path, offset).await?;
    let mut writer = target.access.open_write(target.path, append).await?;
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        if cancel.is_cancelled() {
            return Err(FilesError::Cancelled(target.path.to_string()));
        }
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        progress.advance(n as u64);
    }
    writer.flush().await?;
    writer.shutdown().await?;
    Ok(())
}

// ============================================================================
// Copy table
// ============================================================================

struct CopyTask {
    handle: CopyHandle,
    progress: Arc<CopyProgress>,
    cancel: CancellationToken,
}

/// In-flight and finished copies of one adaptor.
///
/// Finished copies stay queryable until more than `retention` of them pile
/// up; the oldest are evicted first and then read as `UnknownCopy`.
pub struct CopyTable {
    owner: String,
    tasks: DashMap<CopyId, Arc<CopyTask>>,
    retention: usize,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl fmt::Debug for CopyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyTable")
            .field("owner", &self.owner)
            .field("tasks", &self.tasks.len())
            .field("retention", &self.retention)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl CopyTable {
    /// Create a table allowing `parallel` transfers at once.
    pub fn new(owner: impl Into<String>, parallel: usize) -> Self {
        Self {
            owner: owner.into(),
            tasks: DashMap::new(),
            retention: FINISHED_COPY_RETENTION,
            permits: Arc::new(Semaphore::new(parallel.max(1))),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a table sized by `<prefix>copy.parallel`.
    pub fn from_properties(
        owner: impl Into<String>,
        properties: &PropertySet,
        prefix: &str,
    ) -> FilesResult<Self> {
        let name = format!("{prefix}{COPY_PARALLEL_PROPERTY}");
        let parallel = properties.get_natural(&name)?;
        if parallel == 0 {
            return Err(PropertyError::invalid(name, "0", "must be at least 1").into());
        }
        let parallel = usize::try_from(parallel).unwrap_or(usize::MAX);
        Ok(Self::new(owner, parallel.min(Semaphore::MAX_PERMITS)))
    }

    /// Keep at most `retention` finished copies.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    /// Name of the adaptor stamped into every handle.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Register and run a copy.
    ///
    /// Option conflicts and self-copies fail here. Every other failure ends
    /// up in the copy's status. Without `Asynchronous` this returns once the
    /// copy is terminal.
    pub async fn start(
        &self,
        source: (&Path, Arc<dyn CopyEndpoint>),
        target: (&Path, Arc<dyn CopyEndpoint>),
        options: &[CopyOption],
        chunk_size: usize,
    ) -> FilesResult<CopyHandle> {
        let plan = CopyOption::resolve(options)?;
        let (source_path, source_access) = source;
        let (target_path, target_access) = target;
        if source_access.identity(source_path) == target_access.identity(target_path) {
            return Err(FilesError::invalid_options(format!(
                "cannot copy {source_path} onto itself"
            )));
        }

        self.evict_finished();
        let handle = CopyHandle::new(&self.owner, source_path.clone(), target_path.clone());
        let task = Arc::new(CopyTask {
            handle: handle.clone(),
            progress: Arc::new(CopyProgress::default()),
            cancel: self.shutdown.child_token(),
        });
        self.tasks.insert(handle.id(), Arc::clone(&task));
        debug!(
            copy = %handle.id().short(),
            owner = %self.owner,
            mode = %plan.mode,
            asynchronous = plan.asynchronous,
            "copy registered"
        );

        let permits = Arc::clone(&self.permits);
        let run = run_copy(
            task,
            source_access,
            target_access,
            plan.mode,
            chunk_size,
            permits,
        );
        if plan.asynchronous {
            tokio::spawn(run);
        } else {
            run.await;
        }
        Ok(handle)
    }

    /// Current status of `copy`.
    pub fn status(&self, copy: &CopyHandle) -> FilesResult<CopyStatus> {
        Ok(self.task(copy)?.progress.snapshot())
    }

    /// Cancel `copy` unless it already finished; return its terminal status.
    pub fn cancel(&self, copy: &CopyHandle) -> FilesResult<CopyStatus> {
        let task = self.task(copy)?;
        task.progress.cancel("cancelled by caller");
        task.cancel.cancel();
        Ok(task.progress.snapshot())
    }

    /// Cancel every unfinished copy.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        for task in self.tasks.iter() {
            task.progress.cancel("adaptor shut down");
        }
    }

    /// Drop the oldest finished copies beyond the retention limit.
    fn evict_finished(&self) {
        let mut finished: Vec<CopyId> = self
            .tasks
            .iter()
            .filter(|task| task.progress.snapshot().done())
            .map(|task| *task.key())
            .collect();
        if finished.len() <= self.retention {
            return;
        }
        // UUIDv7 ids sort by creation time.
        finished.sort_unstable();
        let excess = finished.len() - self.retention;
        for id in &finished[..excess] {
            self.tasks.remove(id);
        }
        debug!(owner = %self.owner, evicted = excess, "finished copies evicted");
    }

    fn task(&self, copy: &CopyHandle) -> FilesResult<Arc<CopyTask>> {
        self.tasks
            .get(&copy.id())
            .map(|task| Arc::clone(task.value()))
            .ok_or_else(|| FilesError::UnknownCopy(copy.id().to_string()))
    }
}

async fn run_copy(
    task: Arc<CopyTask>,
    source: Arc<dyn CopyEndpoint>,
    target: Arc<dyn CopyEndpoint>,
    mode: CopyMode,
    chunk_size: usize,
    permits: Arc<Semaphore>,
) {
    let _permit = tokio::select! {
        permit = permits.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                task.progress.fail(FilesError::internal("copy semaphore closed"));
                return;
            }
        },
        _ = task.cancel.cancelled() => {
            task.progress.cancel("cancelled before start");
            return;
        }
    };

    let handle = &task.handle;
    let result = transfer(
        Endpoint {
            access: source.as_ref(),
            path: handle.source(),
        },
        Endpoint {
            access: target.as_ref(),
            path: handle.target(),
        },
        mode,
        chunk_size,
        &task.progress,
        &task.cancel,
    )
    .await;

    match result {
        Ok(()) => {
            task.progress.complete();
            let status = task.progress.snapshot();
            debug!(copy = %handle.id().short(), bytes = status.bytes_copied, "copy finished");
        }
        Err(FilesError::Cancelled(_)) => task.progress.cancel("cancelled by caller"),
        Err(e) => {
            warn!(copy = %handle.id().short(), error = %e, "copy failed");
            task.progress.fail(e);
        }
    }
}

/// Read `<prefix>copy.buffer` as a chunk size.
pub fn chunk_size(properties: &PropertySet, prefix: &str) -> FilesResult<usize> {
    let name = format!("{prefix}{COPY_BUFFER_PROPERTY}");
    let size = properties.get_size(&name)?;
    if size == 0 {
        return Err(PropertyError::invalid(name, "0", "must be at least 1 byte").into());
    }
    Ok(usize::try_from(size).unwrap_or(usize::MAX))
}

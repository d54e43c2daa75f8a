//! In-process memory adaptor.
//!
//! A location names a store; every filesystem opened on the same location
//! shares its entries. Stores outlive `close` and are dropped by `end`.

use async_trait::async_trait;
use dashmap::DashMap;
use fileway_props::{PropertyDescription, PropertySet, PropertyType};
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::io::AsyncWrite;
use tracing::debug;

use super::LocalDisk;
use crate::adaptor::{Adaptor, AdaptorFactory};
use crate::copy::{self, CopyEndpoint, CopyHandle, CopyStatus, CopyTable};
use crate::credentials::{Credential, CredentialsAdaptor};
use crate::engine::{LOCAL_ADAPTOR_NAME, adaptor_prefix};
use crate::error::{FilesError, FilesResult};
use crate::filesystem::FileSystem;
use crate::ops::{DirectoryFilter, DirectoryStream, FilesAdaptor, InputStream, OutputStream};
use crate::path::{Path, RelativePath};
use crate::types::{
    CopyOption, FileAttributes, FileType, OpenMode, OpenOption, PathAttributesPair,
    PosixFilePermission,
};

pub const MEMORY_ADAPTOR_NAME: &str = "memory";

/// Schemes answered by the memory adaptor.
pub const MEMORY_SCHEMES: [&str; 1] = ["memory"];

/// Property suffix that makes new filesystems read-only (BOOLEAN).
const READ_ONLY_PROPERTY: &str = "read.only";

const DIRECTORY_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Factory for the memory adaptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAdaptor;

impl AdaptorFactory for MemoryAdaptor {
    fn name(&self) -> &str {
        MEMORY_ADAPTOR_NAME
    }

    fn supported_properties(&self) -> Vec<PropertyDescription> {
        let prefix = adaptor_prefix(MEMORY_ADAPTOR_NAME);
        let mut descriptors = super::copy_properties(&prefix);
        descriptors.push(PropertyDescription::new(
            format!("{prefix}{READ_ONLY_PROPERTY}"),
            PropertyType::Boolean,
            Some("false"),
            "Open filesystems without write access.",
        ));
        descriptors
    }

    fn create(&self, properties: PropertySet) -> FilesResult<Adaptor> {
        let files = MemoryFiles::new(&properties)?;
        Ok(Adaptor::new(
            MEMORY_ADAPTOR_NAME,
            "Named in-process stores",
            MEMORY_SCHEMES,
            properties,
        )
        .with_files(Arc::new(files))
        .with_credentials(Arc::new(MemoryCredentials)))
    }
}

/// Accepts the default credential and plain passwords.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCredentials;

impl CredentialsAdaptor for MemoryCredentials {
    fn adaptor_name(&self) -> &str {
        MEMORY_ADAPTOR_NAME
    }

    fn new_password_credential(
        &self,
        _scheme: &str,
        username: &str,
        password: &str,
    ) -> FilesResult<Credential> {
        if username.is_empty() {
            return Err(FilesError::InvalidCredential {
                adaptor: MEMORY_ADAPTOR_NAME.to_string(),
                reason: "username is empty".to_string(),
            });
        }
        Ok(Credential::Password {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, attr: FileAttributes },
    Directory { attr: FileAttributes },
}

impl Entry {
    fn directory() -> Self {
        Entry::Directory {
            attr: FileAttributes::new(FileType::Directory, 0, DIRECTORY_MODE),
        }
    }

    fn file() -> Self {
        Entry::File {
            data: Vec::new(),
            attr: FileAttributes::new(FileType::File, 0, FILE_MODE),
        }
    }

    fn attr(&self) -> &FileAttributes {
        match self {
            Entry::File { attr, .. } => attr,
            Entry::Directory { attr } => attr,
        }
    }

    fn attr_mut(&mut self) -> &mut FileAttributes {
        match self {
            Entry::File { attr, .. } => attr,
            Entry::Directory { attr } => attr,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }
}

/// Entries of one named store, keyed by absolute path. The root always
/// exists.
#[derive(Debug)]
struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<RelativePath, Entry>>,
}

impl MemoryStore {
    fn new(name: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(RelativePath::root(), Entry::directory());
        Self {
            name: name.to_string(),
            entries: RwLock::new(entries),
        }
    }

    /// Fail unless the parent of `key` is an existing directory.
    fn check_parent(
        entries: &HashMap<RelativePath, Entry>,
        key: &RelativePath,
        path: &Path,
    ) -> FilesResult<()> {
        let Some(parent) = key.parent() else {
            return Err(FilesError::already_exists(path));
        };
        match entries.get(&parent) {
            Some(entry) if entry.is_dir() => Ok(()),
            Some(_) => Err(FilesError::not_a_directory(path)),
            None => Err(FilesError::not_found(path)),
        }
    }

    fn insert_new(&self, path: &Path, entry: Entry) -> FilesResult<()> {
        let key = path.absolute();
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(FilesError::already_exists(path));
        }
        Self::check_parent(&entries, &key, path)?;
        entries.insert(key, entry);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.read().contains_key(&path.absolute())
    }

    fn attributes(&self, path: &Path) -> FilesResult<FileAttributes> {
        let key = path.absolute();
        let entries = self.entries.read();
        let mut attr = entries
            .get(&key)
            .map(|e| e.attr().clone())
            .ok_or_else(|| FilesError::not_found(path))?;
        attr.hidden = key.file_name().is_some_and(|n| n.starts_with('.'));
        Ok(attr)
    }

    fn delete(&self, path: &Path) -> FilesResult<()> {
        let key = path.absolute();
        if key.is_root() {
            return Err(FilesError::invalid_path(path));
        }
        let mut entries = self.entries.write();
        match entries.get(&key) {
            None => return Err(FilesError::not_found(path)),
            Some(entry) if entry.is_dir() => {
                if entries.keys().any(|k| k.parent().as_ref() == Some(&key)) {
                    return Err(FilesError::directory_not_empty(path));
                }
            }
            Some(_) => {}
        }
        entries.remove(&key);
        Ok(())
    }

    /// Rename `source` to `target`, carrying a directory's children along.
    fn rename(&self, source: &Path, target: &Path) -> FilesResult<()> {
        let from = source.absolute();
        let to = target.absolute();
        let mut entries = self.entries.write();
        if !entries.contains_key(&from) {
            return Err(FilesError::not_found(source));
        }
        if from == to {
            return Ok(());
        }
        if from.is_root() || to.starts_with(&from) {
            return Err(FilesError::invalid_path(target));
        }
        if entries.contains_key(&to) {
            return Err(FilesError::already_exists(target));
        }
        Self::check_parent(&entries, &to, target)?;

        let moved: Vec<RelativePath> = entries
            .keys()
            .filter(|k| k.starts_with(&from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(entry) = entries.remove(&key) {
                let rebased = key.elements()[from.elements().len()..]
                    .iter()
                    .fold(to.clone(), |acc, element| acc.join(element));
                entries.insert(rebased, entry);
            }
        }
        Ok(())
    }

    /// Child names of a directory, sorted.
    fn children(&self, dir: &Path) -> FilesResult<Vec<String>> {
        let key = dir.absolute();
        let entries = self.entries.read();
        match entries.get(&key) {
            Some(entry) if entry.is_dir() => {}
            Some(_) => return Err(FilesError::not_a_directory(dir)),
            None => return Err(FilesError::not_found(dir)),
        }
        let mut names: Vec<String> = entries
            .keys()
            .filter(|k| k.parent().as_ref() == Some(&key))
            .filter_map(|k| k.file_name().map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    fn file_size(&self, path: &Path) -> FilesResult<Option<u64>> {
        match self.entries.read().get(&path.absolute()) {
            Some(Entry::File { data, .. }) => Ok(Some(data.len() as u64)),
            Some(Entry::Directory { .. }) => Err(FilesError::is_a_directory(path)),
            None => Ok(None),
        }
    }

    fn read(&self, path: &Path, offset: u64) -> FilesResult<Vec<u8>> {
        let mut entries = self.entries.write();
        match entries.get_mut(&path.absolute()) {
            Some(Entry::File { data, attr }) => {
                attr.last_access_time = Some(SystemTime::now());
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
                Ok(data[start..].to_vec())
            }
            Some(Entry::Directory { .. }) => Err(FilesError::is_a_directory(path)),
            None => Err(FilesError::not_found(path)),
        }
    }

    /// Prepare `path` for writing: create it or check it exists, and
    /// truncate unless appending.
    fn open_write(&self, path: &Path, mode: OpenMode, append: bool) -> FilesResult<()> {
        let key = path.absolute();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(&key) {
            return match (entry, mode) {
                (Entry::Directory { .. }, _) => Err(FilesError::is_a_directory(path)),
                (Entry::File { .. }, OpenMode::Create) => Err(FilesError::already_exists(path)),
                (Entry::File { data, attr }, _) => {
                    if !append {
                        data.clear();
                        attr.size = 0;
                        attr.last_modified_time = SystemTime::now();
                    }
                    Ok(())
                }
            };
        }
        if mode == OpenMode::Open {
            return Err(FilesError::not_found(path));
        }
        Self::check_parent(&entries, &key, path)?;
        entries.insert(key, Entry::file());
        Ok(())
    }

    fn append(&self, key: &RelativePath, buf: &[u8]) -> FilesResult<()> {
        match self.entries.write().get_mut(key) {
            Some(Entry::File { data, attr }) => {
                data.extend_from_slice(buf);
                attr.size = data.len() as u64;
                attr.last_modified_time = SystemTime::now();
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(FilesError::is_a_directory(key)),
            None => Err(FilesError::not_found(key)),
        }
    }

    fn set_permissions(
        &self,
        path: &Path,
        permissions: &BTreeSet<PosixFilePermission>,
    ) -> FilesResult<()> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&path.absolute())
            .ok_or_else(|| FilesError::not_found(path))?;
        entry.attr_mut().set_permissions(permissions.clone());
        Ok(())
    }
}

/// Output stream appending to one store entry.
struct MemoryWriter {
    store: Arc<MemoryStore>,
    key: RelativePath,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let result = self
            .store
            .append(&self.key, buf)
            .map(|()| buf.len())
            .map_err(io::Error::from);
        Poll::Ready(result)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ============================================================================
// Connections
// ============================================================================

/// An open filesystem: its store and whether it may write.
#[derive(Debug, Clone)]
struct Connection {
    store: Arc<MemoryStore>,
    read_only: bool,
}

impl Connection {
    fn writable(&self, path: &Path) -> FilesResult<()> {
        if self.read_only {
            Err(FilesError::ReadOnly(path.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CopyEndpoint for Connection {
    async fn file_size(&self, path: &Path) -> FilesResult<Option<u64>> {
        self.store.file_size(path)
    }

    async fn open_read(&self, path: &Path, offset: u64) -> FilesResult<InputStream> {
        let data = self.store.read(path, offset)?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn open_write(&self, path: &Path, append: bool) -> FilesResult<OutputStream> {
        self.writable(path)?;
        self.store.open_write(path, OpenMode::OpenOrCreate, append)?;
        Ok(Box::new(MemoryWriter {
            store: Arc::clone(&self.store),
            key: path.absolute(),
        }))
    }

    fn identity(&self, path: &Path) -> String {
        format!("{MEMORY_ADAPTOR_NAME}:{}:{}", self.store.name, path.absolute())
    }
}

/// Files facet of the memory adaptor.
#[derive(Debug)]
pub struct MemoryFiles {
    prefix: String,
    stores: DashMap<String, Arc<MemoryStore>>,
    filesystems: DashMap<String, Connection>,
    next_id: AtomicU64,
    copies: CopyTable,
}

impl MemoryFiles {
    /// Create the facet from the adaptor's properties.
    pub fn new(properties: &PropertySet) -> FilesResult<Self> {
        let prefix = adaptor_prefix(MEMORY_ADAPTOR_NAME);
        let copies = CopyTable::from_properties(MEMORY_ADAPTOR_NAME, properties, &prefix)?;
        Ok(Self {
            prefix,
            stores: DashMap::new(),
            filesystems: DashMap::new(),
            next_id: AtomicU64::new(0),
            copies,
        })
    }

    fn connection(&self, filesystem: &FileSystem) -> FilesResult<Connection> {
        self.filesystems
            .get(filesystem.unique_id())
            .map(|c| c.value().clone())
            .ok_or_else(|| FilesError::not_connected(filesystem))
    }

    fn writable(&self, path: &Path) -> FilesResult<Arc<MemoryStore>> {
        let connection = self.connection(path.filesystem())?;
        connection.writable(path)?;
        Ok(connection.store)
    }

    /// Byte access for one side of a copy this adaptor owns.
    fn endpoint(&self, path: &Path) -> FilesResult<Arc<dyn CopyEndpoint>> {
        match path.adaptor_name() {
            MEMORY_ADAPTOR_NAME => Ok(Arc::new(self.connection(path.filesystem())?)),
            LOCAL_ADAPTOR_NAME => Ok(Arc::new(LocalDisk)),
            other => Err(FilesError::unsupported(
                MEMORY_ADAPTOR_NAME,
                format!("copies involving {other}"),
            )),
        }
    }
}

#[async_trait]
impl FilesAdaptor for MemoryFiles {
    fn adaptor_name(&self) -> &str {
        MEMORY_ADAPTOR_NAME
    }

    async fn new_file_system(
        &self,
        location: &str,
        credential: Credential,
        properties: PropertySet,
    ) -> FilesResult<FileSystem> {
        if location.is_empty() || location.contains('/') {
            return Err(FilesError::InvalidLocation {
                adaptor: MEMORY_ADAPTOR_NAME.to_string(),
                location: location.to_string(),
            });
        }
        if !matches!(credential, Credential::Default | Credential::Password { .. }) {
            return Err(FilesError::InvalidCredential {
                adaptor: MEMORY_ADAPTOR_NAME.to_string(),
                reason: format!("{} credentials are not supported", credential.kind()),
            });
        }
        let read_only = properties.get_boolean(&format!("{}{READ_ONLY_PROPERTY}", self.prefix))?;

        let store = Arc::clone(
            self.stores
                .entry(location.to_string())
                .or_insert_with(|| Arc::new(MemoryStore::new(location)))
                .value(),
        );
        let id = format!("memory-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(store = %store.name, id = %id, read_only, "memory filesystem");
        self.filesystems
            .insert(id.clone(), Connection { store, read_only });

        Ok(FileSystem::new(
            MEMORY_ADAPTOR_NAME,
            id,
            location,
            RelativePath::root(),
            credential,
            properties,
        ))
    }

    async fn close(&self, filesystem: &FileSystem) -> FilesResult<()> {
        self.filesystems
            .remove(filesystem.unique_id())
            .map(|_| ())
            .ok_or_else(|| FilesError::not_connected(filesystem))
    }

    async fn is_open(&self, filesystem: &FileSystem) -> FilesResult<bool> {
        Ok(self.filesystems.contains_key(filesystem.unique_id()))
    }

    async fn create_directory(&self, dir: &Path) -> FilesResult<()> {
        self.writable(dir)?.insert_new(dir, Entry::directory())
    }

    async fn create_file(&self, path: &Path) -> FilesResult<()> {
        self.writable(path)?.insert_new(path, Entry::file())
    }

    async fn delete(&self, path: &Path) -> FilesResult<()> {
        self.writable(path)?.delete(path)
    }

    async fn exists(&self, path: &Path) -> FilesResult<bool> {
        Ok(self.connection(path.filesystem())?.store.exists(path))
    }

    async fn move_path(&self, source: &Path, target: &Path) -> FilesResult<Path> {
        let from = self.writable(source)?;
        let to = self.writable(target)?;
        if !Arc::ptr_eq(&from, &to) {
            return Err(FilesError::unsupported(
                MEMORY_ADAPTOR_NAME,
                format!("moves between stores {} and {}", from.name, to.name),
            ));
        }
        from.rename(source, target)?;
        Ok(target.clone())
    }

    async fn new_directory_stream(
        &self,
        dir: &Path,
        filter: Arc<dyn DirectoryFilter>,
    ) -> FilesResult<DirectoryStream<Path>> {
        let store = self.connection(dir.filesystem())?.store;
        let entries: Vec<FilesResult<Path>> = store
            .children(dir)?
            .into_iter()
            .map(|name| dir.resolve(name.as_str()))
            .filter(|path| filter.accept(path))
            .map(Ok)
            .collect();
        Ok(futures::stream::iter(entries).boxed())
    }

    async fn new_attributes_directory_stream(
        &self,
        dir: &Path,
        filter: Arc<dyn DirectoryFilter>,
    ) -> FilesResult<DirectoryStream<PathAttributesPair>> {
        let store = self.connection(dir.filesystem())?.store;
        let paths = self.new_directory_stream(dir, filter).await?;
        let pairs = paths.map(move |entry| {
            let path = entry?;
            let attributes = store.attributes(&path)?;
            Ok::<_, FilesError>(PathAttributesPair { path, attributes })
        });
        Ok(pairs.boxed())
    }

    async fn new_input_stream(&self, path: &Path) -> FilesResult<InputStream> {
        self.connection(path.filesystem())?.open_read(path, 0).await
    }

    async fn new_output_stream(
        &self,
        path: &Path,
        options: &[OpenOption],
    ) -> FilesResult<OutputStream> {
        let plan = OpenOption::resolve(options)?;
        let store = self.writable(path)?;
        store.open_write(path, plan.mode, plan.append)?;
        Ok(Box::new(MemoryWriter {
            store,
            key: path.absolute(),
        }))
    }

    async fn get_attributes(&self, path: &Path) -> FilesResult<FileAttributes> {
        self.connection(path.filesystem())?.store.attributes(path)
    }

    async fn set_posix_file_permissions(
        &self,
        path: &Path,
        permissions: &BTreeSet<PosixFilePermission>,
    ) -> FilesResult<()> {
        self.writable(path)?.set_permissions(path, permissions)
    }

    async fn copy(
        &self,
        source: &Path,
        target: &Path,
        options: &[CopyOption],
    ) -> FilesResult<CopyHandle> {
        let own = if target.adaptor_name() == MEMORY_ADAPTOR_NAME {
            target
        } else {
            source
        };
        let chunk = copy::chunk_size(own.filesystem().properties(), &self.prefix)?;
        self.copies
            .start(
                (source, self.endpoint(source)?),
                (target, self.endpoint(target)?),
                options,
                chunk,
            )
            .await
    }

    async fn get_copy_status(&self, copy: &CopyHandle) -> FilesResult<CopyStatus> {
        self.copies.status(copy)
    }

    async fn cancel_copy(&self, copy: &CopyHandle) -> FilesResult<CopyStatus> {
        self.copies.cancel(copy)
    }

    async fn end(&self) {
        self.copies.shutdown();
        self.filesystems.clear();
        self.stores.clear();
    }
}

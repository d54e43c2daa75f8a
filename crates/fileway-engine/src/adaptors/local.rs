//! Local filesystem adaptor.
//!
//! Paths map one-to-one onto host paths: a filesystem is always opened at
//! `/` and a [`Path`] resolves to its absolute form on the host.

use async_trait::async_trait;
use dashmap::DashMap;
use fileway_props::{PropertyDescription, PropertySet};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::io::SeekFrom;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncSeekExt;
use tracing::debug;

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

/// Schemes answered by the local adaptor.
pub const LOCAL_SCHEMES: [&str; 3] = ["file", "local", ""];

/// Factory for the local adaptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdaptor;

impl AdaptorFactory for LocalAdaptor {
    fn name(&self) -> &str {
        LOCAL_ADAPTOR_NAME
    }

    fn supported_properties(&self) -> Vec<PropertyDescription> {
        super::copy_properties(&adaptor_prefix(LOCAL_ADAPTOR_NAME))
    }

    fn create(&self, properties: PropertySet) -> FilesResult<Adaptor> {
        let files = LocalFiles::new(&properties)?;
        Ok(Adaptor::new(
            LOCAL_ADAPTOR_NAME,
            "Files on the local host",
            LOCAL_SCHEMES,
            properties,
        )
        .with_files(Arc::new(files))
        .with_credentials(Arc::new(LocalCredentials)))
    }
}

/// The local adaptor only knows the ambient identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCredentials;

impl CredentialsAdaptor for LocalCredentials {
    fn adaptor_name(&self) -> &str {
        LOCAL_ADAPTOR_NAME
    }
}

/// Host path for a local [`Path`].
fn host_path(path: &Path) -> PathBuf {
    PathBuf::from(path.absolute().to_string())
}

/// Files facet of the local adaptor.
#[derive(Debug)]
pub struct LocalFiles {
    prefix: String,
    filesystems: DashMap<String, FileSystem>,
    next_id: AtomicU64,
    copies: CopyTable,
}

impl LocalFiles {
    /// Create the facet from the adaptor's properties.
    pub fn new(properties: &PropertySet) -> FilesResult<Self> {
        let prefix = adaptor_prefix(LOCAL_ADAPTOR_NAME);
        let copies = CopyTable::from_properties(LOCAL_ADAPTOR_NAME, properties, &prefix)?;
        Ok(Self {
            prefix,
            filesystems: DashMap::new(),
            next_id: AtomicU64::new(0),
            copies,
        })
    }

    fn check_open(&self, filesystem: &FileSystem) -> FilesResult<()> {
        if filesystem.adaptor_name() != LOCAL_ADAPTOR_NAME {
            return Err(FilesError::internal(format!(
                "local adaptor handed a {} filesystem",
                filesystem.adaptor_name()
            )));
        }
        if self.filesystems.contains_key(filesystem.unique_id()) {
            Ok(())
        } else {
            Err(FilesError::not_connected(filesystem))
        }
    }

    /// Open-check `path` and map it to the host.
    fn resolve(&self, path: &Path) -> FilesResult<PathBuf> {
        self.check_open(path.filesystem())?;
        Ok(host_path(path))
    }

    fn endpoint(&self, path: &Path) -> FilesResult<Arc<dyn CopyEndpoint>> {
        self.check_open(path.filesystem())?;
        Ok(Arc::new(LocalDisk))
    }
}

/// Attributes from host metadata (symlinks not followed).
fn metadata_to_attributes(meta: &std::fs::Metadata, name: Option<&str>) -> FileAttributes {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        FileType::Symlink
    } else if file_type.is_dir() {
        FileType::Directory
    } else if file_type.is_file() {
        FileType::File
    } else {
        FileType::Other
    };

    let permissions = PosixFilePermission::from_mode(meta.permissions().mode());
    FileAttributes {
        kind,
        size: meta.len(),
        creation_time: meta.created().ok(),
        last_access_time: meta.accessed().ok(),
        last_modified_time: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        owner: Some(meta.uid().to_string()),
        group: Some(meta.gid().to_string()),
        readable: permissions.contains(&PosixFilePermission::OwnerRead),
        writable: permissions.contains(&PosixFilePermission::OwnerWrite),
        executable: permissions.contains(&PosixFilePermission::OwnerExecute),
        permissions,
        hidden: name.is_some_and(|n| n.starts_with('.')),
    }
}

async fn read_attributes(path: &Path) -> FilesResult<FileAttributes> {
    let meta = fs::symlink_metadata(host_path(path))
        .await
        .map_err(|e| FilesError::from_io(e, path))?;
    Ok(metadata_to_attributes(&meta, path.file_name().as_deref()))
}

#[async_trait]
impl FilesAdaptor for LocalFiles {
    fn adaptor_name(&self) -> &str {
        LOCAL_ADAPTOR_NAME
    }

    async fn new_file_system(
        &self,
        location: &str,
        credential: Credential,
        properties: PropertySet,
    ) -> FilesResult<FileSystem> {
        if location != "/" {
            return Err(FilesError::InvalidLocation {
                adaptor: LOCAL_ADAPTOR_NAME.to_string(),
                location: location.to_string(),
            });
        }
        if credential != Credential::Default {
            return Err(FilesError::InvalidCredential {
                adaptor: LOCAL_ADAPTOR_NAME.to_string(),
                reason: format!("{} credentials are not supported", credential.kind()),
            });
        }

        let id = format!("local-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let filesystem = FileSystem::new(
            LOCAL_ADAPTOR_NAME,
            id.clone(),
            location,
            RelativePath::root(),
            credential,
            properties,
        );
        self.filesystems.insert(id, filesystem.clone());
        Ok(filesystem)
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
        let host = self.resolve(dir)?;
        fs::create_dir(&host)
            .await
            .map_err(|e| FilesError::from_io(e, dir))
    }

    async fn create_directories(&self, dir: &Path) -> FilesResult<()> {
        let host = self.resolve(dir)?;
        if fs::symlink_metadata(&host).await.is_ok() {
            return Err(FilesError::already_exists(dir));
        }
        fs::create_dir_all(&host)
            .await
            .map_err(|e| FilesError::from_io(e, dir))
    }

    async fn create_file(&self, path: &Path) -> FilesResult<()> {
        let host = self.resolve(path)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&host)
            .await
            .map(|_| ())
            .map_err(|e| FilesError::from_io(e, path))
    }

    async fn delete(&self, path: &Path) -> FilesResult<()> {
        let host = self.resolve(path)?;
        let meta = fs::symlink_metadata(&host)
            .await
            .map_err(|e| FilesError::from_io(e, path))?;
        let result = if meta.is_dir() {
            fs::remove_dir(&host).await
        } else {
            fs::remove_file(&host).await
        };
        result.map_err(|e| FilesError::from_io(e, path))
    }

    async fn exists(&self, path: &Path) -> FilesResult<bool> {
        let host = self.resolve(path)?;
        match fs::symlink_metadata(&host).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FilesError::from_io(e, path)),
        }
    }

    async fn move_path(&self, source: &Path, target: &Path) -> FilesResult<Path> {
        let from = self.resolve(source)?;
        let to = self.resolve(target)?;
        fs::symlink_metadata(&from)
            .await
            .map_err(|e| FilesError::from_io(e, source))?;
        if from == to {
            return Ok(target.clone());
        }
        if fs::symlink_metadata(&to).await.is_ok() {
            return Err(FilesError::already_exists(target));
        }
        fs::rename(&from, &to)
            .await
            .map_err(|e| FilesError::from_io(e, target))?;
        debug!(source = %source, target = %target, "moved");
        Ok(target.clone())
    }

    async fn new_directory_stream(
        &self,
        dir: &Path,
        filter: Arc<dyn DirectoryFilter>,
    ) -> FilesResult<DirectoryStream<Path>> {
        let host = self.resolve(dir)?;
        let read_dir = fs::read_dir(&host)
            .await
            .map_err(|e| FilesError::from_io(e, dir))?;
        let parent = dir.resolve(RelativePath::default());

        let stream = futures::stream::unfold(Some(read_dir), move |state| {
            let parent = parent.clone();
            let filter = Arc::clone(&filter);
            async move {
                let Some(mut read_dir) = state else {
                    return None;
                };
                loop {
                    match read_dir.next_entry().await {
                        Ok(Some(entry)) => {
                            let name = entry.file_name().to_string_lossy().into_owned();
                            let path = parent.resolve(name.as_str());
                            if filter.accept(&path) {
                                return Some((Ok(path), Some(read_dir)));
                            }
                        }
                        Ok(None) => return None,
                        Err(e) => return Some((Err(FilesError::Io(e)), None)),
                    }
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn new_attributes_directory_stream(
        &self,
        dir: &Path,
        filter: Arc<dyn DirectoryFilter>,
    ) -> FilesResult<DirectoryStream<PathAttributesPair>> {
        let paths = self.new_directory_stream(dir, filter).await?;
        let pairs = paths.then(|entry| async move {
            let path = entry?;
            let attributes = read_attributes(&path).await?;
            Ok::<_, FilesError>(PathAttributesPair { path, attributes })
        });
        Ok(pairs.boxed())
    }

    async fn new_input_stream(&self, path: &Path) -> FilesResult<InputStream> {
        self.check_open(path.filesystem())?;
        LocalDisk.open_read(path, 0).await
    }

    async fn new_output_stream(
        &self,
        path: &Path,
        options: &[OpenOption],
    ) -> FilesResult<OutputStream> {
        let plan = OpenOption::resolve(options)?;
        let host = self.resolve(path)?;
        if fs::metadata(&host).await.is_ok_and(|m| m.is_dir()) {
            return Err(FilesError::is_a_directory(path));
        }

        let mut open = fs::OpenOptions::new();
        open.write(true);
        match plan.mode {
            OpenMode::Create => {
                open.create_new(true);
            }
            OpenMode::OpenOrCreate => {
                open.create(true);
            }
            OpenMode::Open => {}
        }
        if plan.append {
            open.append(true);
        } else {
            open.truncate(true);
        }
        let file = open
            .open(&host)
            .await
            .map_err(|e| FilesError::from_io(e, path))?;
        Ok(Box::new(file))
    }

    async fn get_attributes(&self, path: &Path) -> FilesResult<FileAttributes> {
        self.check_open(path.filesystem())?;
        read_attributes(path).await
    }

    async fn read_symbolic_link(&self, link: &Path) -> FilesResult<Path> {
        let host = self.resolve(link)?;
        let meta = fs::symlink_metadata(&host)
            .await
            .map_err(|e| FilesError::from_io(e, link))?;
        if !meta.file_type().is_symlink() {
            return Err(FilesError::not_a_symlink(link));
        }
        let target = fs::read_link(&host)
            .await
            .map_err(|e| FilesError::from_io(e, link))?;
        let target = target.to_string_lossy();
        let base = link.parent().unwrap_or_else(|| link.clone());
        Ok(base.resolve(target.as_ref()))
    }

    async fn set_posix_file_permissions(
        &self,
        path: &Path,
        permissions: &BTreeSet<PosixFilePermission>,
    ) -> FilesResult<()> {
        let host = self.resolve(path)?;
        let mode = PosixFilePermission::to_mode(permissions);
        fs::set_permissions(&host, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| FilesError::from_io(e, path))
    }

    async fn copy(
        &self,
        source: &Path,
        target: &Path,
        options: &[CopyOption],
    ) -> FilesResult<CopyHandle> {
        let chunk = copy::chunk_size(source.filesystem().properties(), &self.prefix)?;
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
    }
}

// ============================================================================
// Copy endpoint
// ============================================================================

/// Raw host-disk access for copies.
///
/// Does no connection checks. The owning adaptor checks its own handles and
/// the router checks the local one.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LocalDisk;

#[async_trait]
impl CopyEndpoint for LocalDisk {
    async fn file_size(&self, path: &Path) -> FilesResult<Option<u64>> {
        match fs::metadata(host_path(path)).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(meta) if meta.is_dir() => Err(FilesError::is_a_directory(path)),
            Ok(_) => Err(FilesError::invalid_path(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilesError::from_io(e, path)),
        }
    }

    async fn open_read(&self, path: &Path, offset: u64) -> FilesResult<InputStream> {
        let host = host_path(path);
        if fs::metadata(&host).await.is_ok_and(|m| m.is_dir()) {
            return Err(FilesError::is_a_directory(path));
        }
        let mut file = fs::File::open(&host)
            .await
            .map_err(|e| FilesError::from_io(e, path))?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &Path, append: bool) -> FilesResult<OutputStream> {
        let mut open = fs::OpenOptions::new();
        open.write(true).create(true);
        if append {
            open.append(true);
        } else {
            open.truncate(true);
        }
        let file = open
            .open(host_path(path))
            .await
            .map_err(|e| FilesError::from_io(e, path))?;
        Ok(Box::new(file))
    }

    fn identity(&self, path: &Path) -> String {
        format!("{LOCAL_ADAPTOR_NAME}:{}", host_path(path).display())
    }
}

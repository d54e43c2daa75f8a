//! The files capability facet.
//!
//! Every operation the router dispatches lands on a [`FilesAdaptor`]. Paths
//! always carry their [`FileSystem`], so an adaptor can look up its own
//! connection state from the handle.

use async_trait::async_trait;
use fileway_props::PropertySet;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::copy::{CopyHandle, CopyStatus};
use crate::credentials::Credential;
use crate::error::{FilesError, FilesResult};
use crate::filesystem::FileSystem;
use crate::path::Path;
use crate::types::{CopyOption, FileAttributes, OpenOption, PathAttributesPair, PosixFilePermission};

/// One-shot, finite sequence of directory entries.
pub type DirectoryStream<T> = BoxStream<'static, FilesResult<T>>;

/// Byte source returned by `new_input_stream`.
pub type InputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Byte sink returned by `new_output_stream`.
pub type OutputStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Predicate deciding which directory entries a stream yields.
pub trait DirectoryFilter: Send + Sync {
    fn accept(&self, entry: &Path) -> bool;
}

impl<F> DirectoryFilter for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn accept(&self, entry: &Path) -> bool {
        self(entry)
    }
}

/// Filter that accepts every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl DirectoryFilter for AcceptAll {
    fn accept(&self, _entry: &Path) -> bool {
        true
    }
}

/// Files capability of an adaptor.
///
/// Implementations own their connection state and must be safe under
/// concurrent use; the router adds no locking.
#[async_trait]
pub trait FilesAdaptor: Send + Sync {
    /// Name of the adaptor offering this facet.
    fn adaptor_name(&self) -> &str;

    // ========================================================================
    // Connections
    // ========================================================================

    /// Open a connection to `location`.
    ///
    /// `properties` is the adaptor's property set already layered with the
    /// caller's values.
    async fn new_file_system(
        &self,
        location: &str,
        credential: Credential,
        properties: PropertySet,
    ) -> FilesResult<FileSystem>;

    /// Close a connection. Later use of the handle fails with `NotConnected`.
    async fn close(&self, filesystem: &FileSystem) -> FilesResult<()>;

    /// True while the connection is open.
    async fn is_open(&self, filesystem: &FileSystem) -> FilesResult<bool>;

    // ========================================================================
    // Namespace
    // ========================================================================

    /// Create one directory. The parent must exist.
    async fn create_directory(&self, dir: &Path) -> FilesResult<()>;

    /// Create a directory and any missing parents.
    ///
    /// Fails with `AlreadyExists` if `dir` itself exists.
    async fn create_directories(&self, dir: &Path) -> FilesResult<()> {
        if self.exists(dir).await? {
            return Err(FilesError::already_exists(dir));
        }
        let mut missing = vec![dir.clone()];
        let mut cursor = dir.parent();
        while let Some(parent) = cursor {
            if self.exists(&parent).await? {
                break;
            }
            cursor = parent.parent();
            missing.push(parent);
        }
        for path in missing.iter().rev() {
            self.create_directory(path).await?;
        }
        Ok(())
    }

    /// Create an empty file. Fails if it exists.
    async fn create_file(&self, path: &Path) -> FilesResult<()>;

    /// Delete a file, symlink or empty directory.
    async fn delete(&self, path: &Path) -> FilesResult<()>;

    /// True if something exists at `path`.
    async fn exists(&self, path: &Path) -> FilesResult<bool>;

    /// Rename within this adaptor.
    async fn move_path(&self, source: &Path, target: &Path) -> FilesResult<Path>;

    // ========================================================================
    // Listing
    // ========================================================================

    /// Entries of `dir` accepted by `filter`.
    ///
    /// A missing directory fails here, not on first poll.
    async fn new_directory_stream(
        &self,
        dir: &Path,
        filter: Arc<dyn DirectoryFilter>,
    ) -> FilesResult<DirectoryStream<Path>>;

    /// Entries of `dir` with their attributes.
    ///
    /// The default drains the directory stream up front and looks up
    /// attributes per entry; a failed lookup becomes that entry's item.
    /// Adaptors that can reach their storage from `'static` code should
    /// override this with a lazy stream.
    async fn new_attributes_directory_stream(
        &self,
        dir: &Path,
        filter: Arc<dyn DirectoryFilter>,
    ) -> FilesResult<DirectoryStream<PathAttributesPair>> {
        let mut entries = self.new_directory_stream(dir, filter).await?;
        let mut pairs = Vec::new();
        while let Some(entry) = entries.next().await {
            let pair = match entry {
                Ok(path) => self
                    .get_attributes(&path)
                    .await
                    .map(|attributes| PathAttributesPair { path, attributes }),
                Err(e) => Err(e),
            };
            pairs.push(pair);
        }
        Ok(futures::stream::iter(pairs).boxed())
    }

    // ========================================================================
    // Content and metadata
    // ========================================================================

    /// Read a regular file.
    async fn new_input_stream(&self, path: &Path) -> FilesResult<InputStream>;

    /// Write a regular file.
    async fn new_output_stream(
        &self,
        path: &Path,
        options: &[OpenOption],
    ) -> FilesResult<OutputStream>;

    /// Attributes of `path` (symlinks are not followed).
    async fn get_attributes(&self, path: &Path) -> FilesResult<FileAttributes>;

    /// Target of a symbolic link.
    async fn read_symbolic_link(&self, link: &Path) -> FilesResult<Path> {
        let _ = link;
        Err(FilesError::unsupported(self.adaptor_name(), "symbolic links"))
    }

    /// Replace the permission set of `path`.
    async fn set_posix_file_permissions(
        &self,
        path: &Path,
        permissions: &BTreeSet<PosixFilePermission>,
    ) -> FilesResult<()>;

    // ========================================================================
    // Copies
    // ========================================================================

    /// Start a copy this adaptor owns.
    async fn copy(
        &self,
        source: &Path,
        target: &Path,
        options: &[CopyOption],
    ) -> FilesResult<CopyHandle>;

    /// Current status of a copy. Never blocks on the transfer.
    async fn get_copy_status(&self, copy: &CopyHandle) -> FilesResult<CopyStatus>;

    /// Cancel a copy and return its terminal status.
    async fn cancel_copy(&self, copy: &CopyHandle) -> FilesResult<CopyStatus>;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release every connection and stop in-flight copies.
    async fn end(&self) {}
}

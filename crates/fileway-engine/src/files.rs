//! The files router.
//!
//! [`Files`] forwards every operation to the adaptor owning the handle. The
//! only policy it adds is for copies and moves that span two adaptors.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::copy::{CopyHandle, CopyStatus, route_copy, route_move};
use crate::credentials::Credential;
use crate::engine::Engine;
use crate::error::{FilesError, FilesResult};
use crate::filesystem::FileSystem;
use crate::ops::{
    AcceptAll, DirectoryFilter, DirectoryStream, FilesAdaptor, InputStream, OutputStream,
};
use crate::path::{Path, RelativePath};
use crate::types::{CopyOption, FileAttributes, OpenOption, PathAttributesPair, PosixFilePermission};

/// Router façade over the engine's adaptors.
#[derive(Clone)]
pub struct Files {
    engine: Arc<Engine>,
}

impl fmt::Debug for Files {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Files").field("engine", &self.engine).finish()
    }
}

impl Files {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Files facet of the adaptor called `name`.
    ///
    /// Handles only come from registered adaptors, so a miss is an internal
    /// error.
    fn adaptor_named(&self, name: &str) -> FilesResult<Arc<dyn FilesAdaptor>> {
        match self.engine.adaptor(name) {
            Some(adaptor) => adaptor.files(),
            None => {
                error!(adaptor = %name, "handle refers to an unregistered adaptor");
                Err(FilesError::internal(format!("no adaptor named {name}")))
            }
        }
    }

    fn adaptor_of(&self, filesystem: &FileSystem) -> FilesResult<Arc<dyn FilesAdaptor>> {
        self.adaptor_named(filesystem.adaptor_name())
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Open a filesystem on the adaptor answering to `scheme`.
    ///
    /// `properties` override the adaptor's engine-level properties.
    #[tracing::instrument(skip(self, credential, properties), fields(credential = credential.kind()))]
    pub async fn new_file_system<I, K, V>(
        &self,
        scheme: &str,
        location: &str,
        credential: Credential,
        properties: I,
    ) -> FilesResult<FileSystem>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let adaptor = self.engine.adaptor_for(scheme)?;
        let merged = adaptor.properties().with_overrides(properties)?;
        let filesystem = adaptor
            .files()?
            .new_file_system(location, credential, merged)
            .await?;
        info!(
            adaptor = %adaptor.name(),
            filesystem = %filesystem.unique_id(),
            "filesystem opened"
        );
        Ok(filesystem)
    }

    /// Local filesystem whose entry path is the current directory.
    pub async fn local_cwd_file_system(&self) -> FilesResult<FileSystem> {
        let cwd = std::env::current_dir()?;
        let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);
        self.local_file_system_at(&cwd.to_string_lossy()).await
    }

    /// Local filesystem whose entry path is the user's home directory.
    pub async fn local_home_file_system(&self) -> FilesResult<FileSystem> {
        let home = dirs::home_dir().ok_or_else(|| FilesError::not_found("home directory"))?;
        self.local_file_system_at(&home.to_string_lossy()).await
    }

    async fn local_file_system_at(&self, entry: &str) -> FilesResult<FileSystem> {
        let filesystem = self
            .new_file_system(
                "file",
                "/",
                Credential::Default,
                std::iter::empty::<(String, String)>(),
            )
            .await?;
        Ok(filesystem.with_entry_path(RelativePath::new(entry)))
    }

    pub async fn close(&self, filesystem: &FileSystem) -> FilesResult<()> {
        debug!(filesystem = %filesystem, "close");
        self.adaptor_of(filesystem)?.close(filesystem).await
    }

    pub async fn is_open(&self, filesystem: &FileSystem) -> FilesResult<bool> {
        self.adaptor_of(filesystem)?.is_open(filesystem).await
    }

    // ========================================================================
    // Namespace
    // ========================================================================

    pub async fn create_directory(&self, dir: &Path) -> FilesResult<()> {
        debug!(path = %dir, "create_directory");
        self.adaptor_of(dir.filesystem())?.create_directory(dir).await
    }

    pub async fn create_directories(&self, dir: &Path) -> FilesResult<()> {
        debug!(path = %dir, "create_directories");
        self.adaptor_of(dir.filesystem())?
            .create_directories(dir)
            .await
    }

    pub async fn create_file(&self, path: &Path) -> FilesResult<()> {
        debug!(path = %path, "create_file");
        self.adaptor_of(path.filesystem())?.create_file(path).await
    }

    pub async fn delete(&self, path: &Path) -> FilesResult<()> {
        debug!(path = %path, "delete");
        self.adaptor_of(path.filesystem())?.delete(path).await
    }

    pub async fn exists(&self, path: &Path) -> FilesResult<bool> {
        self.adaptor_of(path.filesystem())?.exists(path).await
    }

    // ========================================================================
    // Listing
    // ========================================================================

    pub async fn new_directory_stream(&self, dir: &Path) -> FilesResult<DirectoryStream<Path>> {
        self.new_directory_stream_filtered(dir, AcceptAll).await
    }

    pub async fn new_directory_stream_filtered(
        &self,
        dir: &Path,
        filter: impl DirectoryFilter + 'static,
    ) -> FilesResult<DirectoryStream<Path>> {
        self.adaptor_of(dir.filesystem())?
            .new_directory_stream(dir, Arc::new(filter))
            .await
    }

    pub async fn new_attributes_directory_stream(
        &self,
        dir: &Path,
    ) -> FilesResult<DirectoryStream<PathAttributesPair>> {
        self.new_attributes_directory_stream_filtered(dir, AcceptAll)
            .await
    }

    pub async fn new_attributes_directory_stream_filtered(
        &self,
        dir: &Path,
        filter: impl DirectoryFilter + 'static,
    ) -> FilesResult<DirectoryStream<PathAttributesPair>> {
        self.adaptor_of(dir.filesystem())?
            .new_attributes_directory_stream(dir, Arc::new(filter))
            .await
    }

    // ========================================================================
    // Content and metadata
    // ========================================================================

    pub async fn new_input_stream(&self, path: &Path) -> FilesResult<InputStream> {
        self.adaptor_of(path.filesystem())?
            .new_input_stream(path)
            .await
    }

    pub async fn new_output_stream(
        &self,
        path: &Path,
        options: &[OpenOption],
    ) -> FilesResult<OutputStream> {
        self.adaptor_of(path.filesystem())?
            .new_output_stream(path, options)
            .await
    }

    pub async fn get_attributes(&self, path: &Path) -> FilesResult<FileAttributes> {
        self.adaptor_of(path.filesystem())?
            .get_attributes(path)
            .await
    }

    pub async fn read_symbolic_link(&self, link: &Path) -> FilesResult<Path> {
        self.adaptor_of(link.filesystem())?
            .read_symbolic_link(link)
            .await
    }

    pub async fn set_posix_file_permissions(
        &self,
        path: &Path,
        permissions: &BTreeSet<PosixFilePermission>,
    ) -> FilesResult<()> {
        debug!(
            path = %path,
            mode = %format!("{:o}", PosixFilePermission::to_mode(permissions)),
            "set_posix_file_permissions"
        );
        self.adaptor_of(path.filesystem())?
            .set_posix_file_permissions(path, permissions)
            .await
    }

    // ========================================================================
    // Copy and move
    // ========================================================================

    /// Copy `source` to `target`.
    ///
    /// The copy runs on the adaptor chosen by [`route_copy`]. Transfer
    /// failures show up in the copy's status, not here.
    #[tracing::instrument(skip(self, source, target), fields(source = %source, target = %target))]
    pub async fn copy(
        &self,
        source: &Path,
        target: &Path,
        options: &[CopyOption],
    ) -> FilesResult<CopyHandle> {
        let owner = route_copy(source.adaptor_name(), target.adaptor_name()).inspect_err(|e| {
            warn!(error = %e, "copy refused");
        })?;
        debug!(owner = %owner, "copy routed");
        // The owner only vouches for its own handles.
        for side in [source, target] {
            let filesystem = side.filesystem();
            if filesystem.adaptor_name() != owner && !self.is_open(filesystem).await? {
                return Err(FilesError::not_connected(filesystem));
            }
        }
        self.adaptor_named(owner)?
            .copy(source, target, options)
            .await
    }

    /// Status of a copy, from the adaptor that owns it.
    pub async fn get_copy_status(&self, copy: &CopyHandle) -> FilesResult<CopyStatus> {
        self.adaptor_named(copy.owner())?
            .get_copy_status(copy)
            .await
    }

    /// Cancel a copy and return its terminal status.
    pub async fn cancel_copy(&self, copy: &CopyHandle) -> FilesResult<CopyStatus> {
        debug!(copy = %copy.id().short(), "cancel_copy");
        self.adaptor_named(copy.owner())?.cancel_copy(copy).await
    }

    /// Move `source` to `target` within one adaptor.
    #[tracing::instrument(skip(self, source, target), fields(source = %source, target = %target))]
    pub async fn move_path(&self, source: &Path, target: &Path) -> FilesResult<Path> {
        let owner = route_move(source.adaptor_name(), target.adaptor_name()).inspect_err(|e| {
            warn!(error = %e, "move refused");
        })?;
        self.adaptor_named(owner)?.move_path(source, target).await
    }
}

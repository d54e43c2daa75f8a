//! Engine error types.

use fileway_props::PropertyError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Errors raised by the engine, the router and the adaptors.
#[derive(Debug, Error)]
pub enum FilesError {
    /// Configuration property error.
    #[error(transparent)]
    Property(#[from] PropertyError),

    // ========================================================================
    // Routing policy
    // ========================================================================
    /// Neither side of a copy is local.
    #[error(
        "cannot copy from adaptor {source_adaptor} to adaptor {target_adaptor}: \
         third-party copy between two non-local adaptors is not supported"
    )]
    ThirdPartyCopy {
        source_adaptor: String,
        target_adaptor: String,
    },

    /// Move across two different adaptors.
    #[error(
        "cannot move from adaptor {source_adaptor} to adaptor {target_adaptor}: \
         move is only supported within a single adaptor"
    )]
    CrossAdaptorMove {
        source_adaptor: String,
        target_adaptor: String,
    },

    /// The adaptor does not offer this operation or capability.
    #[error("adaptor {adaptor} does not support {operation}")]
    Unsupported { adaptor: String, operation: String },

    // ========================================================================
    // Backend
    // ========================================================================
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Not a symbolic link.
    #[error("not a symbolic link: {0}")]
    NotASymlink(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Filesystem is read-only.
    #[error("filesystem is read-only: {0}")]
    ReadOnly(String),

    /// The filesystem handle was closed (or never opened by this adaptor).
    #[error("filesystem not connected: {0}")]
    NotConnected(String),

    /// The adaptor rejected the location passed to `new_file_system`.
    #[error("adaptor {adaptor} cannot open location {location:?}")]
    InvalidLocation { adaptor: String, location: String },

    /// The adaptor rejected the credential.
    #[error("adaptor {adaptor} rejected credential: {reason}")]
    InvalidCredential { adaptor: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ========================================================================
    // Copy lifecycle
    // ========================================================================
    /// No copy with this id is known to the owning adaptor.
    #[error("unknown copy: {0}")]
    UnknownCopy(String),

    /// The copy was cancelled before it finished.
    #[error("copy cancelled: {0}")]
    Cancelled(String),

    // ========================================================================
    // Engine
    // ========================================================================
    /// No adaptor registered for this scheme.
    #[error("no adaptor for scheme {0:?}")]
    UnknownScheme(String),

    /// Two adaptors share a name or scheme.
    #[error("duplicate adaptor registration: {0}")]
    DuplicateAdaptor(String),

    /// Conflicting or malformed open/copy options.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FilesError {
    /// Create a NotFound error.
    pub fn not_found(path: impl fmt::Display) -> Self {
        Self::NotFound(path.to_string())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl fmt::Display) -> Self {
        Self::AlreadyExists(path.to_string())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl fmt::Display) -> Self {
        Self::NotADirectory(path.to_string())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl fmt::Display) -> Self {
        Self::IsADirectory(path.to_string())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl fmt::Display) -> Self {
        Self::DirectoryNotEmpty(path.to_string())
    }

    /// Create a NotASymlink error.
    pub fn not_a_symlink(path: impl fmt::Display) -> Self {
        Self::NotASymlink(path.to_string())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl fmt::Display) -> Self {
        Self::InvalidPath(path.to_string())
    }

    /// Create a NotConnected error.
    pub fn not_connected(filesystem: impl fmt::Display) -> Self {
        Self::NotConnected(filesystem.to_string())
    }

    /// Create an Unsupported error.
    pub fn unsupported(adaptor: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            adaptor: adaptor.into(),
            operation: operation.into(),
        }
    }

    /// Create an InvalidOptions error.
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Create an Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Attach a path to a raw I/O error.
    ///
    /// Well-known kinds become the matching variant; everything else stays `Io`.
    pub fn from_io(err: io::Error, path: impl fmt::Display) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(path),
            io::ErrorKind::AlreadyExists => Self::already_exists(path),
            io::ErrorKind::NotADirectory => Self::not_a_directory(path),
            io::ErrorKind::IsADirectory => Self::is_a_directory(path),
            io::ErrorKind::DirectoryNotEmpty => Self::directory_not_empty(path),
            _ => Self::Io(err),
        }
    }

    /// True for routing-policy and capability refusals.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::ThirdPartyCopy { .. } | Self::CrossAdaptorMove { .. } | Self::Unsupported { .. }
        )
    }
}

/// Convert FilesError to std::io::Error for stream implementations.
impl From<FilesError> for io::Error {
    fn from(e: FilesError) -> Self {
        match e {
            FilesError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FilesError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FilesError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FilesError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FilesError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            FilesError::NotASymlink(msg) | FilesError::InvalidPath(msg) => {
                io::Error::new(io::ErrorKind::InvalidInput, msg)
            }
            FilesError::ReadOnly(msg) => io::Error::new(io::ErrorKind::ReadOnlyFilesystem, msg),
            FilesError::NotConnected(msg) => io::Error::new(io::ErrorKind::NotConnected, msg),
            FilesError::InvalidOptions(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            FilesError::Io(e) => e,
            e if e.is_unsupported() => io::Error::new(io::ErrorKind::Unsupported, e.to_string()),
            e => io::Error::other(e.to_string()),
        }
    }
}

/// Engine result type.
pub type FilesResult<T> = Result<T, FilesError>;

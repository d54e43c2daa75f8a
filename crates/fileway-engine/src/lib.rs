//! # fileway-engine
//!
//! One file-access API over many storage backends.
//!
//! Key components:
//!
//! - [`Engine`] - registers adaptors, validates properties, shuts down
//! - [`Files`] - router that forwards each operation to the adaptor owning
//!   the handle, and decides who runs cross-adaptor copies
//! - [`FilesAdaptor`] - the trait every backend implements
//! - [`CopyTable`] - per-adaptor copy bookkeeping with bounded parallelism
//! - [`LocalAdaptor`] and [`MemoryAdaptor`] - built-in backends
//!
//! ## Design Decisions
//!
//! - **Explicit registry**: adaptors are fixed at [`Engine::init`]; there is
//!   no global instance.
//! - **Handles carry their owner**: every [`Path`] names its [`FileSystem`]
//!   and every [`CopyHandle`] names the adaptor running it, so the router
//!   never keeps its own tables.
//! - **Copies report, never throw**: once a copy is accepted, transfer
//!   failures land in its [`CopyStatus`].
//!
//! ```no_run
//! use fileway_engine::{Credential, Engine, EngineConfig};
//!
//! # async fn demo() -> fileway_engine::FilesResult<()> {
//! let engine = Engine::init(EngineConfig::default())?;
//! let files = engine.files();
//! let scratch = files
//!     .new_file_system("memory", "scratch", Credential::Default, [("fileway.adaptors.memory.copy.buffer", "1m")])
//!     .await?;
//! files.create_directory(&scratch.entry().resolve("inbox")).await?;
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod adaptor;
pub mod adaptors;
pub mod copy;
pub mod credentials;
pub mod engine;
mod error;
mod files;
mod filesystem;
mod ops;
mod path;
mod types;

pub use adaptor::{Adaptor, AdaptorFactory, AdaptorRegistry};
pub use adaptors::{LocalAdaptor, MemoryAdaptor};
pub use copy::{
    CopyEndpoint, CopyHandle, CopyId, CopyState, CopyStatus, CopyTable, route_copy, route_move,
};
pub use credentials::{Credential, Credentials, CredentialsAdaptor};
pub use engine::{Engine, EngineConfig, LOCAL_ADAPTOR_NAME, adaptor_prefix};
pub use error::{FilesError, FilesResult};
pub use files::Files;
pub use filesystem::FileSystem;
pub use ops::{
    AcceptAll, DirectoryFilter, DirectoryStream, FilesAdaptor, InputStream, OutputStream,
};
pub use path::{Path, RelativePath};
pub use types::{
    CopyMode, CopyOption, CopyPlan, FileAttributes, FileType, OpenMode, OpenOption, OpenPlan,
    PathAttributesPair, PosixFilePermission,
};

pub use fileway_props::{PropertyDescription, PropertyError, PropertySet, PropertyType};

//! Cross-backend copies between the local disk and memory stores.
//!
//! Every copy touching a memory path is owned by the memory adaptor, so
//! these tests also cover how a non-local adaptor reaches the local disk.

use fileway_engine::{
    CopyOption, CopyState, CopyStatus, Credential, Engine, EngineConfig, FileSystem, Files,
    FilesError, Path, RelativePath,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

// ============================================================================
// Shared test setup
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    engine: Arc<Engine>,
    files: Files,
    disk: Path,
    memory: FileSystem,
    _tmp: TempDir,
}

async fn fixture(config: EngineConfig) -> Fixture {
    init_tracing();
    let engine = Engine::init(config).unwrap();
    let files = engine.files();

    let tmp = TempDir::new().unwrap();
    let root = dunce::canonicalize(tmp.path()).unwrap();
    let local = files
        .new_file_system("file", "/", Credential::Default, Vec::<(String, String)>::new())
        .await
        .unwrap();
    let disk = Path::new(&local, RelativePath::new(&root.to_string_lossy()));

    let memory = files
        .new_file_system("memory", "copies", Credential::Default, Vec::<(String, String)>::new())
        .await
        .unwrap();

    Fixture {
        engine,
        files,
        disk,
        memory,
        _tmp: tmp,
    }
}

async fn write(files: &Files, path: &Path, data: &[u8]) {
    let mut out = files.new_output_stream(path, &[]).await.unwrap();
    out.write_all(data).await.unwrap();
    out.shutdown().await.unwrap();
}

async fn read(files: &Files, path: &Path) -> Vec<u8> {
    let mut input = files.new_input_stream(path).await.unwrap();
    let mut data = Vec::new();
    input.read_to_end(&mut data).await.unwrap();
    data
}

async fn copy(f: &Fixture, source: &Path, target: &Path, options: &[CopyOption]) -> CopyStatus {
    let handle = f.files.copy(source, target, options).await.unwrap();
    assert_eq!(handle.owner(), "memory");
    f.files.get_copy_status(&handle).await.unwrap()
}

const PAYLOAD: &[u8] = b"the quick brown fox jumps over the lazy dog";

// ============================================================================
// Directions
// ============================================================================

#[tokio::test]
async fn test_upload_local_to_memory() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("fox.txt");
    let target = f.memory.entry().resolve("fox.txt");
    write(&f.files, &source, PAYLOAD).await;

    let status = copy(&f, &source, &target, &[]).await;
    assert_eq!(status.state, CopyState::Completed, "{status:?}");
    assert_eq!(status.bytes_copied, PAYLOAD.len() as u64);
    assert_eq!(status.bytes_to_copy, Some(PAYLOAD.len() as u64));
    assert_eq!(read(&f.files, &target).await, PAYLOAD);
}

#[tokio::test]
async fn test_download_memory_to_local() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.memory.entry().resolve("fox.txt");
    let target = f.disk.resolve("fox.txt");
    write(&f.files, &source, PAYLOAD).await;

    let status = copy(&f, &source, &target, &[]).await;
    assert!(status.succeeded(), "{status:?}");
    assert_eq!(read(&f.files, &target).await, PAYLOAD);
}

#[tokio::test]
async fn test_between_memory_stores() {
    let f = fixture(EngineConfig::default()).await;
    let other = f
        .files
        .new_file_system("memory", "elsewhere", Credential::Default, Vec::<(String, String)>::new())
        .await
        .unwrap();
    let source = f.memory.entry().resolve("a");
    let target = other.entry().resolve("b");
    write(&f.files, &source, PAYLOAD).await;

    assert!(copy(&f, &source, &target, &[]).await.succeeded());
    assert_eq!(read(&f.files, &target).await, PAYLOAD);
}

#[tokio::test]
async fn test_tiny_chunks() {
    let config = EngineConfig::default().with_property("fileway.adaptors.memory.copy.buffer", "1");
    let f = fixture(config).await;
    let source = f.disk.resolve("fox.txt");
    let target = f.memory.entry().resolve("fox.txt");
    write(&f.files, &source, PAYLOAD).await;

    let status = copy(&f, &source, &target, &[]).await;
    assert!(status.succeeded());
    assert_eq!(read(&f.files, &target).await, PAYLOAD);
}

// ============================================================================
// Modes
// ============================================================================

#[tokio::test]
async fn test_create_fails_on_existing_target() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, PAYLOAD).await;
    write(&f.files, &target, b"keep").await;

    let status = copy(&f, &source, &target, &[CopyOption::Create]).await;
    assert_eq!(status.state, CopyState::Failed);
    assert!(matches!(status.error.as_deref(), Some(FilesError::AlreadyExists(_))));
    assert_eq!(read(&f.files, &target).await, b"keep");
}

#[tokio::test]
async fn test_replace_and_ignore() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, PAYLOAD).await;
    write(&f.files, &target, b"a much longer previous content that must vanish entirely").await;

    let status = copy(&f, &source, &target, &[CopyOption::Ignore]).await;
    assert!(status.succeeded());
    assert_eq!(status.bytes_copied, 0);
    assert_ne!(read(&f.files, &target).await, PAYLOAD);

    let status = copy(&f, &source, &target, &[CopyOption::Replace]).await;
    assert!(status.succeeded());
    assert_eq!(read(&f.files, &target).await, PAYLOAD);
}

#[tokio::test]
async fn test_append() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.memory.entry().resolve("src");
    let target = f.disk.resolve("dst");
    write(&f.files, &source, b"world").await;

    let status = copy(&f, &source, &target, &[CopyOption::Append]).await;
    assert!(matches!(status.error.as_deref(), Some(FilesError::NotFound(_))));

    write(&f.files, &target, b"hello ").await;
    let status = copy(&f, &source, &target, &[CopyOption::Append]).await;
    assert!(status.succeeded());
    assert_eq!(read(&f.files, &target).await, b"hello world");
}

#[tokio::test]
async fn test_resume() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, PAYLOAD).await;

    let status = copy(&f, &source, &target, &[CopyOption::Resume]).await;
    assert!(matches!(status.error.as_deref(), Some(FilesError::NotFound(_))));

    write(&f.files, &target, &PAYLOAD[..10]).await;
    let status = copy(&f, &source, &target, &[CopyOption::Resume]).await;
    assert!(status.succeeded(), "{status:?}");
    assert_eq!(status.bytes_copied, (PAYLOAD.len() - 10) as u64);
    assert_eq!(read(&f.files, &target).await, PAYLOAD);

    write(&f.files, &target, b"this target is definitely longer than the fox sentence").await;
    let status = copy(&f, &source, &target, &[CopyOption::Resume]).await;
    assert_eq!(status.state, CopyState::Failed);
    assert!(matches!(status.error.as_deref(), Some(FilesError::InvalidOptions(_))));
}

#[tokio::test]
async fn test_rejected_before_start() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");

    let err = f
        .files
        .copy(&source, &target, &[CopyOption::Replace, CopyOption::Ignore])
        .await
        .unwrap_err();
    assert!(matches!(err, FilesError::InvalidOptions(_)));

    let err = f.files.copy(&target, &target, &[]).await.unwrap_err();
    assert!(matches!(err, FilesError::InvalidOptions(_)));

    // A second handle on the same store reaches the same entry.
    let again = f
        .files
        .new_file_system("memory", "copies", Credential::Default, Vec::<(String, String)>::new())
        .await
        .unwrap();
    let alias = Path::new(&again, target.absolute());
    let err = f
        .files
        .copy(&target, &alias, &[CopyOption::Replace])
        .await
        .unwrap_err();
    assert!(matches!(err, FilesError::InvalidOptions(_)));
}

#[tokio::test]
async fn test_closed_local_handle_is_not_connected() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, PAYLOAD).await;
    write(&f.files, &target, b"untouched").await;

    f.files.close(source.filesystem()).await.unwrap();
    for (from, to) in [(&source, &target), (&target, &source)] {
        let err = f
            .files
            .copy(from, to, &[CopyOption::Replace])
            .await
            .unwrap_err();
        assert!(matches!(err, FilesError::NotConnected(_)), "{err:?}");
    }
    assert_eq!(read(&f.files, &target).await, b"untouched");
}

#[tokio::test]
async fn test_missing_source_and_directory_source() {
    let f = fixture(EngineConfig::default()).await;
    let target = f.memory.entry().resolve("dst");

    let status = copy(&f, &f.disk.resolve("absent"), &target, &[]).await;
    assert!(matches!(status.error.as_deref(), Some(FilesError::NotFound(_))));

    let status = copy(&f, &f.disk, &target, &[]).await;
    assert!(matches!(status.error.as_deref(), Some(FilesError::IsADirectory(_))));
}

// ============================================================================
// Asynchronous copies
// ============================================================================

#[tokio::test]
async fn test_asynchronous_copy_completes() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, PAYLOAD).await;

    let handle = f
        .files
        .copy(&source, &target, &[CopyOption::Asynchronous])
        .await
        .unwrap();
    let mut status = f.files.get_copy_status(&handle).await.unwrap();
    for _ in 0..200 {
        if status.done() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        status = f.files.get_copy_status(&handle).await.unwrap();
    }
    assert!(status.succeeded(), "{status:?}");
    assert_eq!(read(&f.files, &target).await, PAYLOAD);
}

#[tokio::test]
async fn test_cancel_asynchronous_copy() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, &vec![7u8; 1 << 20]).await;

    // The test runtime is single threaded: the spawned transfer cannot run
    // before the cancel below.
    let handle = f
        .files
        .copy(&source, &target, &[CopyOption::Asynchronous, CopyOption::Replace])
        .await
        .unwrap();
    let first = f.files.cancel_copy(&handle).await.unwrap();
    assert_eq!(first.state, CopyState::Cancelled);
    assert!(matches!(first.error.as_deref(), Some(FilesError::Cancelled(_))));

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let second = f.files.cancel_copy(&handle).await.unwrap();
    assert_eq!(second.state, CopyState::Cancelled);
    assert_eq!(second.bytes_copied, first.bytes_copied);
    assert_eq!(
        f.files.get_copy_status(&handle).await.unwrap().state,
        CopyState::Cancelled
    );
}

#[tokio::test]
async fn test_shutdown_cancels_and_ends() {
    let f = fixture(EngineConfig::default()).await;
    let source = f.disk.resolve("src");
    let target = f.memory.entry().resolve("dst");
    write(&f.files, &source, PAYLOAD).await;

    let handle = f
        .files
        .copy(&source, &target, &[CopyOption::Asynchronous])
        .await
        .unwrap();
    f.engine.shutdown().await;

    assert!(!f.files.is_open(&f.memory).await.unwrap());
    assert!(matches!(
        f.files.exists(&target).await,
        Err(FilesError::NotConnected(_))
    ));
    // Copy state survives shutdown.
    let status = f.files.get_copy_status(&handle).await.unwrap();
    assert_eq!(status.state, CopyState::Cancelled);
}

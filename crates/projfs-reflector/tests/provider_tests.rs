//! End-to-end tests of the reflector provider against a recording engine.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use uuid::Uuid;

use projfs_reflector::notification::EventSignaller;
use projfs_reflector::{
    DirEntrySink, EngineTransport, FileRecord, FsLayer, LayerFile, LayerStore, NotificationEvent,
    NotificationKind, NotificationType, PlaceholderDescriptor, ProcessInfo, ProjectionCallbacks,
    ProviderError, ProviderOptions, ReflectorProvider, RequestInfo, SinkOutcome, Status,
    VirtualizationInstance, WriteBuffer,
};
use projfs_reflector::{FileDataRequest, FilterCapture};

// ============================================================================
// Test doubles
// ============================================================================

struct VecBuffer(Vec<u8>);

impl WriteBuffer for VecBuffer {
    fn as_slice(&self) -> &[u8] {
        &self.0
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DataWrite {
    stream: Uuid,
    offset: u64,
    bytes: Vec<u8>,
}

/// Engine that records every write.
#[derive(Default)]
struct MockEngine {
    alignment: u32,
    writes: Mutex<Vec<DataWrite>>,
    placeholders: Mutex<Vec<(String, PlaceholderDescriptor)>>,
    on_write: Option<Box<dyn Fn() + Send + Sync>>,
}

impl MockEngine {
    fn with_alignment(alignment: u32) -> Self {
        Self {
            alignment,
            ..Default::default()
        }
    }

    fn writes(&self) -> Vec<DataWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Reassemble the bytes written, checking writes are contiguous.
    fn written_bytes(&self) -> (u64, Vec<u8>) {
        let writes = self.writes();
        let start: u64 = writes.first().map(|w| w.offset).unwrap_or(0);
        let mut bytes: Vec<u8> = Vec::new();
        for write in &writes {
            assert_eq!(write.offset, start + bytes.len() as u64, "gap between writes");
            bytes.extend_from_slice(&write.bytes);
        }
        (start, bytes)
    }
}

impl EngineTransport for MockEngine {
    fn write_alignment(&self) -> projfs_reflector::Result<u32> {
        Ok(self.alignment)
    }

    fn create_write_buffer(&self, size: usize) -> projfs_reflector::Result<Box<dyn WriteBuffer>> {
        Ok(Box::new(VecBuffer(vec![0; size])))
    }

    fn write_file_data(
        &self,
        data_stream_id: Uuid,
        buffer: &dyn WriteBuffer,
        offset: u64,
        length: u32,
    ) -> projfs_reflector::Result<()> {
        self.writes.lock().unwrap().push(DataWrite {
            stream: data_stream_id,
            offset,
            bytes: buffer.as_slice()[..length as usize].to_vec(),
        });
        if let Some(hook) = &self.on_write {
            hook();
        }
        Ok(())
    }

    fn write_placeholder_info(
        &self,
        relative_path: &str,
        descriptor: &PlaceholderDescriptor,
    ) -> projfs_reflector::Result<()> {
        self.placeholders
            .lock()
            .unwrap()
            .push((relative_path.to_string(), descriptor.clone()));
        Ok(())
    }
}

/// Sink that accepts a fixed number of entries per round.
struct VecSink {
    capacity: usize,
    names: Vec<String>,
    targets: Vec<Option<String>>,
}

impl VecSink {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            names: Vec::new(),
            targets: Vec::new(),
        }
    }
}

impl DirEntrySink for VecSink {
    fn add(
        &mut self,
        record: &FileRecord,
        symlink_target: Option<&str>,
    ) -> projfs_reflector::Result<SinkOutcome> {
        if self.names.len() >= self.capacity {
            return Ok(SinkOutcome::Full);
        }
        self.names.push(record.name.to_string());
        self.targets.push(symlink_target.map(str::to_string));
        Ok(SinkOutcome::Accepted)
    }
}

/// Layer whose single file claims more bytes than it can deliver.
struct TruncatedLayer {
    root: PathBuf,
}

impl LayerStore for TruncatedLayer {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_directory(&self, _relative_path: &str) -> projfs_reflector::Result<Vec<FileRecord>> {
        Ok(vec![FileRecord::file("short.bin", 100)])
    }

    fn open_file(&self, _relative_path: &str) -> projfs_reflector::Result<LayerFile> {
        Ok(LayerFile {
            reader: Box::new(Cursor::new(vec![7u8; 40])),
            len: 100,
        })
    }

    fn resolve_symlink_target(&self, relative_path: &str) -> projfs_reflector::Result<String> {
        Err(ProviderError::not_found(relative_path))
    }
}

#[derive(Default)]
struct RecordingSignaller {
    names: Arc<Mutex<Vec<String>>>,
}

impl EventSignaller for RecordingSignaller {
    fn signal(&self, name: &str) -> projfs_reflector::Result<()> {
        self.names.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn request(command_id: i32) -> RequestInfo<'static> {
    RequestInfo {
        command_id,
        process: ProcessInfo {
            id: 4242,
            image: "C:\\Windows\\explorer.exe",
        },
    }
}

fn file_request(path: &str, offset: u64, length: u32) -> FileDataRequest<'_> {
    FileDataRequest {
        relative_path: path,
        byte_offset: offset,
        length,
        data_stream_id: Uuid::from_u128(0xfeed),
        content_id: &[0],
        provider_id: &[1],
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

struct Fixture {
    _dir: TempDir,
    layer: Arc<FsLayer>,
    provider: ReflectorProvider,
}

fn fixture(options: impl FnOnce(ProviderOptions) -> ProviderOptions) -> Fixture {
    let dir: TempDir = TempDir::new().unwrap();
    let root: &Path = dir.path();
    std::fs::write(root.join("a.txt"), b"alpha").unwrap();
    std::fs::write(root.join("B.txt"), b"bravo").unwrap();
    std::fs::create_dir(root.join("C")).unwrap();
    std::fs::write(root.join("C").join("inner.dat"), pattern(300)).unwrap();
    std::fs::write(root.join("Readme.TXT"), b"read me").unwrap();

    let layer = Arc::new(FsLayer::new(root).unwrap());
    let opts = options(ProviderOptions::new(root, root.join("virt")));
    let provider = ReflectorProvider::new(layer.clone(), &opts);
    Fixture {
        _dir: dir,
        layer,
        provider,
    }
}

fn enumerate_all(provider: &ReflectorProvider, path: &str, filter: Option<&str>) -> Vec<String> {
    let session: Uuid = Uuid::new_v4();
    let info = request(1);
    assert_eq!(
        provider.start_directory_enumeration(&info, session, path),
        Status::Ok
    );
    let mut sink = VecSink::new(usize::MAX);
    assert_eq!(
        provider.get_directory_enumeration(&info, session, filter, false, &mut sink),
        Status::Ok
    );
    assert_eq!(provider.end_directory_enumeration(session), Status::Ok);
    sink.names
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn test_enumeration_uses_collation_order() {
    let fx = fixture(|o| o);
    let names = enumerate_all(&fx.provider, "", None);
    assert_eq!(names, vec!["a.txt", "B.txt", "C", "Readme.TXT"]);
}

#[test]
fn test_enumeration_filter_and_restart() {
    let fx = fixture(|o| o);
    let session: Uuid = Uuid::new_v4();
    let info = request(2);
    fx.provider.start_directory_enumeration(&info, session, "");

    let mut first = VecSink::new(usize::MAX);
    let status = fx
        .provider
        .get_directory_enumeration(&info, session, Some("*.txt"), false, &mut first);
    assert_eq!(status, Status::Ok);
    assert_eq!(first.names, vec!["a.txt", "B.txt", "Readme.TXT"]);

    // Restart with a new filter replays from the first entry.
    let mut second = VecSink::new(usize::MAX);
    let status = fx
        .provider
        .get_directory_enumeration(&info, session, Some("C"), true, &mut second);
    assert_eq!(status, Status::Ok);
    assert_eq!(second.names, vec!["C"]);

    fx.provider.end_directory_enumeration(session);
}

#[test]
fn test_enumeration_restart_after_partial_round() {
    let fx = fixture(|o| o);
    let session: Uuid = Uuid::new_v4();
    let info = request(2);
    fx.provider.start_directory_enumeration(&info, session, "");

    let mut first = VecSink::new(1);
    let status = fx
        .provider
        .get_directory_enumeration(&info, session, Some("*.txt"), false, &mut first);
    assert_eq!(status, Status::Ok);
    assert_eq!(first.names, vec!["a.txt"]);

    let mut restarted = VecSink::new(1);
    let status = fx
        .provider
        .get_directory_enumeration(&info, session, Some("*"), true, &mut restarted);
    assert_eq!(status, Status::Ok);
    assert_eq!(restarted.names, vec!["a.txt"]);

    // The earlier "*.txt" is not re-applied; "C" is still listed.
    let mut rest = VecSink::new(usize::MAX);
    let status = fx
        .provider
        .get_directory_enumeration(&info, session, Some("*.txt"), false, &mut rest);
    assert_eq!(status, Status::Ok);
    assert_eq!(rest.names, vec!["B.txt", "C", "Readme.TXT"]);

    fx.provider.end_directory_enumeration(session);
}

/// Log sink shared with a scoped subscriber.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_enumeration_entry_log_names_process() {
    let fx = fixture(|o| o);
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        enumerate_all(&fx.provider, "", None);
    });

    let text: String = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
    let entry: &str = text
        .lines()
        .find(|line| line.contains("----> GetDirectoryEnumeration"))
        .unwrap();
    assert!(entry.contains("explorer.exe"), "{entry}");
    assert!(entry.contains("pid=4242"), "{entry}");
}

#[test]
fn test_enumeration_resumes_after_full_sink() {
    let fx = fixture(|o| o);
    let session: Uuid = Uuid::new_v4();
    let info = request(3);
    fx.provider.start_directory_enumeration(&info, session, "");

    let mut collected: Vec<String> = Vec::new();
    loop {
        let mut sink = VecSink::new(1);
        let status = fx
            .provider
            .get_directory_enumeration(&info, session, None, false, &mut sink);
        assert_eq!(status, Status::Ok);
        if sink.names.is_empty() {
            break;
        }
        collected.extend(sink.names);
    }
    assert_eq!(collected, vec!["a.txt", "B.txt", "C", "Readme.TXT"]);
}

#[test]
fn test_enumeration_insufficient_buffer_keeps_position() {
    let fx = fixture(|o| o);
    let session: Uuid = Uuid::new_v4();
    let info = request(4);
    fx.provider.start_directory_enumeration(&info, session, "");

    let mut none = VecSink::new(0);
    assert_eq!(
        fx.provider
            .get_directory_enumeration(&info, session, None, false, &mut none),
        Status::InsufficientBuffer
    );

    let mut one = VecSink::new(1);
    fx.provider
        .get_directory_enumeration(&info, session, None, false, &mut one);
    assert_eq!(one.names, vec!["a.txt"]);
}

#[test]
fn test_enumeration_filter_fixed_on_first_call() {
    let fx = fixture(|o| o.with_filter_capture(FilterCapture::FirstCall));
    let session: Uuid = Uuid::new_v4();
    let info = request(5);
    fx.provider.start_directory_enumeration(&info, session, "");

    let mut first = VecSink::new(1);
    fx.provider
        .get_directory_enumeration(&info, session, Some("*.txt"), false, &mut first);
    assert_eq!(first.names, vec!["a.txt"]);

    // A different filter without restart is ignored.
    let mut rest = VecSink::new(usize::MAX);
    fx.provider
        .get_directory_enumeration(&info, session, Some("C"), false, &mut rest);
    assert_eq!(rest.names, vec!["B.txt", "Readme.TXT"]);
}

#[test]
fn test_enumeration_session_lifecycle() {
    let fx = fixture(|o| o);
    let session: Uuid = Uuid::new_v4();
    let info = request(6);

    assert_eq!(
        fx.provider.start_directory_enumeration(&info, session, "missing"),
        Status::NotFound
    );
    assert_eq!(
        fx.provider.start_directory_enumeration(&info, session, "C"),
        Status::Ok
    );
    assert_eq!(
        fx.provider.start_directory_enumeration(&info, session, "C"),
        Status::InternalError
    );
    assert_eq!(fx.provider.end_directory_enumeration(session), Status::Ok);
    assert_eq!(
        fx.provider.end_directory_enumeration(session),
        Status::InternalError
    );

    let mut sink = VecSink::new(usize::MAX);
    assert_eq!(
        fx.provider
            .get_directory_enumeration(&info, session, None, false, &mut sink),
        Status::InternalError
    );
    assert!(fx.provider.enumerations().is_empty());
}

#[test]
fn test_concurrent_sessions_are_independent() {
    let fx = fixture(|o| o);
    let provider: &ReflectorProvider = &fx.provider;

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(move || {
                let names = enumerate_all(provider, "", None);
                assert_eq!(names, vec!["a.txt", "B.txt", "C", "Readme.TXT"]);
            });
        }
    });
    assert!(provider.enumerations().is_empty());
}

// ============================================================================
// Placeholders and lookup
// ============================================================================

#[test]
fn test_placeholder_uses_layer_casing() {
    let fx = fixture(|o| o);
    let engine = MockEngine::with_alignment(1);

    let status = fx
        .provider
        .get_placeholder_info(&engine, &request(10), "readme.txt");
    assert_eq!(status, Status::Ok);

    let placeholders = engine.placeholders.lock().unwrap();
    assert_eq!(placeholders.len(), 1);
    let (path, descriptor) = &placeholders[0];
    assert_eq!(path, "Readme.TXT");
    assert_eq!(descriptor.record.size, 7);
    assert!(!descriptor.record.is_directory);
    assert_eq!(&*descriptor.content_id, &[0]);
    assert_eq!(&*descriptor.provider_id, &[1]);
}

#[test]
fn test_placeholder_for_directory_and_missing_path() {
    let fx = fixture(|o| o);
    let engine = MockEngine::with_alignment(1);

    assert_eq!(
        fx.provider.get_placeholder_info(&engine, &request(11), "c"),
        Status::Ok
    );
    assert_eq!(
        fx.provider
            .get_placeholder_info(&engine, &request(12), "nope.txt"),
        Status::NotFound
    );

    let placeholders = engine.placeholders.lock().unwrap();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].0, "C");
    assert!(placeholders[0].1.record.is_directory);
    assert_eq!(placeholders[0].1.record.size, 0);
}

#[test]
fn test_query_file_name() {
    let fx = fixture(|o| o);
    assert_eq!(fx.provider.query_file_name("A.TXT"), Status::Ok);
    assert_eq!(fx.provider.query_file_name("C\\inner.dat"), Status::Ok);
    assert_eq!(fx.provider.query_file_name("C\\absent"), Status::NotFound);
    assert_eq!(fx.provider.query_file_name("missing\\x"), Status::NotFound);
}

#[cfg(unix)]
#[test]
fn test_symlink_targets() {
    let fx = fixture(|o| o);
    let root: &Path = fx.layer.root();
    std::fs::create_dir(root.join("sub")).unwrap();
    std::fs::write(root.join("sub").join("target.txt"), b"t").unwrap();
    std::os::unix::fs::symlink(root.join("sub").join("target.txt"), root.join("abs_link")).unwrap();
    std::os::unix::fs::symlink("sub/target.txt", root.join("rel_link")).unwrap();

    let engine = MockEngine::with_alignment(1);
    assert_eq!(
        fx.provider.get_placeholder_info(&engine, &request(13), "abs_link"),
        Status::Ok
    );
    assert_eq!(
        fx.provider.get_placeholder_info(&engine, &request(14), "rel_link"),
        Status::Ok
    );

    let placeholders = engine.placeholders.lock().unwrap();
    assert_eq!(placeholders[0].1.symlink_target.as_deref(), Some("sub/target.txt"));
    assert_eq!(placeholders[1].1.symlink_target.as_deref(), Some("sub/target.txt"));

    // Enumeration reports the same rewritten target.
    let session: Uuid = Uuid::new_v4();
    let info = request(15);
    fx.provider.start_directory_enumeration(&info, session, "");
    let mut sink = VecSink::new(usize::MAX);
    fx.provider
        .get_directory_enumeration(&info, session, Some("abs_link"), false, &mut sink);
    assert_eq!(sink.names, vec!["abs_link"]);
    assert_eq!(sink.targets, vec![Some("sub/target.txt".to_string())]);
}

#[cfg(unix)]
#[test]
fn test_symlink_targets_through_aliased_root() {
    let dir: TempDir = TempDir::new().unwrap();
    let real: PathBuf = dir.path().join("real_layer");
    let alias: PathBuf = dir.path().join("layer");
    std::fs::create_dir_all(real.join("sub")).unwrap();
    std::fs::write(real.join("sub").join("target.txt"), b"t").unwrap();
    std::os::unix::fs::symlink(&real, &alias).unwrap();

    // One link spells the root as given, the other through its real path.
    std::os::unix::fs::symlink(alias.join("sub").join("target.txt"), real.join("alias_link")).unwrap();
    let canonical: PathBuf = std::fs::canonicalize(&real).unwrap();
    std::os::unix::fs::symlink(canonical.join("sub").join("target.txt"), real.join("real_link")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("outside.txt"), real.join("out_link")).unwrap();

    let layer = Arc::new(FsLayer::new(&alias).unwrap());
    assert_eq!(layer.root(), alias.as_path());

    let opts = ProviderOptions::new(&alias, dir.path().join("virt"));
    let provider = ReflectorProvider::new(layer, &opts);
    let hydration = provider.hydration();
    assert_eq!(hydration.resolve_symlink_target("alias_link").unwrap(), "sub/target.txt");
    assert_eq!(hydration.resolve_symlink_target("real_link").unwrap(), "sub/target.txt");
    assert_eq!(hydration.resolve_symlink_target("out_link").unwrap(), "../outside.txt");
}

// ============================================================================
// Hydration
// ============================================================================

fn hydrate(len: usize, chunk: usize, offset: u64, length: u32, alignment: u32) -> (Vec<u8>, MockEngine) {
    let dir: TempDir = TempDir::new().unwrap();
    let data: Vec<u8> = pattern(len);
    std::fs::write(dir.path().join("blob.bin"), &data).unwrap();

    let layer = Arc::new(FsLayer::new(dir.path()).unwrap());
    let options = ProviderOptions::new(dir.path(), dir.path().join("virt")).with_chunk_size(chunk);
    let provider = ReflectorProvider::new(layer, &options);

    let engine = MockEngine::with_alignment(alignment);
    let status = provider.get_file_data(&engine, &request(20), &file_request("blob.bin", offset, length));
    assert_eq!(status, Status::Ok);
    (data, engine)
}

#[test]
fn test_hydration_byte_exact_sizes() {
    let chunk: usize = 16;
    for len in [0usize, 1, chunk, chunk + 1, 5 * chunk + 3] {
        let (data, engine) = hydrate(len, chunk, 0, len as u32, 1);
        let (start, bytes) = engine.written_bytes();
        assert_eq!(start, 0);
        assert_eq!(bytes, data, "file of {len} bytes");
        assert!(engine.writes().iter().all(|w| w.bytes.len() <= chunk));
        assert!(engine.writes().iter().all(|w| w.stream == Uuid::from_u128(0xfeed)));
    }
}

#[test]
fn test_hydration_aligns_request() {
    let (data, engine) = hydrate(10_000, 64 * 1024, 100, 50, 4096);
    let (start, bytes) = engine.written_bytes();
    assert_eq!(start, 0);
    assert_eq!(bytes, data[..4096]);
}

#[test]
fn test_hydration_final_write_ends_at_eof() {
    let (data, engine) = hydrate(5000, 64 * 1024, 4096, 4096, 4096);
    let (start, bytes) = engine.written_bytes();
    assert_eq!(start, 4096);
    assert_eq!(bytes, data[4096..]);
    for write in engine.writes() {
        assert_eq!(write.offset % 4096, 0);
    }
}

#[test]
fn test_hydration_past_eof_writes_nothing() {
    let (_, engine) = hydrate(100, 64 * 1024, 8192, 4096, 4096);
    assert!(engine.writes().is_empty());
}

#[test]
fn test_hydration_missing_file() {
    let fx = fixture(|o| o);
    let engine = MockEngine::with_alignment(1);
    assert_eq!(
        fx.provider
            .get_file_data(&engine, &request(21), &file_request("absent.bin", 0, 10)),
        Status::NotFound
    );
}

#[test]
fn test_hydration_short_read_is_internal_error() {
    let layer = Arc::new(TruncatedLayer {
        root: PathBuf::from("layer"),
    });
    let provider = ReflectorProvider::new(layer, &ProviderOptions::new("layer", "virt"));
    let engine = MockEngine::with_alignment(1);

    let status = provider.get_file_data(&engine, &request(22), &file_request("short.bin", 0, 100));
    assert_eq!(status, Status::InternalError);
    assert!(engine.writes().is_empty());
}

#[test]
fn test_hydration_stops_when_cancelled() {
    let dir: TempDir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("big.bin"), pattern(64)).unwrap();
    let layer = Arc::new(FsLayer::new(dir.path()).unwrap());
    let options = ProviderOptions::new(dir.path(), dir.path().join("virt")).with_chunk_size(8);
    let provider = Arc::new(ReflectorProvider::new(layer, &options));

    let cancels = Arc::new(AtomicUsize::new(0));
    let hook_provider = Arc::clone(&provider);
    let hook_cancels = Arc::clone(&cancels);
    let engine = MockEngine {
        alignment: 1,
        on_write: Some(Box::new(move || {
            hook_cancels.fetch_add(1, Ordering::SeqCst);
            hook_provider.cancel_command(23);
        })),
        ..Default::default()
    };

    let status = provider.get_file_data(&engine, &request(23), &file_request("big.bin", 0, 64));
    assert_eq!(status, Status::InternalError);
    assert_eq!(engine.writes().len(), 1);
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert_eq!(provider.commands().in_flight(), 0);
}

// ============================================================================
// Notifications
// ============================================================================

fn event(kind: NotificationKind, path: &str) -> NotificationEvent<'_> {
    NotificationEvent {
        kind,
        relative_path: path,
        destination_path: None,
        is_directory: false,
        process: ProcessInfo {
            id: 1,
            image: "cmd.exe",
        },
        is_file_modified: false,
    }
}

#[test]
fn test_deny_deletes_vetoes_only_deletes() {
    let fx = fixture(|o| o.with_notifications(true).with_deny_deletes(true));

    assert_eq!(
        fx.provider.notify(&event(NotificationKind::PreDelete, "a.txt")).status,
        Status::AccessDenied
    );
    for kind in NotificationKind::ALL {
        if kind != NotificationKind::PreDelete {
            assert!(fx.provider.notify(&event(kind, "a.txt")).is_allowed(), "{kind}");
        }
    }
}

#[test]
fn test_deletes_allowed_without_policy() {
    let fx = fixture(|o| o.with_notifications(true));
    assert!(fx
        .provider
        .notify(&event(NotificationKind::PreDelete, "a.txt"))
        .is_allowed());
}

#[test]
fn test_notification_mask_registration() {
    let quiet = fixture(|o| o);
    assert!(quiet.provider.notification_mask().is_empty());

    let loud = fixture(|o| o.with_notifications(true));
    assert_eq!(loud.provider.notification_mask(), NotificationType::full_set());

    let created = loud
        .provider
        .notify(&event(NotificationKind::NewFileCreated, "new.txt"));
    assert_eq!(created.new_mask, Some(NotificationType::USE_EXISTING_MASK));
}

#[test]
fn test_test_mode_signals_events() {
    let dir: TempDir = TempDir::new().unwrap();
    let layer = Arc::new(FsLayer::new(dir.path()).unwrap());
    let options = ProviderOptions::new(dir.path(), dir.path().join("virt")).with_test_mode(true);
    let signaller = RecordingSignaller::default();
    let names = Arc::clone(&signaller.names);
    let provider = ReflectorProvider::with_signaller(layer, &options, Box::new(signaller));

    assert!(provider.is_test_mode());
    provider.virtualization_started().unwrap();
    provider.notify(&event(NotificationKind::FileHandleClosedFileDeleted, "x"));
    provider.notify(&event(NotificationKind::PreRename, "x"));

    assert_eq!(
        *names.lock().unwrap(),
        vec![
            "ProviderTestProceed",
            "FileHandleClosedFileModifiedOrDeleted",
            "PreRename"
        ]
    );
}

// ============================================================================
// Lifecycle
// ============================================================================

#[cfg(not(target_os = "windows"))]
#[test]
fn test_instance_cannot_start_without_projfs() {
    let fx = fixture(|o| o);
    let options = ProviderOptions::new(fx.layer.root(), fx.layer.root().join("virt"));
    let provider: Arc<dyn ProjectionCallbacks> =
        Arc::new(ReflectorProvider::new(fx.layer.clone(), &options));

    let instance = VirtualizationInstance::new(options, provider).unwrap();
    assert!(matches!(instance.start(), Err(ProviderError::NotSupported(_))));
    assert!(!instance.is_started());
    assert!(matches!(instance.stop(), Err(ProviderError::NotStarted)));
}

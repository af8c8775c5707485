mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use appstax_cli::error::{ApiError, DeployError};
use appstax_cli::hosting::{
    upload_archive, CancelToken, DeployTarget, Deployer, NoProgress, Packager, ProgressSink,
};
use common::{entries_of, write_file, FakeTransport, Reply};
use tempfile::TempDir;

/// Sink logging `("start", total)` and `("sent", n)` in call order, and
/// cancelling `cancel` once everything announced has been sent.
struct FinishLine {
    events: Mutex<Vec<(&'static str, u64)>>,
    total: AtomicU64,
    cancel: CancelToken,
}

impl FinishLine {
    fn new(cancel: CancelToken) -> Self {
        FinishLine {
            events: Mutex::new(Vec::new()),
            total: AtomicU64::new(u64::MAX),
            cancel,
        }
    }
}

impl ProgressSink for FinishLine {
    fn on_start(&self, total_bytes: u64) {
        self.total.store(total_bytes, Ordering::SeqCst);
        self.events.lock().unwrap().push(("start", total_bytes));
    }

    fn on_progress(&self, bytes_sent: u64) {
        self.events.lock().unwrap().push(("sent", bytes_sent));
        if bytes_sent == self.total.load(Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }
}

/// Progress sink remembering every value it was given.
fn recorder() -> (Arc<dyn ProgressSink>, Arc<Mutex<Vec<u64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let sink: Arc<dyn ProgressSink> = Arc::new(move |n: u64| seen_clone.lock().unwrap().push(n));
    (sink, seen)
}

fn site() -> TempDir {
    let src = TempDir::new().unwrap();
    write_file(src.path(), "index.html", b"<h1>Hi</h1>\n");
    write_file(src.path(), "css/style.css", b"body { margin: 0; padding: 10px; }");
    write_file(src.path(), ".DS_Store", b"junk");
    src
}

#[test]
fn test_upload_progress_is_monotonic_and_ends_at_size() {
    let src = TempDir::new().unwrap();
    let noise: Vec<u8> = (0..50_000u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
    write_file(src.path(), "blob.bin", &noise);
    let out = TempDir::new().unwrap();
    let archive = Packager::new().with_temp_dir(out.path()).package(src.path()).unwrap();

    let mut api = FakeTransport::new();
    api.chunk_size = 1000;
    api.reply("POST", "/upload", Reply::json("{}"));
    let (sink, seen) = recorder();

    let sent = upload_archive(&api, "/upload", archive.path(), sink, &CancelToken::new()).unwrap();
    assert_eq!(sent, archive.size);

    let seen = seen.lock().unwrap();
    assert!(seen.len() > 1);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), archive.size);

    let uploads = api.uploads.borrow();
    assert_eq!(uploads[0].2, std::fs::read(archive.path()).unwrap());
    assert!(uploads[0].1.ends_with(".tar.gz"));
}

#[test]
fn test_upload_rejection_is_a_network_error() {
    let src = site();
    let out = TempDir::new().unwrap();
    let archive = Packager::new().with_temp_dir(out.path()).package(src.path()).unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/upload", Reply::status(500, "boom"));

    let err = upload_archive(
        &api,
        "/upload",
        archive.path(),
        Arc::new(NoProgress),
        &CancelToken::new(),
    )
    .unwrap_err();
    match err {
        DeployError::Network(ApiError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_upload_of_missing_archive_is_io_error() {
    let dir = TempDir::new().unwrap();
    let api = FakeTransport::new();
    let err = upload_archive(
        &api,
        "/upload",
        &dir.path().join("gone.tar.gz"),
        Arc::new(NoProgress),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, DeployError::Io { .. }));
    assert!(api.calls().is_empty());
}

#[test]
fn test_deploy_static_uploads_filtered_archive() {
    let src = site();
    let out = TempDir::new().unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/appstax/hosting/static", Reply::json("{}"));
    let (sink, seen) = recorder();

    let report = Deployer::new(&api)
        .with_packager(Packager::new().with_temp_dir(out.path()))
        .deploy_static(src.path(), sink)
        .unwrap();
    assert_eq!(report.target, DeployTarget::Static);
    assert_eq!(report.entries, 2);

    let uploads = api.uploads.borrow();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "/appstax/hosting/static");
    assert_eq!(uploads[0].2.len() as u64, report.archive_size);
    let names: Vec<String> = entries_of(&uploads[0].2).into_iter().map(|e| e.0).collect();
    assert_eq!(names, vec!["css/style.css", "index.html"]);
    assert_eq!(*seen.lock().unwrap().last().unwrap(), report.archive_size);

    // The temporary archive is gone after a successful deploy.
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_deploy_server_uses_code_endpoint() {
    let src = site();
    let out = TempDir::new().unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/appstax/hosting/server/code", Reply::json("{}"));

    let report = Deployer::new(&api)
        .with_packager(Packager::new().with_temp_dir(out.path()))
        .deploy_server(src.path(), Arc::new(NoProgress))
        .unwrap();
    assert_eq!(report.target, DeployTarget::Server);
    assert_eq!(api.uploads.borrow()[0].0, "/appstax/hosting/server/code");
}

#[test]
fn test_failed_packaging_makes_no_request() {
    let dir = TempDir::new().unwrap();
    let api = FakeTransport::new();
    let err = Deployer::new(&api)
        .deploy_static(&dir.path().join("missing"), Arc::new(NoProgress))
        .unwrap_err();
    assert!(matches!(err, DeployError::NotFound { .. }));
    assert!(api.calls().is_empty());
}

#[test]
fn test_failed_upload_removes_archive() {
    let src = site();
    let out = TempDir::new().unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/appstax/hosting/static", Reply::status(503, "busy"));

    let err = Deployer::new(&api)
        .with_packager(Packager::new().with_temp_dir(out.path()))
        .deploy_static(src.path(), Arc::new(NoProgress))
        .unwrap_err();
    assert!(matches!(err, DeployError::Network(_)));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_upload_can_keep_archive() {
    let src = site();
    let out = TempDir::new().unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/appstax/hosting/static", Reply::status(503, "busy"));

    let err = Deployer::new(&api)
        .with_packager(Packager::new().with_temp_dir(out.path()))
        .keep_failed_artifacts(true)
        .deploy_static(src.path(), Arc::new(NoProgress))
        .unwrap_err();
    match err {
        DeployError::UploadFailed { kept_at, source } => {
            assert!(kept_at.starts_with(out.path()));
            let names: Vec<String> = entries_of(&std::fs::read(&kept_at).unwrap())
                .into_iter()
                .map(|e| e.0)
                .collect();
            assert_eq!(names, vec!["css/style.css", "index.html"]);
            assert!(matches!(*source, DeployError::Network(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_cancel_during_upload() {
    let src = TempDir::new().unwrap();
    let noise: Vec<u8> = (0..80_000u32).map(|i| (i.wrapping_mul(2654435761) >> 11) as u8).collect();
    write_file(src.path(), "blob.bin", &noise);
    let out = TempDir::new().unwrap();

    let mut api = FakeTransport::new();
    api.chunk_size = 512;
    api.reply("POST", "/appstax/hosting/static", Reply::json("{}"));

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let sink: Arc<dyn ProgressSink> = Arc::new(move |n: u64| {
        if n >= 1024 {
            trigger.cancel();
        }
    });

    let err = Deployer::new(&api)
        .with_packager(Packager::new().with_temp_dir(out.path()))
        .with_cancel(cancel)
        .deploy_static(src.path(), sink)
        .unwrap_err();
    assert!(matches!(err, DeployError::Cancelled));
    assert!(api.uploads.borrow().is_empty());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_upload_announces_total_before_progress() {
    let src = site();
    let out = TempDir::new().unwrap();
    let archive = Packager::new().with_temp_dir(out.path()).package(src.path()).unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/upload", Reply::json("{}"));

    // Never fires: the token handed to the upload is a different one.
    let sink = Arc::new(FinishLine::new(CancelToken::new()));
    upload_archive(&api, "/upload", archive.path(), sink.clone(), &CancelToken::new()).unwrap();

    let events = sink.events.lock().unwrap();
    assert_eq!(events[0], ("start", archive.size));
    assert!(events[1..].iter().all(|(kind, _)| *kind == "sent"));
    assert_eq!(events.last().unwrap().1, archive.size);
}

#[test]
fn test_cancel_after_last_byte_keeps_accepted_upload() {
    let src = site();
    let out = TempDir::new().unwrap();
    let api = FakeTransport::new();
    api.reply("POST", "/appstax/hosting/static", Reply::json("{}"));

    let cancel = CancelToken::new();
    let sink = Arc::new(FinishLine::new(cancel.clone()));
    let report = Deployer::new(&api)
        .with_packager(Packager::new().with_temp_dir(out.path()))
        .with_cancel(cancel.clone())
        .deploy_static(src.path(), sink)
        .unwrap();

    assert!(cancel.is_cancelled());
    assert_eq!(report.entries, 2);
    assert_eq!(api.uploads.borrow().len(), 1);
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

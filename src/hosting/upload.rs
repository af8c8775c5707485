// Streams a finished archive to the backend.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::api::{Transport, UploadBody};
use crate::error::DeployError;
use crate::hosting::progress::{CancelToken, ProgressSink};

/// Upload `archive` to `endpoint` in a single request and return the
/// number of bytes sent. `progress` is told the archive size first, then
/// sees the running total as the body is read; the last value it sees on
/// success is the archive size. No retry happens here.
///
/// A cancel only wins while the transport is still sending: once the
/// backend has accepted the whole body the upload counts as done.
pub fn upload_archive<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &str,
    archive: &Path,
    progress: Arc<dyn ProgressSink>,
    cancel: &CancelToken,
) -> Result<u64, DeployError> {
    let file = File::open(archive).map_err(|e| DeployError::io(archive, e))?;
    let len = file
        .metadata()
        .map_err(|e| DeployError::io(archive, e))?
        .len();
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive.tar.gz".to_string());

    let sent = Arc::new(AtomicU64::new(0));
    let reader = ProgressReader {
        inner: file,
        sent: sent.clone(),
        sink: progress.clone(),
        cancel: cancel.clone(),
    };
    tracing::info!("Uploading {} ({} bytes) to {}", archive.display(), len, endpoint);
    progress.on_start(len);

    let result = transport.post_file(
        endpoint,
        UploadBody {
            file_name,
            len,
            reader: Box::new(reader),
        },
    );
    match result {
        Ok(_) => {}
        Err(_) if cancel.is_cancelled() => return Err(DeployError::Cancelled),
        Err(e) => return Err(e.into()),
    }

    let total = sent.load(Ordering::SeqCst);
    if total < len {
        tracing::warn!("Upload accepted after {} of {} bytes were read", total, len);
        progress.on_progress(len);
    }
    tracing::info!("Upload to {} finished", endpoint);
    Ok(len)
}

/// Counts bytes as the transport pulls them and reports the running
/// total. Once the cancel token fires, any read that would still hand out
/// data fails; reaching the end of the file does not.
struct ProgressReader {
    inner: File,
    sent: Arc<AtomicU64>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            return Ok(0);
        }
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Other, "upload cancelled"));
        }
        let total = self.sent.fetch_add(n as u64, Ordering::SeqCst) + n as u64;
        self.sink.on_progress(total);
        Ok(n)
    }
}

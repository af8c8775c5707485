// Progress reporting and cancellation for long-running deploy steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives the cumulative number of bytes sent so far. Implementations
/// only observe; they cannot fail or stop an upload.
pub trait ProgressSink: Send + Sync {
    /// Called once before the first byte with the total to be sent.
    fn on_start(&self, _total_bytes: u64) {}

    fn on_progress(&self, bytes_sent: u64);
}

/// Sink that ignores every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _bytes_sent: u64) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u64) + Send + Sync,
{
    fn on_progress(&self, bytes_sent: u64) {
        self(bytes_sent)
    }
}

/// Shared flag checked between archive entries and between upload chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

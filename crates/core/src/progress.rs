//! Ingestion progress events.
//!
//! The pipeline reports running counts through [`ProgressObserver`] after every
//! item. [`TracingProgress`] turns them into structured `tracing` events; sinks
//! such as a terminal progress bar or a metrics exporter plug in the same way.

use tracing::info;

use crate::IngestProgress;

pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: IngestProgress);

    fn on_complete(&self, _progress: IngestProgress) {}
}

pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: IngestProgress) {}
}

/// Logs every `every` items and once at completion.
pub struct TracingProgress {
    every: usize,
}

impl TracingProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for TracingProgress {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, progress: IngestProgress) {
        if progress.processed % self.every == 0 {
            info!(
                processed = progress.processed,
                succeeded = progress.succeeded,
                failed = progress.failed,
                success_rate = progress.success_rate(),
                "ingestion progress"
            );
        }
    }

    fn on_complete(&self, progress: IngestProgress) {
        info!(
            processed = progress.processed,
            succeeded = progress.succeeded,
            failed = progress.failed,
            success_rate = progress.success_rate(),
            "ingestion finished"
        );
    }
}

impl<T: ProgressObserver + ?Sized> ProgressObserver for std::sync::Arc<T> {
    fn on_progress(&self, progress: IngestProgress) {
        (**self).on_progress(progress);
    }

    fn on_complete(&self, progress: IngestProgress) {
        (**self).on_complete(progress);
    }
}

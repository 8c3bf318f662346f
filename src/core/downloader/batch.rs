// ─── Batch Downloads ───
// Fixed worker pool over a shared queue, with live progress/speed/ETA.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::client::{DownloadTask, Downloader};
use super::telemetry::{SpeedMeter, SAMPLE_INTERVAL};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventEmitter, SyncEvent};

/// Outcome of a batch. Individual failures were already emitted as events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub failed: usize,
    pub bytes: u64,
}

/// `[1, min(requested, tasks)]`
pub fn effective_concurrency(requested: usize, tasks: usize) -> usize {
    requested.min(tasks).max(1)
}

struct Shared<'a> {
    queue: Mutex<VecDeque<DownloadTask>>,
    downloaded: AtomicU64,
    completed: AtomicUsize,
    failed: AtomicUsize,
    total_size: u64,
    cancel: &'a CancellationToken,
    events: &'a EventEmitter,
}

impl Downloader {
    /// Download every task with at most `concurrency` requests in flight.
    ///
    /// A failing task emits an `Error` event and the batch moves on.
    /// Cancellation aborts in-flight requests, stops claiming new tasks and
    /// returns `Cancelled`.
    #[instrument(skip_all, fields(tasks = tasks.len(), total_size))]
    pub async fn fetch_many(
        &self,
        tasks: Vec<DownloadTask>,
        total_size: u64,
        concurrency: usize,
        cancel: &CancellationToken,
        events: &EventEmitter,
    ) -> LauncherResult<BatchReport> {
        let task_count = tasks.len();
        if task_count == 0 {
            return Ok(BatchReport::default());
        }
        let workers = effective_concurrency(concurrency, task_count);
        info!(
            "Starting batch download: {} files, {} bytes, concurrency={}",
            task_count, total_size, workers
        );

        let shared = Shared {
            queue: Mutex::new(VecDeque::from(tasks)),
            downloaded: AtomicU64::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            total_size,
            cancel,
            events,
        };

        let pool = join_all((0..workers).map(|_| self.worker(&shared)));
        tokio::pin!(pool);

        let mut meter = SpeedMeter::new(total_size);
        let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = &mut pool => break,
                _ = ticker.tick() => {
                    let sample = meter.sample(shared.downloaded.load(Ordering::Relaxed));
                    events.emit(SyncEvent::Speed { bytes_per_sec: sample.bytes_per_sec });
                    events.emit(SyncEvent::Estimated { seconds_remaining: sample.seconds_remaining });
                }
            }
        }

        let report = BatchReport {
            completed: shared.completed.load(Ordering::Relaxed),
            failed: shared.failed.load(Ordering::Relaxed),
            bytes: shared.downloaded.load(Ordering::Relaxed),
        };

        if cancel.is_cancelled() {
            info!(
                "Batch cancelled after {}/{} files",
                report.completed, task_count
            );
            return Err(LauncherError::Cancelled("download batch aborted".into()));
        }

        info!(
            "Batch finished: {}/{} files ok, {} failed, {} bytes",
            report.completed - report.failed,
            task_count,
            report.failed,
            report.bytes
        );
        Ok(report)
    }

    async fn worker(&self, shared: &Shared<'_>) {
        loop {
            if shared.cancel.is_cancelled() {
                return;
            }
            let Some(task) = shared.queue.lock().await.pop_front() else {
                return;
            };

            let on_chunk = |n: u64| {
                let done = shared.downloaded.fetch_add(n, Ordering::Relaxed) + n;
                shared.events.progress(done, shared.total_size, Some(&task.label));
            };

            let result = tokio::select! {
                r = self.stream_to_file(&task.url, &task.destination_path, on_chunk) => r,
                _ = shared.cancel.cancelled() => {
                    Err(LauncherError::Cancelled(task.label.clone()))
                }
            };

            match result {
                Ok(_) => {}
                Err(e) if e.is_cancelled() || shared.cancel.is_cancelled() => {
                    // In-flight request dropped; the partial file goes with it.
                    remove_part_file(&task).await;
                }
                Err(e) => {
                    shared.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Download failed {}: {}", task.url, e);
                    shared.events.error(format!("{}: {}", task.label, e));
                }
            }
            shared.completed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn remove_part_file(task: &DownloadTask) {
    let mut name = task
        .destination_path
        .file_name()
        .unwrap_or_default()
        .to_os_string();
    name.push(".part");
    let _ = tokio::fs::remove_file(task.destination_path.with_file_name(name)).await;
}

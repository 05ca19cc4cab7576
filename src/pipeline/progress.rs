//! Background progress monitor for the tagging phase.
//!
//! Periodically logs outcome counters (tagged, skipped, failed) so
//! operators can track long runs without parsing per-order log lines.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

/// Snapshot of tagging progress at a point in time.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Orders processed so far (tagged + skipped + failed).
    pub processed: usize,
    /// Orders that received a new tag.
    pub tagged: usize,
    /// Orders whose tag was already present.
    pub skipped: usize,
    /// Orders with a recorded failure.
    pub failed: usize,
    /// Wall-clock elapsed time since the monitor started.
    pub elapsed: Duration,
}

/// Shared atomic counters incremented by tagging workers.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounters {
    /// Orders that received a new tag.
    pub tagged: Arc<AtomicUsize>,
    /// Orders whose tag was already present.
    pub skipped: Arc<AtomicUsize>,
    /// Orders with a recorded failure.
    pub failed: Arc<AtomicUsize>,
}

impl ProgressCounters {
    /// Create a new set of zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a snapshot of the current counter values.
    pub fn snapshot(&self, start: Instant) -> ProgressSnapshot {
        let tagged = self.tagged.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);

        ProgressSnapshot {
            processed: tagged + skipped + failed,
            tagged,
            skipped,
            failed,
            elapsed: start.elapsed(),
        }
    }
}

/// A background task that periodically logs tagging progress.
///
/// Call [`ProgressMonitor::stop`] when the worker pool drains.
pub struct ProgressMonitor {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    /// Start a monitor that logs every `interval` until stopped.
    ///
    /// `total` is the number of orders submitted to the pool, used for
    /// the progress percentage.
    pub fn start(counters: ProgressCounters, total: usize, interval: Duration) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();
        let start = Instant::now();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // skip the immediate first tick

            loop {
                tick.tick().await;
                if flag.load(Ordering::Relaxed) {
                    break;
                }

                let snap = counters.snapshot(start);
                let pct = if total > 0 {
                    (snap.processed as f64 / total as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };

                tracing::info!(
                    processed = snap.processed,
                    tagged = snap.tagged,
                    skipped = snap.skipped,
                    failed = snap.failed,
                    total = total,
                    progress_pct = format!("{:.1}%", pct),
                    elapsed_secs = snap.elapsed.as_secs(),
                    "Tagging progress"
                );
            }
        });

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    /// Signal the background monitor to stop and wait for it to finish.
    pub async fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_zeroed() {
        let counters = ProgressCounters::new();
        let snap = counters.snapshot(Instant::now());

        assert_eq!(snap.processed, 0);
        assert_eq!(snap.tagged, 0);
        assert_eq!(snap.skipped, 0);
        assert_eq!(snap.failed, 0);
    }

    #[test]
    fn test_processed_sums_outcomes() {
        let counters = ProgressCounters::new();
        counters.tagged.fetch_add(4, Ordering::Relaxed);
        counters.skipped.fetch_add(2, Ordering::Relaxed);
        counters.failed.fetch_add(1, Ordering::Relaxed);

        let snap = counters.snapshot(Instant::now());
        assert_eq!(snap.processed, 7);
    }

    #[test]
    fn test_counters_clone_shares_state() {
        let counters = ProgressCounters::new();
        let clone = counters.clone();

        counters.tagged.fetch_add(1, Ordering::Relaxed);
        assert_eq!(clone.tagged.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_monitor_start_stop() {
        let counters = ProgressCounters::new();
        counters.tagged.fetch_add(3, Ordering::Relaxed);

        let monitor = ProgressMonitor::start(counters, 10, Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(120)).await;
        monitor.stop().await;
    }
}

//! Per-job run metrics

use crate::error::JobError;
use chrono::{DateTime, Utc};
use doodling_common::format_datetime;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Recent durations kept for average / p95
const DURATION_HISTORY: usize = 512;

/// Metrics of one ranking job
#[derive(Clone, Default)]
pub struct JobMetrics {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    /// Runs that got past the overlap guard
    runs: u64,
    succeeded: u64,
    /// Runs that ended in an error, timeouts included
    failed: u64,
    /// Triggers dropped because the previous run was still going
    skipped: u64,
    timed_out: u64,
    /// Runs stopped by shutdown; not counted as failed
    cancelled: u64,
    /// Leaderboard rows written by successful runs
    entries_written: u64,
    durations: Vec<Duration>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.inner.write().runs += 1;
    }

    pub fn record_skipped(&self) {
        self.inner.write().skipped += 1;
    }

    pub fn record_success(&self, duration: Duration, entries_written: u64) {
        let mut inner = self.inner.write();
        inner.succeeded += 1;
        inner.entries_written += entries_written;
        inner.last_success = Some(doodling_common::now_utc());
        Self::push_duration(&mut inner, duration);
    }

    pub fn record_failure(&self, duration: Duration, error: &JobError) {
        let mut inner = self.inner.write();
        match error {
            JobError::Cancelled => inner.cancelled += 1,
            JobError::TimedOut(_) => {
                inner.timed_out += 1;
                inner.failed += 1;
            }
            _ => inner.failed += 1,
        }
        inner.last_error = Some(error.to_string());
        Self::push_duration(&mut inner, duration);
    }

    fn push_duration(inner: &mut MetricsInner, duration: Duration) {
        inner.durations.push(duration);
        if inner.durations.len() > DURATION_HISTORY {
            inner.durations.drain(0..DURATION_HISTORY / 2);
        }
    }

    pub fn runs(&self) -> u64 {
        self.inner.read().runs
    }

    pub fn succeeded(&self) -> u64 {
        self.inner.read().succeeded
    }

    pub fn failed(&self) -> u64 {
        self.inner.read().failed
    }

    pub fn skipped(&self) -> u64 {
        self.inner.read().skipped
    }

    pub fn timed_out(&self) -> u64 {
        self.inner.read().timed_out
    }

    pub fn cancelled(&self) -> u64 {
        self.inner.read().cancelled
    }

    pub fn entries_written(&self) -> u64 {
        self.inner.read().entries_written
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    /// Get average run duration
    pub fn average_duration(&self) -> Option<Duration> {
        let inner = self.inner.read();
        if inner.durations.is_empty() {
            return None;
        }

        let total: Duration = inner.durations.iter().sum();
        Some(total / inner.durations.len() as u32)
    }

    /// Get p95 run duration
    pub fn p95_duration(&self) -> Option<Duration> {
        let inner = self.inner.read();
        if inner.durations.is_empty() {
            return None;
        }

        let mut sorted = inner.durations.clone();
        sorted.sort();
        let index = (sorted.len() as f64 * 0.95) as usize;
        Some(sorted[index.min(sorted.len() - 1)])
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let average_duration = self.average_duration();
        let p95_duration = self.p95_duration();
        let inner = self.inner.read();
        MetricsSnapshot {
            runs: inner.runs,
            succeeded: inner.succeeded,
            failed: inner.failed,
            skipped: inner.skipped,
            timed_out: inner.timed_out,
            cancelled: inner.cancelled,
            entries_written: inner.entries_written,
            average_duration_ms: average_duration.map(|d| d.as_millis() as u64),
            p95_duration_ms: p95_duration.map(|d| d.as_millis() as u64),
            last_success: inner.last_success,
            last_error: inner.last_error.clone(),
        }
    }
}

/// Snapshot of one job's metrics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub runs: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub entries_written: u64,
    pub average_duration_ms: Option<u64>,
    pub p95_duration_ms: Option<u64>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl MetricsSnapshot {
    /// Emit the snapshot as one structured log record
    pub fn log(&self, job: &str) {
        let last_success = self.last_success.as_ref().map(format_datetime);
        info!(
            job = %job,
            runs = self.runs,
            succeeded = self.succeeded,
            failed = self.failed,
            skipped = self.skipped,
            timed_out = self.timed_out,
            cancelled = self.cancelled,
            entries_written = self.entries_written,
            avg_duration_ms = self.average_duration_ms.unwrap_or(0),
            p95_duration_ms = self.p95_duration_ms.unwrap_or(0),
            last_success = last_success.as_deref(),
            last_error = self.last_error.as_deref(),
            "Job metrics"
        );
    }

    /// Share of finished runs that succeeded (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let finished = self.succeeded + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.succeeded as f64 / finished as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = JobMetrics::new();

        metrics.record_started();
        metrics.record_success(Duration::from_millis(20), 10);
        metrics.record_skipped();

        assert_eq!(metrics.runs(), 1);
        assert_eq!(metrics.succeeded(), 1);
        assert_eq!(metrics.skipped(), 1);
        assert_eq!(metrics.entries_written(), 10);
        assert!(metrics.snapshot().last_success.is_some());
    }

    #[test]
    fn test_failure_classification() {
        let metrics = JobMetrics::new();

        metrics.record_failure(Duration::from_secs(60), &JobError::TimedOut(Duration::from_secs(60)));
        metrics.record_failure(Duration::from_millis(5), &JobError::Cancelled);
        metrics.record_failure(
            Duration::from_millis(5),
            &JobError::ScopesFailed { failed: 1, total: 2 },
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.timed_out, 1);
        assert_eq!(snapshot.cancelled, 1);
        assert_eq!(snapshot.last_error.as_deref(), Some("1 of 2 scopes failed"));
    }

    #[test]
    fn test_duration_metrics() {
        let metrics = JobMetrics::new();
        assert!(metrics.average_duration().is_none());

        for ms in [100, 200, 300] {
            metrics.record_success(Duration::from_millis(ms), 0);
        }

        assert_eq!(metrics.average_duration(), Some(Duration::from_millis(200)));
        assert_eq!(metrics.p95_duration(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_success_rate() {
        let metrics = JobMetrics::new();
        metrics.record_success(Duration::ZERO, 0);
        metrics.record_failure(Duration::ZERO, &JobError::UnknownJob("x".into()));

        assert_eq!(metrics.snapshot().success_rate(), 0.5);
    }

    #[test]
    fn test_log_record_carries_cancellations_and_last_error() {
        let buffer = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer({
                let buffer = Arc::clone(&buffer);
                move || LogBuffer(Arc::clone(&buffer))
            })
            .finish();

        let metrics = JobMetrics::new();
        metrics.record_failure(Duration::from_millis(5), &JobError::Cancelled);
        metrics.record_failure(
            Duration::from_millis(5),
            &JobError::ScopesFailed { failed: 1, total: 3 },
        );
        tracing::subscriber::with_default(subscriber, || metrics.snapshot().log("category-realtime"));

        let output = String::from_utf8(buffer.lock().clone()).unwrap();
        assert!(output.contains("job=category-realtime"));
        assert!(output.contains("cancelled=1"));
        assert!(output.contains("failed=1"));
        assert!(output.contains("last_error=\"1 of 3 scopes failed\""));
    }

    struct LogBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}

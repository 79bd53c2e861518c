use std::sync::{Arc, Once, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::diff::DiffResult;
use crate::schedule::{duration_to_ms, BatchReport, RollingWindowMs};

const FRAME_RATE_WINDOW_LEN: usize = 60;
pub const DEFAULT_SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

/// A panicking reader or writer never takes the metrics down; the first recovery is logged.
fn note_poisoned_metrics(operation: &'static str) {
    static POISON_LOGGED: Once = Once::new();
    POISON_LOGGED.call_once(|| warn!(operation, "metrics_lock_poisoned"));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Duration of the most recently applied batch.
    pub render_time_ms: f32,
    pub batch_count: u64,
    pub cells_updated: u64,
    /// Unchanged on the surface plus missing display handles.
    pub cells_skipped: u64,
    /// Share of diffed cells that matched the previous generation.
    pub cache_hit_rate: f32,
    pub memory_usage_estimate: usize,
    pub frame_rate: f32,
    pub diff_count: u64,
    pub pooled_reuse_count: u64,
    pub current_batch_size: usize,
    pub current_throttle_ms: f32,
    pub frames_skipped: u64,
}

/// Clonable read-only view of the latest published metrics.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<PerformanceMetrics>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> PerformanceMetrics {
        *self.latest.read().unwrap_or_else(|poisoned| {
            note_poisoned_metrics("read");
            poisoned.into_inner()
        })
    }

    pub(crate) fn publish(&self, metrics: PerformanceMetrics) {
        *self.latest.write().unwrap_or_else(|poisoned| {
            note_poisoned_metrics("write");
            poisoned.into_inner()
        }) = metrics;
    }
}

#[derive(Debug)]
pub struct MetricsCollector {
    current: PerformanceMetrics,
    frame_intervals: RollingWindowMs<FRAME_RATE_WINDOW_LEN>,
    last_frame_at: Option<Duration>,
    compared_total: u64,
    unchanged_total: u64,
    summary_interval: Duration,
    last_summary_at: Option<Duration>,
    handle: MetricsHandle,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_INTERVAL)
    }
}

impl MetricsCollector {
    pub fn new(summary_interval: Duration) -> Self {
        Self {
            current: PerformanceMetrics::default(),
            frame_intervals: RollingWindowMs::default(),
            last_frame_at: None,
            compared_total: 0,
            unchanged_total: 0,
            summary_interval,
            last_summary_at: None,
            handle: MetricsHandle::default(),
        }
    }

    pub fn handle(&self) -> MetricsHandle {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        self.current
    }

    pub fn record_frame(&mut self, now: Duration) {
        if let Some(last) = self.last_frame_at {
            self.frame_intervals.push_ms(duration_to_ms(now.saturating_sub(last)));
            let average_ms = self.frame_intervals.average_ms();
            self.current.frame_rate = if average_ms > 0.0 {
                1000.0 / average_ms
            } else {
                0.0
            };
        }
        self.last_frame_at = Some(now);
    }

    pub fn record_diff(&mut self, diff: &DiffResult) {
        self.current.diff_count += 1;
        self.compared_total += diff.compared as u64;
        self.unchanged_total += diff.unchanged as u64;
        self.current.cache_hit_rate = if self.compared_total == 0 {
            0.0
        } else {
            self.unchanged_total as f32 / self.compared_total as f32
        };
    }

    pub fn record_batch(&mut self, report: &BatchReport) {
        self.current.batch_count += 1;
        self.current.cells_updated += report.updated as u64;
        self.current.cells_skipped += report.skipped() as u64;
        self.current.render_time_ms = duration_to_ms(report.elapsed);
    }

    pub fn record_skipped_frame(&mut self) {
        self.current.frames_skipped += 1;
    }

    pub fn record_adaptive_state(&mut self, batch_size: usize, throttle_ms: f32) {
        self.current.current_batch_size = batch_size;
        self.current.current_throttle_ms = throttle_ms;
    }

    pub fn record_memory(&mut self, bytes: usize, pooled_reuse_count: u64) {
        self.current.memory_usage_estimate = bytes;
        self.current.pooled_reuse_count = pooled_reuse_count;
    }

    pub fn publish(&self) {
        self.handle.publish(self.current);
    }

    /// Logs a summary at most once per summary interval of host time.
    pub fn maybe_log_summary(&mut self, now: Duration) -> bool {
        let due = match self.last_summary_at {
            Some(last) => now.saturating_sub(last) >= self.summary_interval,
            None => true,
        };
        if !due {
            return false;
        }
        self.last_summary_at = Some(now);
        let metrics = self.current;
        info!(
            frame_rate = metrics.frame_rate,
            render_time_ms = metrics.render_time_ms,
            batch_count = metrics.batch_count,
            cells_updated = metrics.cells_updated,
            cells_skipped = metrics.cells_skipped,
            cache_hit_rate = metrics.cache_hit_rate,
            diff_count = metrics.diff_count,
            pooled_reuse_count = metrics.pooled_reuse_count,
            batch_size = metrics.current_batch_size,
            throttle_ms = metrics.current_throttle_ms,
            frames_skipped = metrics.frames_skipped,
            memory_bytes = metrics.memory_usage_estimate,
            "render_metrics"
        );
        true
    }
}

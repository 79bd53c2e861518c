use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use tracing::{debug, warn};

use crate::diff::DirtyCell;
use crate::pool::{BatchEntry, LocalPos, ObjectPoolManager, RenderPriority, VirtualCell};
use crate::surface::{DisplayHandle, DisplaySurface};

use super::adaptive::AdaptivePolicy;
use super::host::{FrameHandle, FrameHost};
use super::rolling::duration_to_ms;

/// Caller-flagged coordinates. Anything not listed is `Normal`; `high` wins over `low`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityHints {
    pub high: HashSet<LocalPos>,
    pub low: HashSet<LocalPos>,
}

impl PriorityHints {
    pub fn priority_of(&self, pos: LocalPos) -> RenderPriority {
        if self.high.contains(&pos) {
            RenderPriority::High
        } else if self.low.contains(&pos) {
            RenderPriority::Low
        } else {
            RenderPriority::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchReport {
    pub cells: usize,
    pub updated: usize,
    /// Handle present and already showing the intended contents.
    pub skipped_unchanged: usize,
    pub skipped_missing: usize,
    pub elapsed: Duration,
    pub priority: RenderPriority,
    /// Cells still queued after this batch.
    pub remaining: usize,
}

impl BatchReport {
    pub fn skipped(&self) -> usize {
        self.skipped_unchanged + self.skipped_missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchOutcome {
    Idle,
    /// Overload skip; the queue is untouched and retried on a later frame.
    Skipped,
    Applied(BatchReport),
}

/// Queues dirty cells by priority and applies them in size-adaptive batches, one batch per
/// display-refresh callback. Holds at most one outstanding frame request.
#[derive(Debug)]
pub struct FrameScheduler<H: FrameHost> {
    host: H,
    policy: AdaptivePolicy,
    queues: [VecDeque<DirtyCell>; 3],
    pending: Option<FrameHandle>,
    last_cycle_at: Option<Duration>,
    superseded_cells: u64,
}

impl<H: FrameHost> FrameScheduler<H> {
    pub fn new(host: H, policy: AdaptivePolicy) -> Self {
        Self {
            host,
            policy,
            queues: Default::default(),
            pending: None,
            last_cycle_at: None,
            superseded_cells: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn now(&self) -> Duration {
        self.host.now()
    }

    pub fn policy(&self) -> &AdaptivePolicy {
        &self.policy
    }

    pub fn reconfigure(&mut self, target_ms: f32, max_batch_size: usize, adaptive: bool) {
        self.policy.reconfigure(target_ms, max_batch_size, adaptive);
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Consumes the outstanding request if `handle` matches it. Stale or cancelled handles are
    /// rejected.
    pub fn accept_frame(&mut self, handle: FrameHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            debug!(handle = handle.0, "stale_frame_ignored");
            false
        }
    }

    pub fn ensure_frame(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.host.request_frame());
        }
    }

    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.host.cancel_frame(handle);
        }
    }

    /// True while `now` is within the adaptive throttle interval of the last executed cycle.
    pub fn is_throttled(&self, now: Duration) -> bool {
        let Some(last) = self.last_cycle_at else {
            return false;
        };
        duration_to_ms(now.saturating_sub(last)) < self.policy.throttle_ms()
    }

    pub fn mark_cycle(&mut self, now: Duration) {
        self.last_cycle_at = Some(now);
    }

    pub fn queued_cells(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn has_queued(&self) -> bool {
        self.queues.iter().any(|queue| !queue.is_empty())
    }

    pub fn superseded_cells(&self) -> u64 {
        self.superseded_cells
    }

    /// Replaces the outstanding schedule with `dirty`. Not-yet-applied cells from the previous
    /// schedule are carried over unless `dirty` holds the same coordinate. The pending frame is
    /// cancelled and a fresh one requested.
    pub fn schedule_render(
        &mut self,
        dirty: Vec<DirtyCell>,
        hints: &PriorityHints,
        pool: &mut ObjectPoolManager,
    ) -> usize {
        self.cancel_pending();

        let fresh: HashSet<LocalPos> = dirty.iter().map(|cell| cell.pos).collect();
        let mut carried = Vec::with_capacity(self.queued_cells());
        for queue in &mut self.queues {
            for cell in queue.drain(..) {
                if fresh.contains(&cell.pos) {
                    self.superseded_cells += 1;
                    pool.release_cell(cell.cell);
                } else {
                    carried.push(cell);
                }
            }
        }

        for cell in carried.into_iter().chain(dirty) {
            let priority = hints.priority_of(cell.pos);
            self.queues[priority.index()].push_back(cell);
        }

        let queued = self.queued_cells();
        if queued > 0 {
            self.ensure_frame();
        }
        debug!(
            queued,
            high = self.queues[RenderPriority::High.index()].len(),
            batch_size = self.policy.batch_size(),
            "render_scheduled"
        );
        queued
    }

    /// Runs at most one batch against `surface`.
    pub fn run_next_batch(
        &mut self,
        surface: &mut dyn DisplaySurface,
        pool: &mut ObjectPoolManager,
    ) -> BatchOutcome {
        if !self.has_queued() {
            return BatchOutcome::Idle;
        }
        if self.policy.should_skip() {
            debug!(
                queued = self.queued_cells(),
                average_ms = self.policy.average_batch_ms(),
                "batch_skipped"
            );
            return BatchOutcome::Skipped;
        }

        let started = self.host.now();
        let mut batch = pool.acquire_batch();
        batch.timestamp = started;
        batch.priority = RenderPriority::ALL
            .into_iter()
            .find(|priority| !self.queues[priority.index()].is_empty())
            .unwrap_or_default();

        let limit = self.policy.batch_size();
        for queue in &mut self.queues {
            while batch.entries.len() < limit {
                let Some(cell) = queue.pop_front() else {
                    break;
                };
                batch.entries.push(BatchEntry {
                    pos: cell.pos,
                    cell: cell.cell,
                });
            }
        }

        let mut report = BatchReport {
            cells: batch.len(),
            priority: batch.priority,
            ..BatchReport::default()
        };
        for entry in &batch.entries {
            match surface.handle_mut(entry.pos.x, entry.pos.y) {
                Some(handle) => {
                    if apply_cell(handle, &entry.cell) {
                        report.updated += 1;
                    } else {
                        report.skipped_unchanged += 1;
                    }
                }
                None => {
                    if report.skipped_missing == 0 {
                        warn!(x = entry.pos.x, y = entry.pos.y, "display_handle_missing");
                    }
                    report.skipped_missing += 1;
                }
            }
        }
        pool.release_batch(batch);

        report.elapsed = self.host.now().saturating_sub(started);
        report.remaining = self.queued_cells();
        self.policy.record_batch(duration_to_ms(report.elapsed));

        debug!(
            cells = report.cells,
            updated = report.updated,
            skipped_unchanged = report.skipped_unchanged,
            skipped_missing = report.skipped_missing,
            elapsed_ms = duration_to_ms(report.elapsed),
            remaining = report.remaining,
            priority = ?report.priority,
            "batch_applied"
        );
        BatchOutcome::Applied(report)
    }

    /// Cancels the pending frame and returns every queued cell to `pool`.
    pub fn clear(&mut self, pool: &mut ObjectPoolManager) {
        self.cancel_pending();
        for queue in &mut self.queues {
            for cell in queue.drain(..) {
                pool.release_cell(cell.cell);
            }
        }
        self.last_cycle_at = None;
    }
}

/// Writes only the fields that differ from what the handle already shows.
fn apply_cell(handle: &mut dyn DisplayHandle, cell: &VirtualCell) -> bool {
    let mut wrote = false;
    if handle.glyph() != cell.glyph {
        handle.set_glyph(cell.glyph);
        wrote = true;
    }
    if handle.color() != cell.color {
        handle.set_color(cell.color);
        wrote = true;
    }
    if handle.opacity() != cell.opacity {
        handle.set_opacity(cell.opacity);
        wrote = true;
    }
    wrote
}

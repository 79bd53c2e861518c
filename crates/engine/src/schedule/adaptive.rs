use tracing::{debug, warn};

use super::rolling::RollingWindowMs;

pub const MIN_BATCH_SIZE: usize = 10;
pub const MAX_BATCH_SIZE_CEILING: usize = 200;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 150;
pub const INITIAL_BATCH_SIZE: usize = 100;
pub const BATCH_SHRINK_STEP: usize = 10;
pub const BATCH_GROW_STEP: usize = 25;

pub const DEFAULT_FRAME_TARGET_MS: f32 = 16.67;
pub const SHRINK_THRESHOLD: f32 = 1.2;
pub const GROW_THRESHOLD: f32 = 0.8;
pub const SKIP_THRESHOLD: f32 = 1.5;
pub const SKIP_EVERY_NTH_BATCH: u64 = 3;
pub const SKIP_WINDOW_LEN: usize = 10;

pub const THROTTLE_MIN_MS: f32 = 16.0;
pub const THROTTLE_MAX_MS: f32 = 33.0;
pub const THROTTLE_UP_STEP_MS: f32 = 2.0;
pub const THROTTLE_DOWN_STEP_MS: f32 = 1.0;

/// Hill-climbing batch size, throttle interval and frame-skip state, fed by measured batch times.
#[derive(Debug, Clone)]
pub struct AdaptivePolicy {
    target_ms: f32,
    max_batch_size: usize,
    adaptive: bool,
    batch_size: usize,
    throttle_ms: f32,
    window: RollingWindowMs<SKIP_WINDOW_LEN>,
    skipping: bool,
    batch_frames: u64,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_TARGET_MS, DEFAULT_MAX_BATCH_SIZE, true)
    }
}

impl AdaptivePolicy {
    /// Expects already-normalized inputs; `max_batch_size` is still clamped into range.
    pub fn new(target_ms: f32, max_batch_size: usize, adaptive: bool) -> Self {
        let max_batch_size = max_batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE_CEILING);
        Self {
            target_ms,
            max_batch_size,
            adaptive,
            batch_size: initial_batch_size(max_batch_size),
            throttle_ms: THROTTLE_MIN_MS,
            window: RollingWindowMs::default(),
            skipping: false,
            batch_frames: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn throttle_ms(&self) -> f32 {
        self.throttle_ms
    }

    pub fn target_ms(&self) -> f32 {
        self.target_ms
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    pub fn average_batch_ms(&self) -> f32 {
        self.window.average_ms()
    }

    /// Applies new bounds at runtime. Adaptive state is re-clamped into them; turning adaptation
    /// off restores the initial values.
    pub fn reconfigure(&mut self, target_ms: f32, max_batch_size: usize, adaptive: bool) {
        self.target_ms = target_ms;
        self.max_batch_size = max_batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE_CEILING);
        if adaptive {
            self.batch_size = self.batch_size.clamp(MIN_BATCH_SIZE, self.max_batch_size);
        } else {
            self.batch_size = initial_batch_size(self.max_batch_size);
            self.throttle_ms = THROTTLE_MIN_MS;
            self.window.clear();
            self.skipping = false;
        }
        self.adaptive = adaptive;
    }

    /// Feeds one measured batch time into the policy.
    pub fn record_batch(&mut self, elapsed_ms: f32) {
        if !self.adaptive || !elapsed_ms.is_finite() {
            return;
        }
        self.window.push_ms(elapsed_ms);

        let previous_size = self.batch_size;
        if elapsed_ms > self.target_ms * SHRINK_THRESHOLD {
            self.batch_size = self
                .batch_size
                .saturating_sub(BATCH_SHRINK_STEP)
                .max(MIN_BATCH_SIZE);
        } else if elapsed_ms < self.target_ms * GROW_THRESHOLD {
            self.batch_size = (self.batch_size + BATCH_GROW_STEP).min(self.max_batch_size);
        }

        if elapsed_ms > self.target_ms {
            self.throttle_ms = (self.throttle_ms + THROTTLE_UP_STEP_MS).min(THROTTLE_MAX_MS);
        } else {
            self.throttle_ms = (self.throttle_ms - THROTTLE_DOWN_STEP_MS).max(THROTTLE_MIN_MS);
        }

        let overloaded = self.window.average_ms() > self.target_ms * SKIP_THRESHOLD;
        if overloaded != self.skipping {
            self.skipping = overloaded;
            self.batch_frames = 0;
            if overloaded {
                warn!(
                    average_ms = self.window.average_ms(),
                    target_ms = self.target_ms,
                    "frame_skipping_engaged"
                );
            } else {
                warn!(
                    average_ms = self.window.average_ms(),
                    target_ms = self.target_ms,
                    "frame_skipping_recovered"
                );
            }
        }

        if previous_size != self.batch_size {
            debug!(
                elapsed_ms,
                from = previous_size,
                to = self.batch_size,
                throttle_ms = self.throttle_ms,
                "batch_size_adjusted"
            );
        }
    }

    /// Called once per frame that would run a batch. While overloaded, every Nth such frame is
    /// skipped.
    pub fn should_skip(&mut self) -> bool {
        if !self.skipping {
            return false;
        }
        self.batch_frames += 1;
        self.batch_frames % SKIP_EVERY_NTH_BATCH == 0
    }
}

fn initial_batch_size(max_batch_size: usize) -> usize {
    INITIAL_BATCH_SIZE.min(max_batch_size)
}

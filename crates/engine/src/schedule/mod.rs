mod adaptive;
mod host;
mod rolling;
mod scheduler;

pub use adaptive::{
    AdaptivePolicy, BATCH_GROW_STEP, BATCH_SHRINK_STEP, DEFAULT_FRAME_TARGET_MS,
    DEFAULT_MAX_BATCH_SIZE, GROW_THRESHOLD, INITIAL_BATCH_SIZE, MAX_BATCH_SIZE_CEILING,
    MIN_BATCH_SIZE, SHRINK_THRESHOLD, SKIP_EVERY_NTH_BATCH, SKIP_THRESHOLD, SKIP_WINDOW_LEN,
    THROTTLE_DOWN_STEP_MS, THROTTLE_MAX_MS, THROTTLE_MIN_MS, THROTTLE_UP_STEP_MS,
};
pub use host::{FrameHandle, FrameHost, ManualFrameHost, SystemFrameHost};
pub use scheduler::{BatchOutcome, BatchReport, FrameScheduler, PriorityHints};

pub(crate) use rolling::{duration_to_ms, RollingWindowMs};

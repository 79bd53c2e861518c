use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::debug;

/// Identifies one requested display-refresh callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Source of time and display-refresh callbacks.
///
/// The host fires a requested frame by calling back into the pipeline with the handle it
/// returned from [`FrameHost::request_frame`]. Cancelled handles must not be fired.
pub trait FrameHost {
    fn now(&self) -> Duration;
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Deterministic host for tests and headless tools. Time only moves when told to, plus an
/// optional fixed step added on every [`FrameHost::now`] read.
#[derive(Debug, Default)]
pub struct ManualFrameHost {
    time: Cell<Duration>,
    step_per_read: Duration,
    next_handle: u64,
    pending: Option<FrameHandle>,
    requests: u64,
    cancels: u64,
}

impl ManualFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `now()` read advances the clock by `step`, so each timed section measures `step`.
    pub fn with_step(step: Duration) -> Self {
        Self {
            step_per_read: step,
            ..Self::default()
        }
    }

    pub fn set_step(&mut self, step: Duration) {
        self.step_per_read = step;
    }

    pub fn advance(&mut self, by: Duration) {
        self.time.set(self.time.get().saturating_add(by));
    }

    pub fn elapsed(&self) -> Duration {
        self.time.get()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Fires the pending frame, if any: clears it and returns its handle.
    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn cancels(&self) -> u64 {
        self.cancels
    }
}

impl FrameHost for ManualFrameHost {
    fn now(&self) -> Duration {
        let now = self.time.get();
        self.time.set(now.saturating_add(self.step_per_read));
        now
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        self.requests += 1;
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
        self.cancels += 1;
    }
}

/// Wall-clock host for a real refresh loop. The loop polls [`SystemFrameHost::take_pending`]
/// once per refresh.
#[derive(Debug)]
pub struct SystemFrameHost {
    start: Instant,
    next_handle: u64,
    pending: Option<FrameHandle>,
}

impl Default for SystemFrameHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemFrameHost {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            next_handle: 0,
            pending: None,
        }
    }

    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameHost for SystemFrameHost {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            debug!(handle = handle.0, "frame_cancelled");
        }
    }
}

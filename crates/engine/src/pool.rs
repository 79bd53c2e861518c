use std::mem;
use std::time::Duration;

use tracing::debug;

use crate::color::Rgb;

pub const CELL_POOL_SEED: usize = 1000;
pub const CELL_POOL_CAP: usize = 2000;
pub const BATCH_POOL_SEED: usize = 20;
pub const BATCH_POOL_CAP: usize = 40;

/// Intended contents of one viewport cell for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualCell {
    pub glyph: char,
    pub color: Rgb,
    pub opacity: f32,
    pub dirty: bool,
}

impl Default for VirtualCell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            color: Rgb::BLACK,
            opacity: 0.0,
            dirty: false,
        }
    }
}

impl VirtualCell {
    /// Field equality on glyph, color and opacity; `dirty` is bookkeeping and not compared.
    pub fn same_contents(&self, other: &VirtualCell) -> bool {
        self.glyph == other.glyph && self.color == other.color && self.opacity == other.opacity
    }
}

/// Viewport-local coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPos {
    pub x: u32,
    pub y: u32,
}

impl LocalPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPriority {
    High,
    #[default]
    Normal,
    Low,
}

impl RenderPriority {
    pub const ALL: [RenderPriority; 3] = [RenderPriority::High, RenderPriority::Normal, RenderPriority::Low];

    pub const fn index(self) -> usize {
        match self {
            RenderPriority::High => 0,
            RenderPriority::Normal => 1,
            RenderPriority::Low => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub pos: LocalPos,
    pub cell: VirtualCell,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderBatch {
    pub entries: Vec<BatchEntry>,
    pub priority: RenderPriority,
    /// Host time at which the batch was formed.
    pub timestamp: Duration,
}

impl RenderBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub trait Poolable: Default {
    fn reset(&mut self);

    fn retained_bytes(&self) -> usize {
        mem::size_of::<Self>()
    }
}

impl Poolable for VirtualCell {
    fn reset(&mut self) {
        *self = VirtualCell::default();
    }
}

impl Poolable for RenderBatch {
    fn reset(&mut self) {
        self.entries.clear();
        self.priority = RenderPriority::default();
        self.timestamp = Duration::ZERO;
    }

    fn retained_bytes(&self) -> usize {
        mem::size_of::<Self>() + self.entries.capacity() * mem::size_of::<BatchEntry>()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquisitions: u64,
    pub reuses: u64,
    pub fresh_allocations: u64,
    pub releases: u64,
    /// Released objects not retained because the pool was full or disabled.
    pub dropped: u64,
    pub idle: usize,
}

/// Bounded free list. Acquire never blocks: an empty pool allocates.
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    free: Vec<T>,
    seed: usize,
    cap: usize,
    enabled: bool,
    stats: PoolStats,
}

impl<T: Poolable> Pool<T> {
    pub fn seeded(seed: usize, cap: usize) -> Self {
        let cap = cap.max(seed);
        let mut pool = Self {
            free: Vec::with_capacity(seed),
            seed,
            cap,
            enabled: true,
            stats: PoolStats::default(),
        };
        pool.refill();
        pool
    }

    pub fn acquire(&mut self) -> T {
        self.stats.acquisitions += 1;
        match self.free.pop() {
            Some(item) => {
                self.stats.reuses += 1;
                self.stats.idle = self.free.len();
                item
            }
            None => {
                self.stats.fresh_allocations += 1;
                T::default()
            }
        }
    }

    pub fn release(&mut self, mut item: T) {
        self.stats.releases += 1;
        if !self.enabled || self.free.len() >= self.cap {
            self.stats.dropped += 1;
            return;
        }
        item.reset();
        self.free.push(item);
        self.stats.idle = self.free.len();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.refill();
        } else {
            self.drain();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drops idle objects above the seed size. Returns how many were dropped.
    pub fn trim_to_seed(&mut self) -> usize {
        if self.free.len() <= self.seed {
            return 0;
        }
        let dropped = self.free.len() - self.seed;
        self.free.truncate(self.seed);
        self.free.shrink_to(self.seed);
        self.stats.idle = self.free.len();
        dropped
    }

    pub fn drain(&mut self) {
        self.free.clear();
        self.free.shrink_to_fit();
        self.stats.idle = 0;
    }

    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn retained_bytes(&self) -> usize {
        self.free.iter().map(Poolable::retained_bytes).sum()
    }

    fn refill(&mut self) {
        while self.free.len() < self.seed {
            self.free.push(T::default());
        }
        self.stats.idle = self.free.len();
    }
}

/// Pools for the per-frame virtual cells and render batches.
#[derive(Debug)]
pub struct ObjectPoolManager {
    cells: Pool<VirtualCell>,
    batches: Pool<RenderBatch>,
}

impl Default for ObjectPoolManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ObjectPoolManager {
    pub fn new(enabled: bool) -> Self {
        let mut manager = Self {
            cells: Pool::seeded(CELL_POOL_SEED, CELL_POOL_CAP),
            batches: Pool::seeded(BATCH_POOL_SEED, BATCH_POOL_CAP),
        };
        manager.set_enabled(enabled);
        manager
    }

    pub fn acquire_cell(&mut self) -> VirtualCell {
        self.cells.acquire()
    }

    pub fn release_cell(&mut self, cell: VirtualCell) {
        self.cells.release(cell);
    }

    pub fn acquire_batch(&mut self) -> RenderBatch {
        self.batches.acquire()
    }

    /// Returns the batch and every cell it still holds.
    pub fn release_batch(&mut self, mut batch: RenderBatch) {
        for entry in batch.entries.drain(..) {
            self.cells.release(entry.cell);
        }
        self.batches.release(batch);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.cells.set_enabled(enabled);
        self.batches.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.cells.is_enabled()
    }

    pub fn trim_to_seed(&mut self) -> usize {
        let dropped = self.cells.trim_to_seed() + self.batches.trim_to_seed();
        if dropped > 0 {
            debug!(dropped, "object_pools_trimmed");
        }
        dropped
    }

    pub fn drain(&mut self) {
        self.cells.drain();
        self.batches.drain();
    }

    pub fn cell_stats(&self) -> PoolStats {
        self.cells.stats()
    }

    pub fn batch_stats(&self) -> PoolStats {
        self.batches.stats()
    }

    pub fn reuse_count(&self) -> u64 {
        self.cells.stats().reuses + self.batches.stats().reuses
    }

    pub fn retained_bytes(&self) -> usize {
        self.cells.retained_bytes() + self.batches.retained_bytes()
    }
}

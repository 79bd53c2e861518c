//! Per-update render cycle: visibility change, diff of the viewport, batch scheduling, batch
//! application and metrics, all driven from display-refresh callbacks.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::time::Duration;

use tracing::{debug, info};

use crate::camera::{Vec2, Viewport, ViewportCamera};
use crate::color::Rgb;
use crate::config::RenderConfig;
use crate::diff::{CellProvider, DirtyCell, VirtualGridDiffer};
use crate::grid::{CellType, GridPos, TerrainGrid};
use crate::metrics::{MetricsCollector, MetricsHandle, PerformanceMetrics};
use crate::pool::{LocalPos, ObjectPoolManager, PoolStats, VirtualCell};
use crate::schedule::{
    AdaptivePolicy, BatchOutcome, BatchReport, FrameHandle, FrameHost, FrameScheduler,
    PriorityHints,
};
use crate::surface::DisplaySurface;
use crate::theme::{
    ResolvedGlyph, TerrainThemeResolver, Theme, ThemeLoad, ThemeRegistry, VISIBLE_OPACITY,
};
use crate::visibility::{LightId, VisibilityEngine, VisibilityRecord, VisibilityUpdate};

/// An entity drawn over the terrain while its cell is currently visible.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: GridPos,
    pub glyph: char,
    pub color: Rgb,
    /// Batches the marker's cell ahead of everything else.
    pub high_priority: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Stale or cancelled handle, or the pipeline was torn down.
    Ignored,
    /// A cycle is pending but the throttle interval has not elapsed. Queued cells wait for it.
    Throttled,
    /// Diff ran; `first_batch` is its first batch when one was applied in the same callback.
    CycleScheduled {
        dirty: usize,
        first_batch: Option<BatchReport>,
    },
    BatchApplied(BatchReport),
    BatchSkipped,
    Idle,
}

pub struct RenderPipeline<H: FrameHost> {
    config: RenderConfig,
    terrain: TerrainGrid,
    obstacles: HashSet<GridPos>,
    visibility: VisibilityEngine,
    camera: ViewportCamera,
    theme: Theme,
    resolver: TerrainThemeResolver,
    markers: Vec<Marker>,
    pool: ObjectPoolManager,
    differ: VirtualGridDiffer,
    scheduler: FrameScheduler<H>,
    metrics: MetricsCollector,
    cycle_requested: bool,
    torn_down: bool,
}

impl<H: FrameHost> RenderPipeline<H> {
    pub fn new(
        host: H,
        terrain: TerrainGrid,
        viewport_width: u32,
        viewport_height: u32,
        theme: Theme,
        config: RenderConfig,
    ) -> Self {
        let config = config.normalized();
        let policy = AdaptivePolicy::new(
            config.frame_target_ms,
            config.max_batch_size,
            config.adaptive_frame_rate,
        );
        info!(
            world_width = terrain.width(),
            world_height = terrain.height(),
            viewport_width,
            viewport_height,
            theme = theme.name(),
            max_batch_size = config.max_batch_size,
            frame_target_ms = config.frame_target_ms,
            "render_pipeline_created"
        );
        let mut pipeline = Self {
            visibility: VisibilityEngine::new(terrain.width(), terrain.height()),
            camera: ViewportCamera::new(
                viewport_width,
                viewport_height,
                terrain.width(),
                terrain.height(),
            ),
            obstacles: terrain.sight_obstacles(),
            terrain,
            theme,
            resolver: TerrainThemeResolver::default(),
            markers: Vec::new(),
            pool: ObjectPoolManager::new(config.enable_object_pooling),
            differ: VirtualGridDiffer::new(config.enable_virtual_dom),
            scheduler: FrameScheduler::new(host, policy),
            metrics: MetricsCollector::default(),
            cycle_requested: false,
            torn_down: false,
            config,
        };
        pipeline.refresh_metrics();
        pipeline
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    /// Direct access for snapshot import and similar bulk edits. Call [`Self::request_render`]
    /// afterwards.
    pub fn visibility_mut(&mut self) -> &mut VisibilityEngine {
        &mut self.visibility
    }

    pub fn camera(&self) -> &ViewportCamera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.camera.viewport()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn host(&self) -> &H {
        self.scheduler.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.scheduler.host_mut()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.scheduler.pending_frame()
    }

    pub fn queued_cells(&self) -> usize {
        self.scheduler.queued_cells()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Nothing requested and nothing queued.
    pub fn is_idle(&self) -> bool {
        !self.cycle_requested && !self.scheduler.has_queued()
    }

    pub fn cell_pool_stats(&self) -> PoolStats {
        self.pool.cell_stats()
    }

    pub fn batch_pool_stats(&self) -> PoolStats {
        self.pool.batch_stats()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    pub fn metrics_handle(&self) -> MetricsHandle {
        self.metrics.handle()
    }

    /// Recomputes visibility from `origin` and starts a new render cycle.
    pub fn update_visibility(
        &mut self,
        origin: GridPos,
        range: i32,
        obstacles: &HashSet<GridPos>,
    ) -> VisibilityUpdate {
        let update = self
            .visibility
            .update_visibility(origin, range, obstacles, &self.terrain);
        self.request_render();
        update
    }

    /// [`Self::update_visibility`] with the terrain's own sight blockers as obstacles.
    pub fn reveal_from(&mut self, origin: GridPos, range: i32) -> VisibilityUpdate {
        let update =
            self.visibility
                .update_visibility(origin, range, &self.obstacles, &self.terrain);
        self.request_render();
        update
    }

    /// Takes effect at the next visibility update.
    pub fn add_light_source(&mut self, position: GridPos) -> LightId {
        self.visibility.add_light_source(position)
    }

    pub fn remove_light_source(&mut self, id: LightId) -> bool {
        self.visibility.remove_light_source(id)
    }

    /// Resets exploration and replaces the terrain with an empty grid of the new size.
    pub fn set_map_dimensions(&mut self, width: u32, height: u32) {
        self.load_world(TerrainGrid::filled(width, height, CellType::Void));
    }

    pub fn load_world(&mut self, terrain: TerrainGrid) {
        self.visibility
            .set_map_dimensions(terrain.width(), terrain.height());
        self.camera.set_world_size(terrain.width(), terrain.height());
        self.obstacles = terrain.sight_obstacles();
        self.terrain = terrain;
        self.differ.invalidate();
        self.request_render();
    }

    pub fn set_camera_target(&mut self, pos: Vec2, follow: bool) {
        let before = self.camera.viewport();
        self.camera.set_target(pos, follow);
        if self.camera.viewport() != before {
            self.request_render();
        }
    }

    pub fn set_camera_position(&mut self, pos: Vec2) {
        let before = self.camera.viewport();
        self.camera.set_position(pos);
        if self.camera.viewport() != before {
            self.request_render();
        }
    }

    pub fn set_camera_smoothing(&mut self, smoothing: f32) {
        self.camera.set_smoothing(smoothing);
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.camera.set_viewport_size(width, height);
        self.request_render();
    }

    /// Advances camera following. Starts a cycle only when the integer viewport moved.
    pub fn tick(&mut self, ticks: u32) -> bool {
        let before = self.camera.viewport();
        self.camera.update(ticks);
        let moved = self.camera.viewport() != before;
        if moved {
            self.request_render();
        }
        moved
    }

    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        if markers != self.markers {
            self.markers = markers;
            self.request_render();
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if theme == self.theme {
            return;
        }
        info!(from = self.theme.name(), to = theme.name(), "theme_changed");
        self.theme = theme;
        self.request_render();
    }

    /// Picks up a reloaded definition of the active theme. A replaced definition repaints every
    /// viewport cell; unchanged or unrelated loads leave the pipeline alone.
    pub fn apply_theme_reload(
        &mut self,
        registry: &ThemeRegistry,
        loads: &[(String, ThemeLoad)],
    ) -> bool {
        let replaced = loads
            .iter()
            .any(|(name, load)| *load == ThemeLoad::Replaced && name == self.theme.name());
        if !replaced {
            return false;
        }
        let Some(theme) = registry.get(self.theme.name()).cloned() else {
            return false;
        };
        info!(theme = theme.name(), "active_theme_reloaded");
        self.theme = theme;
        self.invalidate();
        true
    }

    /// Applies a new configuration between callbacks. Queued cells keep their partitioning.
    pub fn set_config(&mut self, config: RenderConfig) {
        let config = config.normalized();
        self.scheduler.reconfigure(
            config.frame_target_ms,
            config.max_batch_size,
            config.adaptive_frame_rate,
        );
        self.pool.set_enabled(config.enable_object_pooling);
        if config.enable_virtual_dom != self.differ.is_enabled() {
            self.differ.set_enabled(config.enable_virtual_dom);
            self.request_render();
        }
        info!(
            max_batch_size = config.max_batch_size,
            frame_target_ms = config.frame_target_ms,
            enable_virtual_dom = config.enable_virtual_dom,
            enable_object_pooling = config.enable_object_pooling,
            adaptive_frame_rate = config.adaptive_frame_rate,
            memory_management = config.memory_management,
            "render_config_applied"
        );
        self.config = config;
        self.refresh_metrics();
    }

    /// Forces the next cycle to repaint every viewport cell.
    pub fn invalidate(&mut self) {
        self.differ.invalidate();
        self.request_render();
    }

    /// Asks for a render cycle on the next accepted frame. Repeated requests coalesce.
    pub fn request_render(&mut self) {
        if self.torn_down {
            return;
        }
        self.cycle_requested = true;
        self.scheduler.ensure_frame();
    }

    /// Display-refresh callback; applies at most one batch. A requested cycle diffs, schedules
    /// and applies its first batch in the same callback. While a requested cycle waits out the
    /// throttle, no batch runs.
    pub fn on_frame(
        &mut self,
        handle: FrameHandle,
        surface: &mut dyn DisplaySurface,
    ) -> FrameOutcome {
        if self.torn_down || !self.scheduler.accept_frame(handle) {
            return FrameOutcome::Ignored;
        }
        let now = self.scheduler.now();
        self.metrics.record_frame(now);

        let outcome = if self.cycle_requested {
            if self.scheduler.is_throttled(now) {
                FrameOutcome::Throttled
            } else {
                let dirty = self.run_cycle(now);
                let first_batch = match self.run_batch(surface) {
                    BatchOutcome::Applied(report) => Some(report),
                    BatchOutcome::Skipped | BatchOutcome::Idle => None,
                };
                FrameOutcome::CycleScheduled { dirty, first_batch }
            }
        } else {
            match self.run_batch(surface) {
                BatchOutcome::Applied(report) => FrameOutcome::BatchApplied(report),
                BatchOutcome::Skipped => FrameOutcome::BatchSkipped,
                BatchOutcome::Idle => FrameOutcome::Idle,
            }
        };

        self.refresh_metrics();
        self.metrics.maybe_log_summary(now);
        if self.cycle_requested || self.scheduler.has_queued() {
            self.scheduler.ensure_frame();
        } else {
            self.scheduler.cancel_pending();
        }
        outcome
    }

    /// Cancels pending work and drains every pool and cache. Later calls are no-ops.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.scheduler.clear(&mut self.pool);
        self.differ.reset(&mut self.pool);
        self.pool.drain();
        self.markers.clear();
        self.cycle_requested = false;
        self.torn_down = true;
        self.refresh_metrics();
        info!(
            batches = self.metrics.snapshot().batch_count,
            diffs = self.metrics.snapshot().diff_count,
            "render_pipeline_torn_down"
        );
    }

    fn run_batch(&mut self, surface: &mut dyn DisplaySurface) -> BatchOutcome {
        let outcome = self.scheduler.run_next_batch(surface, &mut self.pool);
        match &outcome {
            BatchOutcome::Applied(report) => {
                self.metrics.record_batch(report);
                if report.remaining == 0 && self.config.memory_management {
                    self.pool.trim_to_seed();
                }
            }
            BatchOutcome::Skipped => self.metrics.record_skipped_frame(),
            BatchOutcome::Idle => {}
        }
        outcome
    }

    /// Returns the dirty count.
    fn run_cycle(&mut self, now: Duration) -> usize {
        self.cycle_requested = false;
        self.scheduler.mark_cycle(now);

        let viewport = self.camera.viewport();
        let markers: HashMap<GridPos, &Marker> = self
            .markers
            .iter()
            .map(|marker| (marker.position, marker))
            .collect();
        let provider = WorldCells {
            terrain: &self.terrain,
            visibility: &self.visibility,
            theme: &self.theme,
            resolver: &self.resolver,
            markers: &markers,
            origin_x: viewport.origin_x,
            origin_y: viewport.origin_y,
        };
        let diff = self.differ.diff(&viewport, &provider, &mut self.pool);
        self.metrics.record_diff(&diff);

        let mut hints = PriorityHints::default();
        for marker in self.markers.iter().filter(|marker| marker.high_priority) {
            if let Some(local) = local_pos(&viewport, marker.position) {
                hints.high.insert(local);
            }
        }

        let dirty = diff.dirty.len();
        let queued = self
            .scheduler
            .schedule_render(diff.dirty, &hints, &mut self.pool);
        debug!(
            dirty,
            queued,
            origin_x = viewport.origin_x,
            origin_y = viewport.origin_y,
            "render_cycle"
        );
        dirty
    }

    fn refresh_metrics(&mut self) {
        let policy = self.scheduler.policy();
        self.metrics
            .record_adaptive_state(policy.batch_size(), policy.throttle_ms());
        let generation_bytes = if self.torn_down {
            0
        } else {
            self.camera.viewport().cell_count() * mem::size_of::<VirtualCell>()
        };
        let bytes = self.pool.retained_bytes()
            + generation_bytes
            + self.scheduler.queued_cells() * mem::size_of::<DirtyCell>()
            + self.visibility.width() as usize
                * self.visibility.height() as usize
                * mem::size_of::<VisibilityRecord>();
        self.metrics.record_memory(bytes, self.pool.reuse_count());
        self.metrics.publish();
    }
}

fn local_pos(viewport: &Viewport, pos: GridPos) -> Option<LocalPos> {
    let x = pos.x - viewport.origin_x;
    let y = pos.y - viewport.origin_y;
    if x < 0 || y < 0 || x as u32 >= viewport.width || y as u32 >= viewport.height {
        return None;
    }
    Some(LocalPos::new(x as u32, y as u32))
}

/// Cell provider composed from terrain, visibility, theme and entity markers.
struct WorldCells<'a> {
    terrain: &'a TerrainGrid,
    visibility: &'a VisibilityEngine,
    theme: &'a Theme,
    resolver: &'a TerrainThemeResolver,
    markers: &'a HashMap<GridPos, &'a Marker>,
    origin_x: i32,
    origin_y: i32,
}

impl CellProvider for WorldCells<'_> {
    fn cell(&self, x: u32, y: u32) -> ResolvedGlyph {
        let pos = GridPos::new(self.origin_x + x as i32, self.origin_y + y as i32);
        let record = self.visibility.record(pos).copied().unwrap_or_default();
        if record.currently_visible {
            if let Some(marker) = self.markers.get(&pos) {
                return ResolvedGlyph::new(marker.glyph, marker.color, VISIBLE_OPACITY);
            }
        }
        let terrain = self.terrain.cell_at(pos).unwrap_or_default();
        self.resolver.resolve_record(terrain, &record, self.theme)
    }
}

pub mod camera;
pub mod color;
pub mod config;
pub mod diff;
pub mod grid;
pub mod metrics;
pub mod pipeline;
pub mod pool;
pub mod schedule;
pub mod surface;
pub mod theme;
pub mod visibility;

pub use camera::{CameraBounds, CameraState, Vec2, Viewport, ViewportCamera};
pub use color::{ColorParseError, Rgb};
pub use config::RenderConfig;
pub use diff::{CellProvider, DiffResult, DirtyCell, VirtualGridDiffer};
pub use grid::{CellType, GridPos, TerrainGrid, TerrainGridError, CELL_TYPE_COUNT};
pub use metrics::{MetricsCollector, MetricsHandle, PerformanceMetrics};
pub use pipeline::{FrameOutcome, Marker, RenderPipeline};
pub use pool::{
    BatchEntry, LocalPos, ObjectPoolManager, PoolStats, RenderBatch, RenderPriority, VirtualCell,
};
pub use schedule::{
    AdaptivePolicy, BatchOutcome, BatchReport, FrameHandle, FrameHost, FrameScheduler,
    ManualFrameHost, PriorityHints, SystemFrameHost,
};
pub use surface::{DisplayHandle, DisplaySurface, GridSurface, SurfaceCell};
pub use theme::{
    ResolvedGlyph, TerrainThemeResolver, Theme, ThemeError, ThemeLoad, ThemeRegistry,
};
pub use visibility::{
    ExplorationError, ExplorationSnapshot, LightId, LightLevel, VisibilityEngine, VisibilityRecord,
    VisibilityState, VisibilityUpdate,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schedule::{
    DEFAULT_FRAME_TARGET_MS, DEFAULT_MAX_BATCH_SIZE, MAX_BATCH_SIZE_CEILING, MIN_BATCH_SIZE,
};

pub const FRAME_TARGET_MIN_MS: f32 = 4.0;
pub const FRAME_TARGET_MAX_MS: f32 = 100.0;

/// Runtime switches for the render pipeline. Safe to replace at any time through
/// `RenderPipeline::set_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub max_batch_size: usize,
    pub frame_target_ms: f32,
    pub enable_virtual_dom: bool,
    pub enable_object_pooling: bool,
    pub adaptive_frame_rate: bool,
    pub memory_management: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            frame_target_ms: DEFAULT_FRAME_TARGET_MS,
            enable_virtual_dom: true,
            enable_object_pooling: true,
            adaptive_frame_rate: true,
            memory_management: true,
        }
    }
}

impl RenderConfig {
    /// Clamps out-of-range values to the nearest valid bound, warning once per clamped field.
    pub fn normalized(&self) -> Self {
        Self {
            max_batch_size: normalize_max_batch_size(self.max_batch_size),
            frame_target_ms: normalize_frame_target_ms(self.frame_target_ms),
            ..self.clone()
        }
    }
}

fn normalize_max_batch_size(value: usize) -> usize {
    let clamped = value.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE_CEILING);
    if clamped != value {
        warn!(
            field = "max_batch_size",
            value,
            clamped,
            "render config value clamped"
        );
    }
    clamped
}

fn normalize_frame_target_ms(value: f32) -> f32 {
    if !value.is_finite() {
        warn!(
            field = "frame_target_ms",
            value,
            clamped = DEFAULT_FRAME_TARGET_MS,
            "render config value not finite; using default"
        );
        return DEFAULT_FRAME_TARGET_MS;
    }
    let clamped = value.clamp(FRAME_TARGET_MIN_MS, FRAME_TARGET_MAX_MS);
    if clamped != value {
        warn!(
            field = "frame_target_ms",
            value,
            clamped,
            "render config value clamped"
        );
    }
    clamped
}

use tracing::debug;

use crate::grid::GridPos;

pub const CAMERA_SMOOTHING_DEFAULT: f32 = 0.15;
pub const CAMERA_SMOOTHING_MIN: f32 = 0.01;
pub const CAMERA_SMOOTHING_MAX: f32 = 1.0;
pub const CAMERA_SNAP_DISTANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<GridPos> for Vec2 {
    fn from(pos: GridPos) -> Self {
        Self::new(pos.x as f32, pos.y as f32)
    }
}

/// Integer window into the world grid, in world cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Following,
}

/// Floating camera centred on `position`, clamped so the viewport never leaves the world.
#[derive(Debug, Clone)]
pub struct ViewportCamera {
    position: Vec2,
    target: Option<Vec2>,
    smoothing: f32,
    world_width: u32,
    world_height: u32,
    viewport_width: u32,
    viewport_height: u32,
    bounds: CameraBounds,
}

impl ViewportCamera {
    pub fn new(viewport_width: u32, viewport_height: u32, world_width: u32, world_height: u32) -> Self {
        let mut camera = Self {
            position: Vec2::default(),
            target: None,
            smoothing: CAMERA_SMOOTHING_DEFAULT,
            world_width,
            world_height,
            viewport_width,
            viewport_height,
            bounds: CameraBounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 0.0,
                max_y: 0.0,
            },
        };
        camera.recompute_bounds();
        camera
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn bounds(&self) -> CameraBounds {
        self.bounds
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn state(&self) -> CameraState {
        if self.target.is_some() {
            CameraState::Following
        } else {
            CameraState::Idle
        }
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = clamp_smoothing(smoothing);
    }

    /// `follow = false` jumps straight to `pos` and leaves the camera idle.
    pub fn set_target(&mut self, pos: Vec2, follow: bool) {
        if follow {
            self.target = Some(pos);
        } else {
            self.target = None;
            self.set_position(pos);
        }
    }

    pub fn set_position(&mut self, pos: Vec2) {
        self.position = self.clamp(pos);
    }

    /// Advances following by `ticks` smoothing steps. Returns whether the position moved.
    pub fn update(&mut self, ticks: u32) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let goal = self.clamp(target);
        let before = self.position;
        for _ in 0..ticks {
            let dx = goal.x - self.position.x;
            let dy = goal.y - self.position.y;
            if dx.abs() <= CAMERA_SNAP_DISTANCE && dy.abs() <= CAMERA_SNAP_DISTANCE {
                self.position = goal;
                break;
            }
            self.position = self.clamp(Vec2::new(
                self.position.x + dx * self.smoothing,
                self.position.y + dy * self.smoothing,
            ));
        }
        before != self.position
    }

    pub fn viewport(&self) -> Viewport {
        let origin = |position: f32, extent: u32, world: u32| {
            let max_origin = world.saturating_sub(extent) as i32;
            let raw = (position - extent as f32 / 2.0).floor() as i32;
            raw.clamp(0, max_origin)
        };
        Viewport {
            origin_x: origin(self.position.x, self.viewport_width, self.world_width),
            origin_y: origin(self.position.y, self.viewport_height, self.world_height),
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.recompute_bounds();
    }

    pub fn set_world_size(&mut self, width: u32, height: u32) {
        self.world_width = width;
        self.world_height = height;
        self.recompute_bounds();
    }

    pub fn world_to_local(&self, pos: GridPos) -> Option<(u32, u32)> {
        let viewport = self.viewport();
        let x = pos.x - viewport.origin_x;
        let y = pos.y - viewport.origin_y;
        if x < 0 || y < 0 || x as u32 >= viewport.width || y as u32 >= viewport.height {
            return None;
        }
        Some((x as u32, y as u32))
    }

    pub fn local_to_world(&self, x: u32, y: u32) -> GridPos {
        let viewport = self.viewport();
        GridPos::new(viewport.origin_x + x as i32, viewport.origin_y + y as i32)
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.world_to_local(pos).is_some()
    }

    fn recompute_bounds(&mut self) {
        let axis = |world: u32, extent: u32| {
            let half = extent as f32 / 2.0;
            let world = world as f32;
            if world <= extent as f32 {
                (world / 2.0, world / 2.0)
            } else {
                (half, world - half)
            }
        };
        let (min_x, max_x) = axis(self.world_width, self.viewport_width);
        let (min_y, max_y) = axis(self.world_height, self.viewport_height);
        self.bounds = CameraBounds {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        self.position = self.clamp(self.position);
        debug!(min_x, min_y, max_x, max_y, "camera_bounds_updated");
    }

    fn clamp(&self, pos: Vec2) -> Vec2 {
        let axis = |value: f32, min: f32, max: f32| {
            if value.is_finite() {
                value.clamp(min, max)
            } else {
                min
            }
        };
        Vec2::new(
            axis(pos.x, self.bounds.min_x, self.bounds.max_x),
            axis(pos.y, self.bounds.min_y, self.bounds.max_y),
        )
    }
}

fn clamp_smoothing(smoothing: f32) -> f32 {
    if !smoothing.is_finite() {
        return CAMERA_SMOOTHING_DEFAULT;
    }
    smoothing.clamp(CAMERA_SMOOTHING_MIN, CAMERA_SMOOTHING_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_target_keeps_full_window_inside_world() {
        let mut camera = ViewportCamera::new(60, 20, 200, 100);
        camera.set_target(Vec2::new(150.0, 90.0), false);

        let viewport = camera.viewport();
        assert_eq!(viewport.origin_x, 120);
        assert_eq!(viewport.origin_y, 80);
        assert!(viewport.origin_x >= 0 && viewport.origin_x + 60 <= 200);
        assert!(viewport.origin_y >= 0 && viewport.origin_y + 20 <= 100);
    }

    #[test]
    fn following_converges_to_clamped_target_without_overshoot() {
        let mut camera = ViewportCamera::new(60, 20, 200, 100);
        camera.set_position(Vec2::new(100.0, 50.0));
        camera.set_target(Vec2::new(500.0, -40.0), true);
        let bounds = camera.bounds();

        for _ in 0..400 {
            camera.update(1);
            let pos = camera.position();
            assert!(pos.x >= bounds.min_x && pos.x <= bounds.max_x);
            assert!(pos.y >= bounds.min_y && pos.y <= bounds.max_y);
        }
        assert_eq!(camera.position(), Vec2::new(bounds.max_x, bounds.min_y));
        assert!(!camera.update(1));
    }

    #[test]
    fn following_moves_by_smoothing_fraction() {
        let mut camera = ViewportCamera::new(10, 10, 100, 100);
        camera.set_smoothing(0.5);
        camera.set_position(Vec2::new(20.0, 20.0));
        camera.set_target(Vec2::new(40.0, 20.0), true);

        assert!(camera.update(1));
        assert_eq!(camera.position(), Vec2::new(30.0, 20.0));
        camera.update(1);
        assert_eq!(camera.position(), Vec2::new(35.0, 20.0));
        assert_eq!(camera.state(), CameraState::Following);
    }

    #[test]
    fn idle_camera_ignores_updates() {
        let mut camera = ViewportCamera::new(10, 10, 100, 100);
        camera.set_position(Vec2::new(50.0, 50.0));
        assert_eq!(camera.state(), CameraState::Idle);
        assert!(!camera.update(10));
        assert_eq!(camera.position(), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn world_smaller_than_viewport_pins_origin_at_zero() {
        let camera = ViewportCamera::new(60, 20, 30, 10);
        let viewport = camera.viewport();
        assert_eq!((viewport.origin_x, viewport.origin_y), (0, 0));
    }

    #[test]
    fn local_and_world_coordinates_round_trip() {
        let mut camera = ViewportCamera::new(10, 6, 100, 100);
        camera.set_position(Vec2::new(50.0, 50.0));
        let world = camera.local_to_world(3, 2);
        assert_eq!(world, GridPos::new(48, 49));
        assert_eq!(camera.world_to_local(world), Some((3, 2)));
        assert!(!camera.contains(GridPos::new(44, 50)));
        assert!(camera.contains(GridPos::new(45, 47)));
    }

    #[test]
    fn smoothing_is_clamped() {
        let mut camera = ViewportCamera::new(10, 10, 100, 100);
        camera.set_smoothing(7.0);
        assert_eq!(camera.smoothing(), 1.0);
        camera.set_smoothing(-1.0);
        assert_eq!(camera.smoothing(), CAMERA_SMOOTHING_MIN);
        camera.set_smoothing(f32::NAN);
        assert_eq!(camera.smoothing(), CAMERA_SMOOTHING_DEFAULT);
    }

    #[test]
    fn shrinking_world_reclamps_position() {
        let mut camera = ViewportCamera::new(10, 10, 100, 100);
        camera.set_position(Vec2::new(90.0, 90.0));
        camera.set_world_size(40, 40);
        assert_eq!(camera.position(), Vec2::new(35.0, 35.0));
    }
}

use std::collections::HashSet;

use crate::grid::GridPos;

pub const RAY_ANGLE_STEP_DEGREES: f32 = 0.5;
const RAY_COUNT: u32 = (360.0 / RAY_ANGLE_STEP_DEGREES) as u32;

/// Casts rays outward from `origin` at a fixed angular step and returns every cell touched,
/// deduplicated, in first-touch order.
///
/// Each ray samples unit steps up to `range` and rounds to grid coordinates. A ray stops when it
/// leaves the map, or right after touching a blocking cell. The origin never blocks.
pub(crate) fn cast_rays(
    origin: GridPos,
    range: i32,
    in_bounds: impl Fn(GridPos) -> bool,
    blocks: impl Fn(GridPos) -> bool,
) -> Vec<GridPos> {
    let mut seen = HashSet::new();
    let mut touched = Vec::new();
    if !in_bounds(origin) {
        return touched;
    }
    seen.insert(origin);
    touched.push(origin);
    if range <= 0 {
        return touched;
    }

    for ray in 0..RAY_COUNT {
        let angle = (ray as f32 * RAY_ANGLE_STEP_DEGREES).to_radians();
        let (dy, dx) = angle.sin_cos();
        for step in 1..=range {
            let distance = step as f32;
            let pos = GridPos::new(
                (origin.x as f32 + dx * distance).round() as i32,
                (origin.y as f32 + dy * distance).round() as i32,
            );
            if !in_bounds(pos) {
                break;
            }
            if seen.insert(pos) {
                touched.push(pos);
            }
            if pos != origin && blocks(pos) {
                break;
            }
        }
    }
    touched
}

//! Two-generation cache-and-diff over the viewport grid.

use std::mem;

use tracing::debug;

use crate::camera::Viewport;
use crate::pool::{LocalPos, ObjectPoolManager, VirtualCell};
use crate::theme::ResolvedGlyph;

/// Opaque per-coordinate data source, addressed in viewport-local cells.
pub trait CellProvider {
    fn cell(&self, x: u32, y: u32) -> ResolvedGlyph;
}

impl<F> CellProvider for F
where
    F: Fn(u32, u32) -> ResolvedGlyph,
{
    fn cell(&self, x: u32, y: u32) -> ResolvedGlyph {
        self(x, y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirtyCell {
    pub pos: LocalPos,
    pub cell: VirtualCell,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub dirty: Vec<DirtyCell>,
    pub compared: usize,
    pub unchanged: usize,
}

impl DiffResult {
    pub fn count(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }
}

#[derive(Debug, Default)]
struct Generation {
    width: u32,
    height: u32,
    cells: Vec<VirtualCell>,
}

impl Generation {
    fn get(&self, x: u32, y: u32, width: u32, height: u32) -> Option<&VirtualCell> {
        if self.width != width || self.height != height {
            return None;
        }
        self.cells.get(y as usize * width as usize + x as usize)
    }
}

#[derive(Debug)]
pub struct VirtualGridDiffer {
    previous: Option<Generation>,
    enabled: bool,
    force_full: bool,
    passes: u64,
}

impl Default for VirtualGridDiffer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VirtualGridDiffer {
    /// A disabled differ reports every viewport cell as dirty on every pass.
    pub fn new(enabled: bool) -> Self {
        Self {
            previous: None,
            enabled,
            force_full: false,
            passes: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Makes the next pass treat every cell as changed.
    pub fn invalidate(&mut self) {
        self.force_full = true;
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn previous_cell(&self, pos: LocalPos) -> Option<&VirtualCell> {
        let previous = self.previous.as_ref()?;
        if pos.x >= previous.width || pos.y >= previous.height {
            return None;
        }
        previous.get(pos.x, pos.y, previous.width, previous.height)
    }

    /// Builds the next generation from `provider`, compares it with the previous one and then
    /// replaces the previous generation as a whole.
    pub fn diff(
        &mut self,
        viewport: &Viewport,
        provider: &dyn CellProvider,
        pool: &mut ObjectPoolManager,
    ) -> DiffResult {
        let width = viewport.width;
        let height = viewport.height;
        let compare = self.enabled && !self.force_full;
        let mut next = Generation {
            width,
            height,
            cells: Vec::with_capacity(viewport.cell_count()),
        };
        let mut result = DiffResult::default();

        for y in 0..height {
            for x in 0..width {
                let resolved = provider.cell(x, y);
                let mut cell = pool.acquire_cell();
                cell.glyph = resolved.glyph;
                cell.color = resolved.color;
                cell.opacity = resolved.opacity;

                let unchanged = compare
                    && self
                        .previous
                        .as_ref()
                        .and_then(|previous| previous.get(x, y, width, height))
                        .is_some_and(|previous| previous.same_contents(&cell));
                result.compared += 1;
                if unchanged {
                    result.unchanged += 1;
                } else {
                    cell.dirty = true;
                    let mut copy = pool.acquire_cell();
                    copy.clone_from(&cell);
                    result.dirty.push(DirtyCell {
                        pos: LocalPos::new(x, y),
                        cell: copy,
                    });
                }
                next.cells.push(cell);
            }
        }

        if let Some(previous) = self.previous.replace(next) {
            release_generation(previous, pool);
        }
        self.force_full = false;
        self.passes += 1;

        debug!(
            origin_x = viewport.origin_x,
            origin_y = viewport.origin_y,
            compared = result.compared,
            dirty = result.count(),
            unchanged = result.unchanged,
            "viewport_diffed"
        );
        result
    }

    /// Forgets the previous generation, returning its cells to `pool`.
    pub fn reset(&mut self, pool: &mut ObjectPoolManager) {
        if let Some(previous) = self.previous.take() {
            release_generation(previous, pool);
        }
        self.force_full = false;
    }
}

fn release_generation(mut generation: Generation, pool: &mut ObjectPoolManager) {
    for cell in mem::take(&mut generation.cells) {
        pool.release_cell(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    const GREY: Rgb = Rgb::new(0x80, 0x80, 0x80);

    fn viewport(width: u32, height: u32) -> Viewport {
        Viewport {
            origin_x: 0,
            origin_y: 0,
            width,
            height,
        }
    }

    fn walls(_x: u32, _y: u32) -> ResolvedGlyph {
        ResolvedGlyph::new('#', GREY, 1.0)
    }

    #[test]
    fn second_pass_without_changes_is_empty() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::default();
        let first = differ.diff(&viewport(10, 10), &walls, &mut pool);
        assert_eq!(first.count(), 100);
        assert!(first.dirty.iter().all(|dirty| dirty.cell.dirty));

        let second = differ.diff(&viewport(10, 10), &walls, &mut pool);
        assert!(second.is_empty());
        assert_eq!(second.unchanged, 100);
        assert_eq!(differ.passes(), 2);
    }

    #[test]
    fn stable_wall_cell_is_not_redrawn() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::default();
        let provider = |x: u32, y: u32| {
            if (x, y) == (5, 5) {
                ResolvedGlyph::new('#', GREY, 1.0)
            } else {
                ResolvedGlyph::new('.', GREY, 0.6)
            }
        };
        differ.diff(&viewport(8, 8), &provider, &mut pool);
        let frame_two = differ.diff(&viewport(8, 8), &provider, &mut pool);
        assert!(frame_two
            .dirty
            .iter()
            .all(|dirty| dirty.pos != LocalPos::new(5, 5)));
    }

    #[test]
    fn only_changed_fields_mark_cells_dirty() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::default();
        differ.diff(&viewport(4, 4), &walls, &mut pool);

        let dimmed = |x: u32, y: u32| {
            if (x, y) == (2, 1) {
                ResolvedGlyph::new('#', GREY, 0.6)
            } else {
                walls(x, y)
            }
        };
        let result = differ.diff(&viewport(4, 4), &dimmed, &mut pool);
        assert_eq!(result.count(), 1);
        assert_eq!(result.dirty[0].pos, LocalPos::new(2, 1));
        assert_eq!(result.dirty[0].cell.opacity, 0.6);
        assert_eq!(
            differ.previous_cell(LocalPos::new(2, 1)).map(|cell| cell.opacity),
            Some(0.6)
        );
    }

    #[test]
    fn resized_viewport_is_fully_dirty() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::default();
        differ.diff(&viewport(4, 4), &walls, &mut pool);
        let result = differ.diff(&viewport(5, 4), &walls, &mut pool);
        assert_eq!(result.count(), 20);
    }

    #[test]
    fn invalidate_forces_one_full_pass() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::default();
        differ.diff(&viewport(3, 3), &walls, &mut pool);
        differ.invalidate();
        assert_eq!(differ.diff(&viewport(3, 3), &walls, &mut pool).count(), 9);
        assert_eq!(differ.diff(&viewport(3, 3), &walls, &mut pool).count(), 0);
    }

    #[test]
    fn disabled_differ_reports_everything() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::new(false);
        differ.diff(&viewport(3, 3), &walls, &mut pool);
        assert_eq!(differ.diff(&viewport(3, 3), &walls, &mut pool).count(), 9);
    }

    #[test]
    fn previous_generation_cells_return_to_pool() {
        let mut pool = ObjectPoolManager::default();
        let mut differ = VirtualGridDiffer::default();
        differ.diff(&viewport(10, 10), &walls, &mut pool);
        differ.diff(&viewport(10, 10), &walls, &mut pool);
        assert!(pool.cell_stats().releases >= 100);

        differ.reset(&mut pool);
        assert!(differ.previous_cell(LocalPos::new(0, 0)).is_none());
        assert_eq!(differ.diff(&viewport(10, 10), &walls, &mut pool).count(), 100);
    }
}

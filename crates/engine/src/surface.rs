//! Display handle boundary and an in-memory reference surface.

use crate::color::Rgb;

/// One addressable cell of a concrete display.
pub trait DisplayHandle {
    fn glyph(&self) -> char;
    fn set_glyph(&mut self, glyph: char);
    fn color(&self) -> Rgb;
    fn set_color(&mut self, color: Rgb);
    fn opacity(&self) -> f32;
    fn set_opacity(&mut self, opacity: f32);
}

/// Resolves viewport-local coordinates to display handles. `None` means the handle is missing
/// or stale, e.g. after a resize.
pub trait DisplaySurface {
    fn handle_mut(&mut self, x: u32, y: u32) -> Option<&mut dyn DisplayHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceCell {
    pub glyph: char,
    pub color: Rgb,
    pub opacity: f32,
}

impl Default for SurfaceCell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            color: Rgb::BLACK,
            opacity: 0.0,
        }
    }
}

impl DisplayHandle for SurfaceCell {
    fn glyph(&self) -> char {
        self.glyph
    }

    fn set_glyph(&mut self, glyph: char) {
        self.glyph = glyph;
    }

    fn color(&self) -> Rgb {
        self.color
    }

    fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }
}

/// Grid of character cells. Counts handle lookups that resolved so callers can tell how much
/// the surface was touched.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSurface {
    width: u32,
    height: u32,
    cells: Vec<SurfaceCell>,
    lookups: u64,
}

impl GridSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![SurfaceCell::default(); width as usize * height as usize],
            lookups: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Preserves cells that stay in range; new cells start blank.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        let mut cells = vec![SurfaceCell::default(); width as usize * height as usize];
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                cells[y as usize * width as usize + x as usize] =
                    self.cells[y as usize * self.width as usize + x as usize];
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
    }

    pub fn get(&self, x: u32, y: u32) -> Option<SurfaceCell> {
        self.idx(x, y).map(|i| self.cells[i])
    }

    pub fn set(&mut self, x: u32, y: u32, cell: SurfaceCell) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = cell;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(SurfaceCell::default());
    }

    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Glyphs row by row, trailing spaces kept.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1) as usize)
            .map(|row| row.iter().map(|cell| cell.glyph).collect())
            .collect()
    }

    fn idx(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

impl DisplaySurface for GridSurface {
    fn handle_mut(&mut self, x: u32, y: u32) -> Option<&mut dyn DisplayHandle> {
        let index = self.idx(x, y)?;
        self.lookups += 1;
        Some(&mut self.cells[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_handles_are_missing() {
        let mut surface = GridSurface::new(3, 2);
        assert!(surface.handle_mut(3, 0).is_none());
        assert!(surface.handle_mut(0, 2).is_none());
        assert!(surface.handle_mut(2, 1).is_some());
        assert_eq!(surface.lookups(), 1);
    }

    #[test]
    fn handle_writes_land_in_grid() {
        let mut surface = GridSurface::new(3, 2);
        if let Some(handle) = surface.handle_mut(1, 1) {
            handle.set_glyph('#');
            handle.set_color(Rgb::new(128, 128, 128));
            handle.set_opacity(1.0);
        }
        assert_eq!(surface.rows(), vec!["   ", " # "]);
        assert_eq!(surface.get(1, 1).map(|cell| cell.opacity), Some(1.0));
    }

    #[test]
    fn resize_keeps_overlap() {
        let mut surface = GridSurface::new(2, 2);
        surface.set(
            1,
            0,
            SurfaceCell {
                glyph: '@',
                ..SurfaceCell::default()
            },
        );
        surface.resize(3, 1);
        assert_eq!(surface.rows(), vec![" @ "]);
        surface.resize(1, 1);
        assert_eq!(surface.rows(), vec![" "]);
    }
}

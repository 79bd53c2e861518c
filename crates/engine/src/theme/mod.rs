//! Theme tables and the pure `(cell type, visibility state, theme) -> glyph` lookup.

mod builtin;
mod registry;

use crate::color::Rgb;
use crate::grid::{CellType, CELL_TYPE_COUNT};
use crate::visibility::{VisibilityRecord, VisibilityState};

pub use registry::{ThemeError, ThemeLoad, ThemeRegistry};

pub const DEFAULT_REMEMBERED_DIM_FACTOR: f32 = 0.4;
pub const UNEXPLORED_OPACITY: f32 = 0.05;
pub const REMEMBERED_OPACITY: f32 = 0.6;
pub const VISIBLE_OPACITY: f32 = 1.0;
const LAST_RESORT_GLYPH: char = '.';

/// One visual style as data: per-cell-type glyph and color tables plus fog settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    name: String,
    glyphs: [Option<char>; CELL_TYPE_COUNT],
    colors: [Option<Rgb>; CELL_TYPE_COUNT],
    ambient_color: Rgb,
    fog_color: Rgb,
    fog_glyph: char,
}

impl Theme {
    pub fn new(name: impl Into<String>, ambient_color: Rgb, fog_color: Rgb, fog_glyph: char) -> Self {
        Self {
            name: name.into(),
            glyphs: [None; CELL_TYPE_COUNT],
            colors: [None; CELL_TYPE_COUNT],
            ambient_color,
            fog_color,
            fog_glyph,
        }
    }

    pub fn builtin(name: &str) -> Option<Self> {
        builtin::builtin_themes()
            .into_iter()
            .find(|theme| theme.name == name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ambient_color(&self) -> Rgb {
        self.ambient_color
    }

    pub fn fog_color(&self) -> Rgb {
        self.fog_color
    }

    pub fn fog_glyph(&self) -> char {
        self.fog_glyph
    }

    pub fn set_glyph(&mut self, cell: CellType, glyph: char) {
        self.glyphs[cell.index()] = Some(glyph);
    }

    pub fn set_color(&mut self, cell: CellType, color: Rgb) {
        self.colors[cell.index()] = Some(color);
    }

    pub fn has_entry(&self, cell: CellType) -> bool {
        self.glyphs[cell.index()].is_some() && self.colors[cell.index()].is_some()
    }

    /// Missing entries fall back to the floor entry, then to a plain `.`.
    pub fn glyph_for(&self, cell: CellType) -> char {
        self.glyphs[cell.index()]
            .or(self.glyphs[CellType::Floor.index()])
            .unwrap_or(LAST_RESORT_GLYPH)
    }

    /// Missing entries fall back to the floor entry, then to the ambient color.
    pub fn color_for(&self, cell: CellType) -> Rgb {
        self.colors[cell.index()]
            .or(self.colors[CellType::Floor.index()])
            .unwrap_or(self.ambient_color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedGlyph {
    pub glyph: char,
    pub color: Rgb,
    pub opacity: f32,
}

impl ResolvedGlyph {
    pub const fn new(glyph: char, color: Rgb, opacity: f32) -> Self {
        Self {
            glyph,
            color,
            opacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainThemeResolver {
    dim_factor: f32,
}

impl Default for TerrainThemeResolver {
    fn default() -> Self {
        Self {
            dim_factor: DEFAULT_REMEMBERED_DIM_FACTOR,
        }
    }
}

impl TerrainThemeResolver {
    pub fn with_dim_factor(dim_factor: f32) -> Self {
        let dim_factor = if dim_factor.is_finite() {
            dim_factor.clamp(0.0, 1.0)
        } else {
            DEFAULT_REMEMBERED_DIM_FACTOR
        };
        Self { dim_factor }
    }

    pub fn dim_factor(&self) -> f32 {
        self.dim_factor
    }

    /// For `Remembered`, `cell` must be the remembered terrain; see [`Self::resolve_record`].
    pub fn resolve(&self, cell: CellType, state: VisibilityState, theme: &Theme) -> ResolvedGlyph {
        match state {
            VisibilityState::Unexplored => {
                ResolvedGlyph::new(theme.fog_glyph(), theme.fog_color(), UNEXPLORED_OPACITY)
            }
            VisibilityState::Remembered => ResolvedGlyph::new(
                theme.glyph_for(cell),
                theme.color_for(cell).scaled(self.dim_factor),
                REMEMBERED_OPACITY,
            ),
            VisibilityState::CurrentlyVisible => {
                ResolvedGlyph::new(theme.glyph_for(cell), theme.color_for(cell), VISIBLE_OPACITY)
            }
        }
    }

    /// Resolves a cell from its visibility record, using the remembered terrain snapshot for
    /// cells that are explored but out of sight.
    pub fn resolve_record(
        &self,
        current_terrain: CellType,
        record: &VisibilityRecord,
        theme: &Theme,
    ) -> ResolvedGlyph {
        let state = record.state();
        let cell = match state {
            VisibilityState::Remembered => record.remembered_terrain.unwrap_or(current_terrain),
            _ => current_terrain,
        };
        self.resolve(cell, state, theme)
    }
}

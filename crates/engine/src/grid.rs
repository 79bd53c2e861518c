use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: GridPos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    #[default]
    Void,
    Floor,
    Corridor,
    Wall,
    Door,
    StairsUp,
    StairsDown,
    Treasure,
    Trap,
    Water,
    Lava,
    Ice,
    Crystal,
}

pub const CELL_TYPE_COUNT: usize = 13;

impl CellType {
    pub const ALL: [CellType; CELL_TYPE_COUNT] = [
        CellType::Void,
        CellType::Floor,
        CellType::Corridor,
        CellType::Wall,
        CellType::Door,
        CellType::StairsUp,
        CellType::StairsDown,
        CellType::Treasure,
        CellType::Trap,
        CellType::Water,
        CellType::Lava,
        CellType::Ice,
        CellType::Crystal,
    ];

    pub const fn index(self) -> usize {
        match self {
            CellType::Void => 0,
            CellType::Floor => 1,
            CellType::Corridor => 2,
            CellType::Wall => 3,
            CellType::Door => 4,
            CellType::StairsUp => 5,
            CellType::StairsDown => 6,
            CellType::Treasure => 7,
            CellType::Trap => 8,
            CellType::Water => 9,
            CellType::Lava => 10,
            CellType::Ice => 11,
            CellType::Crystal => 12,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CellType::Void => "void",
            CellType::Floor => "floor",
            CellType::Corridor => "corridor",
            CellType::Wall => "wall",
            CellType::Door => "door",
            CellType::StairsUp => "stairs_up",
            CellType::StairsDown => "stairs_down",
            CellType::Treasure => "treasure",
            CellType::Trap => "trap",
            CellType::Water => "water",
            CellType::Lava => "lava",
            CellType::Ice => "ice",
            CellType::Crystal => "crystal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cell| cell.name() == name)
    }

    /// Legend used by ASCII map sources and exploration snapshots.
    pub const fn ascii(self) -> char {
        match self {
            CellType::Void => ' ',
            CellType::Floor => '.',
            CellType::Corridor => ',',
            CellType::Wall => '#',
            CellType::Door => '+',
            CellType::StairsUp => '<',
            CellType::StairsDown => '>',
            CellType::Treasure => '$',
            CellType::Trap => '^',
            CellType::Water => '~',
            CellType::Lava => '=',
            CellType::Ice => '_',
            CellType::Crystal => '*',
        }
    }

    pub fn from_ascii(glyph: char) -> Option<Self> {
        Self::ALL.into_iter().find(|cell| cell.ascii() == glyph)
    }

    pub const fn blocks_sight(self) -> bool {
        matches!(self, CellType::Wall | CellType::Door | CellType::Crystal)
    }
}

/// Terrain as produced by the external dungeon generator. Row-major, `(0,0)` top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    cells: Vec<CellType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerrainGridError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("unknown map glyph '{glyph}' at ({x},{y})")]
    UnknownGlyph { glyph: char, x: u32, y: u32 },
}

impl TerrainGrid {
    pub fn new(width: u32, height: u32, cells: Vec<CellType>) -> Result<Self, TerrainGridError> {
        let expected = width as usize * height as usize;
        let actual = cells.len();
        if expected != actual {
            return Err(TerrainGridError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn filled(width: u32, height: u32, cell: CellType) -> Self {
        Self {
            width,
            height,
            cells: vec![cell; width as usize * height as usize],
        }
    }

    /// Parses a map drawn with the [`CellType::ascii`] legend. Short rows are padded with void.
    pub fn from_ascii(source: &str) -> Result<Self, TerrainGridError> {
        let rows: Vec<&str> = source.lines().collect();
        let height = rows.len() as u32;
        let width = rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0) as u32;

        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for (y, row) in rows.iter().enumerate() {
            let mut row_len = 0u32;
            for (x, glyph) in row.chars().enumerate() {
                let cell = CellType::from_ascii(glyph).ok_or(TerrainGridError::UnknownGlyph {
                    glyph,
                    x: x as u32,
                    y: y as u32,
                })?;
                cells.push(cell);
                row_len += 1;
            }
            for _ in row_len..width {
                cells.push(CellType::Void);
            }
        }
        Self::new(width, height, cells)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        self.index_of(pos).is_some()
    }

    pub fn index_of(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn cell_at(&self, pos: GridPos) -> Option<CellType> {
        self.index_of(pos)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Every sight-blocking cell, suitable as the obstacle set for visibility updates.
    pub fn sight_obstacles(&self) -> HashSet<GridPos> {
        let mut obstacles = HashSet::new();
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.blocks_sight() {
                let x = (index % self.width as usize) as i32;
                let y = (index / self.width as usize) as i32;
                obstacles.insert(GridPos::new(x, y));
            }
        }
        obstacles
    }
}

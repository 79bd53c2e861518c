use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::CellType;

use super::VisibilityEngine;

const UNEXPLORED_MARK: char = '?';

/// Serializable exploration memory. Each row holds one char per cell: the remembered terrain
/// glyph for explored cells, `?` for unexplored ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationSnapshot {
    pub width: u32,
    pub height: u32,
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplorationError {
    #[error("snapshot is {snapshot_width}x{snapshot_height} but the map is {map_width}x{map_height}")]
    DimensionMismatch {
        snapshot_width: u32,
        snapshot_height: u32,
        map_width: u32,
        map_height: u32,
    },
    #[error("snapshot row {row} has {actual} cells, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("snapshot has {actual} rows, expected {expected}")]
    RowCount { expected: usize, actual: usize },
    #[error("snapshot row {row} contains unknown glyph '{glyph}'")]
    UnknownGlyph { row: usize, glyph: char },
}

impl VisibilityEngine {
    pub fn export_exploration(&self) -> ExplorationSnapshot {
        let width = self.width() as usize;
        let rows = self
            .records()
            .chunks(width.max(1))
            .map(|row| {
                row.iter()
                    .map(|record| {
                        if record.explored {
                            record.remembered_terrain.unwrap_or_default().ascii()
                        } else {
                            UNEXPLORED_MARK
                        }
                    })
                    .collect::<String>()
            })
            .collect();
        ExplorationSnapshot {
            width: self.width(),
            height: self.height(),
            rows,
        }
    }

    /// Merges a snapshot into the current records. Only ever sets `explored`; cells already
    /// explored keep their own remembered terrain. Returns the number of newly explored cells.
    pub fn import_exploration(
        &mut self,
        snapshot: &ExplorationSnapshot,
    ) -> Result<usize, ExplorationError> {
        if snapshot.width != self.width() || snapshot.height != self.height() {
            return Err(ExplorationError::DimensionMismatch {
                snapshot_width: snapshot.width,
                snapshot_height: snapshot.height,
                map_width: self.width(),
                map_height: self.height(),
            });
        }
        let width = self.width() as usize;
        if snapshot.rows.len() != self.height() as usize {
            return Err(ExplorationError::RowCount {
                expected: self.height() as usize,
                actual: snapshot.rows.len(),
            });
        }

        let mut decoded = Vec::with_capacity(width * snapshot.rows.len());
        for (row_index, row) in snapshot.rows.iter().enumerate() {
            let actual = row.chars().count();
            if actual != width {
                return Err(ExplorationError::RowLength {
                    row: row_index,
                    expected: width,
                    actual,
                });
            }
            for glyph in row.chars() {
                if glyph == UNEXPLORED_MARK {
                    decoded.push(None);
                    continue;
                }
                let cell = CellType::from_ascii(glyph).ok_or(ExplorationError::UnknownGlyph {
                    row: row_index,
                    glyph,
                })?;
                decoded.push(Some(cell));
            }
        }

        let mut newly_explored = 0;
        for (record, remembered) in self.records_mut().iter_mut().zip(decoded) {
            let Some(cell) = remembered else {
                continue;
            };
            if !record.explored {
                record.explored = true;
                record.remembered_terrain = Some(cell);
                newly_explored += 1;
            }
        }
        Ok(newly_explored)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::grid::{GridPos, TerrainGrid};

    fn explored_engine() -> VisibilityEngine {
        let terrain = TerrainGrid::from_ascii("#####\n#.>.#\n#####").expect("terrain");
        let mut engine = VisibilityEngine::new(5, 3);
        engine.update_visibility(GridPos::new(1, 1), 1, &HashSet::new(), &terrain);
        engine
    }

    #[test]
    fn export_marks_unexplored_cells() {
        let snapshot = explored_engine().export_exploration();
        assert_eq!(snapshot.width, 5);
        assert_eq!(snapshot.rows, vec!["###??", "#.>??", "###??"]);
    }

    #[test]
    fn import_is_a_monotone_union() {
        let source = explored_engine();
        let snapshot = source.export_exploration();

        let mut target = VisibilityEngine::new(5, 3);
        let added = target.import_exploration(&snapshot).expect("import");
        assert_eq!(added, source.explored_count());
        assert!(target.is_explored(GridPos::new(2, 1)));
        assert!(!target.is_visible(GridPos::new(2, 1)));
        assert_eq!(
            target.record(GridPos::new(2, 1)).and_then(|r| r.remembered_terrain),
            Some(CellType::StairsDown)
        );

        let blank = VisibilityEngine::new(5, 3).export_exploration();
        assert_eq!(target.import_exploration(&blank).expect("import"), 0);
        assert!(target.is_explored(GridPos::new(2, 1)));
    }

    #[test]
    fn import_rejects_other_dimensions() {
        let snapshot = explored_engine().export_exploration();
        let mut target = VisibilityEngine::new(6, 3);
        assert!(matches!(
            target.import_exploration(&snapshot),
            Err(ExplorationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn import_rejects_bad_rows() {
        let mut target = VisibilityEngine::new(3, 2);
        let short = ExplorationSnapshot {
            width: 3,
            height: 2,
            rows: vec!["...".to_string(), "..".to_string()],
        };
        assert_eq!(
            target.import_exploration(&short),
            Err(ExplorationError::RowLength {
                row: 1,
                expected: 3,
                actual: 2
            })
        );

        let glyph = ExplorationSnapshot {
            width: 3,
            height: 2,
            rows: vec!["...".to_string(), ".Q.".to_string()],
        };
        assert_eq!(
            target.import_exploration(&glyph),
            Err(ExplorationError::UnknownGlyph { row: 1, glyph: 'Q' })
        );
        assert_eq!(target.explored_count(), 0);
    }

    #[test]
    fn snapshot_survives_json() {
        let snapshot = explored_engine().export_exploration();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let decoded: ExplorationSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, snapshot);
    }
}

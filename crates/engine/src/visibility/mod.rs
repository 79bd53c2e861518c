//! Fog of war: per-cell exploration state, ray-cast line of sight and light levels.

mod raycast;
mod snapshot;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::grid::{CellType, GridPos, TerrainGrid};

pub use raycast::RAY_ANGLE_STEP_DEGREES;
pub use snapshot::{ExplorationError, ExplorationSnapshot};

pub const BRIGHT_LIGHT_RADIUS: f32 = 2.0;
pub const DIM_LIGHT_RADIUS: f32 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightLevel {
    Bright,
    Dim,
    #[default]
    Darkness,
}

impl LightLevel {
    pub fn from_distance(distance: f32) -> Self {
        if distance <= BRIGHT_LIGHT_RADIUS {
            LightLevel::Bright
        } else if distance <= DIM_LIGHT_RADIUS {
            LightLevel::Dim
        } else {
            LightLevel::Darkness
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityState {
    Unexplored,
    Remembered,
    CurrentlyVisible,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityRecord {
    /// Monotone: never reset to false within a map.
    pub explored: bool,
    pub currently_visible: bool,
    /// Terrain captured the last time the cell was visible.
    pub remembered_terrain: Option<CellType>,
    /// Visibility epoch of the last update that saw this cell.
    pub last_seen: Option<u64>,
    pub light_level: LightLevel,
}

impl VisibilityRecord {
    pub fn state(&self) -> VisibilityState {
        if self.currently_visible {
            VisibilityState::CurrentlyVisible
        } else if self.explored {
            VisibilityState::Remembered
        } else {
            VisibilityState::Unexplored
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityUpdate {
    pub visible: usize,
    pub newly_explored: usize,
}

#[derive(Debug, Clone)]
pub struct VisibilityEngine {
    width: u32,
    height: u32,
    records: Vec<VisibilityRecord>,
    visible_indices: Vec<usize>,
    lights: Vec<(LightId, GridPos)>,
    next_light_id: u64,
    epoch: u64,
}

impl VisibilityEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            records: vec![VisibilityRecord::default(); width as usize * height as usize],
            visible_indices: Vec::new(),
            lights: Vec::new(),
            next_light_id: 1,
            epoch: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replaces every record with a fresh unexplored one. Light sources are kept.
    pub fn set_map_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.records.clear();
        self.records
            .resize(width as usize * height as usize, VisibilityRecord::default());
        self.visible_indices.clear();
        info!(width, height, "visibility_map_resized");
    }

    /// Recomputes the currently visible set from `origin`.
    ///
    /// A negative `range` is treated as zero. An origin outside the map clears visibility and
    /// marks nothing, which is not an error.
    pub fn update_visibility(
        &mut self,
        origin: GridPos,
        range: i32,
        obstacles: &HashSet<GridPos>,
        terrain: &TerrainGrid,
    ) -> VisibilityUpdate {
        self.epoch = self.epoch.saturating_add(1);
        for index in self.visible_indices.drain(..) {
            if let Some(record) = self.records.get_mut(index) {
                record.currently_visible = false;
            }
        }

        let range = range.max(0);
        let touched = raycast::cast_rays(
            origin,
            range,
            |pos| self.index_of(pos).is_some(),
            |pos| obstacles.contains(&pos),
        );

        let mut update = VisibilityUpdate::default();
        for pos in touched {
            let Some(index) = self.index_of(pos) else {
                continue;
            };
            let light_level = self.light_level_from_sources(pos);
            let record = &mut self.records[index];
            if !record.explored {
                update.newly_explored += 1;
            }
            record.explored = true;
            record.currently_visible = true;
            record.last_seen = Some(self.epoch);
            record.light_level = light_level;
            if let Some(cell) = terrain.cell_at(pos) {
                record.remembered_terrain = Some(cell);
            }
            self.visible_indices.push(index);
        }
        update.visible = self.visible_indices.len();

        debug!(
            origin_x = origin.x,
            origin_y = origin.y,
            range,
            visible = update.visible,
            newly_explored = update.newly_explored,
            epoch = self.epoch,
            "visibility_updated"
        );
        update
    }

    pub fn add_light_source(&mut self, position: GridPos) -> LightId {
        let id = LightId(self.next_light_id);
        self.next_light_id += 1;
        self.lights.push((id, position));
        id
    }

    pub fn remove_light_source(&mut self, id: LightId) -> bool {
        let before = self.lights.len();
        self.lights.retain(|(light, _)| *light != id);
        self.lights.len() != before
    }

    pub fn light_sources(&self) -> impl Iterator<Item = (LightId, GridPos)> + '_ {
        self.lights.iter().copied()
    }

    pub fn is_visible(&self, pos: GridPos) -> bool {
        self.record(pos).is_some_and(|record| record.currently_visible)
    }

    pub fn is_explored(&self, pos: GridPos) -> bool {
        self.record(pos).is_some_and(|record| record.explored)
    }

    /// Out-of-map cells report as unexplored.
    pub fn visibility_state(&self, pos: GridPos) -> VisibilityState {
        self.record(pos)
            .map(VisibilityRecord::state)
            .unwrap_or(VisibilityState::Unexplored)
    }

    /// Light level recorded at the last update that saw `pos`.
    pub fn light_level(&self, pos: GridPos) -> LightLevel {
        self.record(pos)
            .map(|record| record.light_level)
            .unwrap_or_default()
    }

    pub fn record(&self, pos: GridPos) -> Option<&VisibilityRecord> {
        self.index_of(pos).and_then(|index| self.records.get(index))
    }

    pub fn visible_positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.visible_indices
            .iter()
            .map(|index| self.pos_of(*index))
    }

    pub fn explored_count(&self) -> usize {
        self.records.iter().filter(|record| record.explored).count()
    }

    pub fn explored_ratio(&self) -> f32 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.explored_count() as f32 / self.records.len() as f32
    }

    fn light_level_from_sources(&self, pos: GridPos) -> LightLevel {
        self.lights
            .iter()
            .map(|(_, light)| light.distance(pos))
            .min_by(f32::total_cmp)
            .map(LightLevel::from_distance)
            .unwrap_or(LightLevel::Darkness)
    }

    fn index_of(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    fn pos_of(&self, index: usize) -> GridPos {
        let width = self.width.max(1) as usize;
        GridPos::new((index % width) as i32, (index / width) as i32)
    }

    pub(crate) fn records(&self) -> &[VisibilityRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [VisibilityRecord] {
        &mut self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map(size: u32) -> TerrainGrid {
        TerrainGrid::filled(size, size, CellType::Floor)
    }

    #[test]
    fn obstacle_blocks_ray_along_positive_x() {
        let terrain = open_map(30);
        let mut engine = VisibilityEngine::new(30, 30);
        let obstacles = HashSet::from([GridPos::new(12, 10)]);

        engine.update_visibility(GridPos::new(10, 10), 5, &obstacles, &terrain);

        assert!(engine.is_visible(GridPos::new(11, 10)));
        assert!(engine.is_visible(GridPos::new(12, 10)));
        assert!(!engine.is_visible(GridPos::new(13, 10)));
    }

    #[test]
    fn zero_and_negative_range_reveal_only_origin() {
        let terrain = open_map(10);
        let mut engine = VisibilityEngine::new(10, 10);

        let update = engine.update_visibility(GridPos::new(4, 4), 0, &HashSet::new(), &terrain);
        assert_eq!(update.visible, 1);

        let update = engine.update_visibility(GridPos::new(4, 4), -7, &HashSet::new(), &terrain);
        assert_eq!(update.visible, 1);
        assert_eq!(update.newly_explored, 0);
        assert!(engine.is_visible(GridPos::new(4, 4)));
        assert!(!engine.is_visible(GridPos::new(5, 4)));
    }

    #[test]
    fn out_of_bounds_origin_clears_visibility_without_error() {
        let terrain = open_map(10);
        let mut engine = VisibilityEngine::new(10, 10);
        engine.update_visibility(GridPos::new(4, 4), 3, &HashSet::new(), &terrain);

        let update = engine.update_visibility(GridPos::new(40, 4), 3, &HashSet::new(), &terrain);

        assert_eq!(update, VisibilityUpdate::default());
        assert_eq!(engine.visible_positions().count(), 0);
        assert!(engine.is_explored(GridPos::new(4, 4)));
    }

    #[test]
    fn exploration_is_monotone_across_moves() {
        let terrain = open_map(40);
        let mut engine = VisibilityEngine::new(40, 40);
        let mut explored_so_far: Vec<GridPos> = Vec::new();

        for step in 0..8 {
            let origin = GridPos::new(5 + step * 4, 20);
            engine.update_visibility(origin, 4, &HashSet::new(), &terrain);
            for pos in &explored_so_far {
                assert!(engine.is_explored(*pos), "{pos:?} reverted");
            }
            explored_so_far.extend(engine.visible_positions());
        }
    }

    #[test]
    fn states_follow_unexplored_visible_remembered_cycle() {
        let terrain = open_map(30);
        let mut engine = VisibilityEngine::new(30, 30);
        let probe = GridPos::new(6, 5);
        assert_eq!(engine.visibility_state(probe), VisibilityState::Unexplored);

        engine.update_visibility(GridPos::new(5, 5), 2, &HashSet::new(), &terrain);
        assert_eq!(engine.visibility_state(probe), VisibilityState::CurrentlyVisible);

        engine.update_visibility(GridPos::new(25, 25), 2, &HashSet::new(), &terrain);
        assert_eq!(engine.visibility_state(probe), VisibilityState::Remembered);

        engine.update_visibility(GridPos::new(5, 5), 2, &HashSet::new(), &terrain);
        assert_eq!(engine.visibility_state(probe), VisibilityState::CurrentlyVisible);
    }

    #[test]
    fn remembered_terrain_and_last_seen_are_captured() {
        let terrain = TerrainGrid::from_ascii(".....\n..>..\n.....").expect("terrain");
        let mut engine = VisibilityEngine::new(5, 3);
        engine.update_visibility(GridPos::new(1, 1), 2, &HashSet::new(), &terrain);

        let record = engine.record(GridPos::new(2, 1)).expect("record");
        assert_eq!(record.remembered_terrain, Some(CellType::StairsDown));
        assert_eq!(record.last_seen, Some(1));

        engine.update_visibility(GridPos::new(1, 1), 0, &HashSet::new(), &terrain);
        let record = engine.record(GridPos::new(2, 1)).expect("record");
        assert_eq!(record.last_seen, Some(1));
        assert_eq!(record.remembered_terrain, Some(CellType::StairsDown));
    }

    #[test]
    fn light_level_uses_nearest_source() {
        let terrain = open_map(30);
        let mut engine = VisibilityEngine::new(30, 30);
        let torch = engine.add_light_source(GridPos::new(10, 10));
        engine.update_visibility(GridPos::new(10, 10), 8, &HashSet::new(), &terrain);

        assert_eq!(engine.light_level(GridPos::new(12, 10)), LightLevel::Bright);
        assert_eq!(engine.light_level(GridPos::new(14, 10)), LightLevel::Dim);
        assert_eq!(engine.light_level(GridPos::new(17, 10)), LightLevel::Darkness);

        engine.add_light_source(GridPos::new(17, 10));
        engine.update_visibility(GridPos::new(10, 10), 8, &HashSet::new(), &terrain);
        assert_eq!(engine.light_level(GridPos::new(17, 10)), LightLevel::Bright);

        assert!(engine.remove_light_source(torch));
        assert!(!engine.remove_light_source(torch));
        engine.update_visibility(GridPos::new(10, 10), 8, &HashSet::new(), &terrain);
        assert_eq!(engine.light_level(GridPos::new(10, 10)), LightLevel::Darkness);
    }

    #[test]
    fn no_light_sources_means_darkness() {
        let terrain = open_map(10);
        let mut engine = VisibilityEngine::new(10, 10);
        engine.update_visibility(GridPos::new(5, 5), 3, &HashSet::new(), &terrain);
        assert_eq!(engine.light_level(GridPos::new(5, 5)), LightLevel::Darkness);
    }

    #[test]
    fn set_map_dimensions_resets_records() {
        let terrain = open_map(10);
        let mut engine = VisibilityEngine::new(10, 10);
        engine.update_visibility(GridPos::new(5, 5), 3, &HashSet::new(), &terrain);
        assert!(engine.explored_count() > 0);

        engine.set_map_dimensions(20, 8);

        assert_eq!(engine.explored_count(), 0);
        assert_eq!(engine.visible_positions().count(), 0);
        assert_eq!(engine.record(GridPos::new(19, 7)), Some(&VisibilityRecord::default()));
        assert_eq!(engine.record(GridPos::new(5, 9)), None);
    }

    #[test]
    fn explored_ratio_counts_whole_map() {
        let terrain = open_map(10);
        let mut engine = VisibilityEngine::new(10, 10);
        assert_eq!(engine.explored_ratio(), 0.0);
        engine.update_visibility(GridPos::new(5, 5), 0, &HashSet::new(), &terrain);
        assert!((engine.explored_ratio() - 0.01).abs() < 0.0001);
    }
}

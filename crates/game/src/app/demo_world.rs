//! Hand-authored demo dungeon and the scripted walk through it.

use delve_engine::{GridPos, Marker, Rgb, TerrainGrid, TerrainGridError};

const DEMO_MAP: &str = "\
##########     ################
#........#     #.........~~~..#
#........#     #.........~~~..#
#...<....+,,,,,+..............#
#........#     #..............+,,,,,
#........#     #......$.......#    ,
##########     #..............#    ,
               #..............#    ,
               ################    ,
                                   ,
                              #####+##########
                              #.........^....#
                              #.==........>..#
                              #.==....*....__#
                              ################";

const WAYPOINTS: &[GridPos] = &[
    GridPos::new(4, 3),
    GridPos::new(29, 3),
    GridPos::new(29, 4),
    GridPos::new(35, 4),
    GridPos::new(35, 11),
    GridPos::new(42, 11),
    GridPos::new(42, 12),
];

const TORCHES: &[GridPos] = &[GridPos::new(4, 1), GridPos::new(22, 2), GridPos::new(40, 12)];

pub(crate) const PLAYER_GLYPH: char = '@';
const PLAYER_COLOR: Rgb = Rgb::new(255, 255, 102);

const MONSTERS: &[(GridPos, char, Rgb)] = &[
    (GridPos::new(7, 5), 'r', Rgb::new(160, 120, 80)),
    (GridPos::new(20, 6), 'g', Rgb::new(90, 200, 90)),
    (GridPos::new(44, 12), 's', Rgb::new(200, 200, 200)),
];

pub(crate) fn demo_terrain() -> Result<TerrainGrid, TerrainGridError> {
    TerrainGrid::from_ascii(DEMO_MAP)
}

pub(crate) fn torch_positions() -> &'static [GridPos] {
    TORCHES
}

pub(crate) fn start_position() -> GridPos {
    WAYPOINTS[0]
}

/// Player marker first, then every monster.
pub(crate) fn markers_for(player: GridPos) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(MONSTERS.len() + 1);
    markers.push(Marker {
        position: player,
        glyph: PLAYER_GLYPH,
        color: PLAYER_COLOR,
        high_priority: true,
    });
    markers.extend(MONSTERS.iter().map(|(position, glyph, color)| Marker {
        position: *position,
        glyph: *glyph,
        color: *color,
        high_priority: false,
    }));
    markers
}

/// Steps one cell at a time toward each waypoint in turn, moving along x before y.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedWalk {
    position: GridPos,
    next_waypoint: usize,
}

impl ScriptedWalk {
    pub(crate) fn new() -> Self {
        Self {
            position: start_position(),
            next_waypoint: 1,
        }
    }

    pub(crate) fn position(&self) -> GridPos {
        self.position
    }
}

impl Iterator for ScriptedWalk {
    type Item = GridPos;

    fn next(&mut self) -> Option<GridPos> {
        loop {
            let target = *WAYPOINTS.get(self.next_waypoint)?;
            if self.position == target {
                self.next_waypoint += 1;
                continue;
            }
            let dx = (target.x - self.position.x).signum();
            let dy = if dx == 0 {
                (target.y - self.position.y).signum()
            } else {
                0
            };
            self.position = GridPos::new(self.position.x + dx, self.position.y + dy);
            return Some(self.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use delve_engine::CellType;

    use super::*;

    #[test]
    fn demo_map_parses() {
        let terrain = demo_terrain().expect("demo map");
        assert_eq!(terrain.width(), 46);
        assert_eq!(terrain.height(), 15);
        assert_eq!(terrain.cell_at(start_position()), Some(CellType::StairsUp));
    }

    #[test]
    fn walk_never_enters_blocking_terrain() {
        let terrain = demo_terrain().expect("demo map");
        let mut steps = 0;
        for position in ScriptedWalk::new() {
            let cell = terrain.cell_at(position).expect("walk stays on the map");
            assert!(
                !matches!(cell, CellType::Wall | CellType::Void),
                "walked into {cell:?} at {position:?}"
            );
            steps += 1;
        }
        assert!(steps > 40);
    }

    #[test]
    fn walk_ends_on_last_waypoint() {
        let mut walk = ScriptedWalk::new();
        let last = walk.by_ref().last().expect("walk has steps");
        assert_eq!(last, *WAYPOINTS.last().expect("waypoints"));
        assert_eq!(walk.position(), last);
        assert_eq!(walk.next(), None);
    }

    #[test]
    fn player_marker_is_first_and_high_priority() {
        let markers = markers_for(GridPos::new(5, 5));
        assert_eq!(markers[0].glyph, PLAYER_GLYPH);
        assert!(markers[0].high_priority);
        assert!(markers[1..].iter().all(|marker| !marker.high_priority));
    }
}

use crate::color::Rgb;
use crate::grid::CellType;

use super::Theme;

type Entry = (CellType, char, Rgb);

const CLASSIC: &[Entry] = &[
    (CellType::Void, ' ', Rgb::new(0, 0, 0)),
    (CellType::Floor, '.', Rgb::new(128, 128, 128)),
    (CellType::Corridor, ',', Rgb::new(110, 110, 110)),
    (CellType::Wall, '#', Rgb::new(128, 128, 128)),
    (CellType::Door, '+', Rgb::new(160, 110, 60)),
    (CellType::StairsUp, '<', Rgb::new(255, 255, 255)),
    (CellType::StairsDown, '>', Rgb::new(255, 255, 255)),
    (CellType::Treasure, '$', Rgb::new(255, 215, 0)),
    (CellType::Trap, '^', Rgb::new(220, 40, 40)),
    (CellType::Water, '~', Rgb::new(60, 120, 255)),
    (CellType::Lava, '=', Rgb::new(255, 90, 0)),
    (CellType::Ice, '_', Rgb::new(170, 230, 255)),
    (CellType::Crystal, '*', Rgb::new(200, 120, 255)),
];

const CRYPT: &[Entry] = &[
    (CellType::Void, ' ', Rgb::new(0, 0, 0)),
    (CellType::Floor, '.', Rgb::new(90, 80, 70)),
    (CellType::Corridor, ':', Rgb::new(80, 70, 60)),
    (CellType::Wall, '█', Rgb::new(105, 95, 85)),
    (CellType::Door, '∏', Rgb::new(120, 70, 40)),
    (CellType::StairsUp, '▲', Rgb::new(210, 200, 180)),
    (CellType::StairsDown, '▼', Rgb::new(210, 200, 180)),
    (CellType::Treasure, '♦', Rgb::new(230, 190, 60)),
    (CellType::Trap, '†', Rgb::new(170, 20, 30)),
    (CellType::Water, '≈', Rgb::new(40, 70, 110)),
    (CellType::Lava, '≈', Rgb::new(200, 60, 10)),
    (CellType::Ice, '░', Rgb::new(150, 180, 200)),
    (CellType::Crystal, '◊', Rgb::new(150, 90, 200)),
];

const GLACIER: &[Entry] = &[
    (CellType::Void, ' ', Rgb::new(0, 0, 0)),
    (CellType::Floor, '·', Rgb::new(200, 220, 235)),
    (CellType::Corridor, '·', Rgb::new(170, 190, 210)),
    (CellType::Wall, '▓', Rgb::new(120, 160, 200)),
    (CellType::Door, '▯', Rgb::new(140, 110, 90)),
    (CellType::StairsUp, '<', Rgb::new(255, 255, 255)),
    (CellType::StairsDown, '>', Rgb::new(255, 255, 255)),
    (CellType::Treasure, '$', Rgb::new(250, 230, 120)),
    (CellType::Trap, '^', Rgb::new(230, 80, 80)),
    (CellType::Water, '~', Rgb::new(30, 90, 200)),
    (CellType::Lava, '=', Rgb::new(255, 120, 40)),
    (CellType::Ice, '░', Rgb::new(220, 245, 255)),
    (CellType::Crystal, '✦', Rgb::new(140, 220, 255)),
];

struct BuiltinTable {
    name: &'static str,
    entries: &'static [Entry],
    ambient_color: Rgb,
    fog_color: Rgb,
    fog_glyph: char,
}

const BUILTINS: &[BuiltinTable] = &[
    BuiltinTable {
        name: "classic",
        entries: CLASSIC,
        ambient_color: Rgb::new(40, 40, 40),
        fog_color: Rgb::new(20, 20, 20),
        fog_glyph: ' ',
    },
    BuiltinTable {
        name: "crypt",
        entries: CRYPT,
        ambient_color: Rgb::new(30, 24, 20),
        fog_color: Rgb::new(12, 10, 8),
        fog_glyph: '░',
    },
    BuiltinTable {
        name: "glacier",
        entries: GLACIER,
        ambient_color: Rgb::new(30, 40, 55),
        fog_color: Rgb::new(18, 24, 34),
        fog_glyph: ' ',
    },
];

pub(crate) fn builtin_themes() -> Vec<Theme> {
    BUILTINS.iter().map(build).collect()
}

fn build(table: &BuiltinTable) -> Theme {
    let mut theme = Theme::new(table.name, table.ambient_color, table.fog_color, table.fog_glyph);
    for (cell, glyph, color) in table.entries {
        theme.set_glyph(*cell, *glyph);
        theme.set_color(*cell, *color);
    }
    theme
}

use std::collections::HashSet;
use std::time::Duration;

use delve_engine::{
    CellType, FrameOutcome, GridPos, GridSurface, ManualFrameHost, RenderConfig, RenderPipeline,
    ResolvedGlyph, Rgb, TerrainGrid, TerrainThemeResolver, Theme, Vec2, ViewportCamera,
    VisibilityEngine, VisibilityRecord, VisibilityState,
};

fn drain(pipeline: &mut RenderPipeline<ManualFrameHost>, surface: &mut GridSurface) -> u32 {
    let mut frames = 0;
    loop {
        pipeline.host_mut().advance(Duration::from_millis(17));
        let Some(handle) = pipeline.host_mut().take_pending() else {
            return frames;
        };
        pipeline.on_frame(handle, surface);
        frames += 1;
        assert!(frames < 10_000, "pipeline never went idle");
    }
}

#[test]
fn obstacle_stops_ray_along_positive_x() {
    let terrain = TerrainGrid::filled(30, 30, CellType::Floor);
    let mut engine = VisibilityEngine::new(30, 30);
    let obstacles = HashSet::from([GridPos::new(12, 10)]);

    engine.update_visibility(GridPos::new(10, 10), 5, &obstacles, &terrain);

    assert!(engine.is_visible(GridPos::new(11, 10)));
    assert!(engine.is_visible(GridPos::new(12, 10)));
    assert!(!engine.is_visible(GridPos::new(13, 10)));
}

#[test]
fn unchanged_wall_is_absent_from_second_frame() {
    let mut terrain_rows = vec![".".repeat(10); 10];
    terrain_rows[5].replace_range(5..6, "#");
    let terrain = TerrainGrid::from_ascii(&terrain_rows.join("\n")).expect("terrain");
    let theme = Theme::builtin("classic").expect("classic");
    let mut pipeline = RenderPipeline::new(
        ManualFrameHost::new(),
        terrain,
        10,
        10,
        theme,
        RenderConfig::default(),
    );
    let mut surface = GridSurface::new(10, 10);

    pipeline.reveal_from(GridPos::new(2, 2), 20);
    drain(&mut pipeline, &mut surface);
    let wall = surface.get(5, 5).expect("wall cell");
    assert_eq!(wall.glyph, '#');
    assert_eq!(wall.color.to_hex(), "#808080");

    pipeline.reveal_from(GridPos::new(2, 2), 20);
    pipeline.host_mut().advance(Duration::from_millis(40));
    let handle = pipeline.host_mut().take_pending().expect("frame");
    assert_eq!(
        pipeline.on_frame(handle, &mut surface),
        FrameOutcome::CycleScheduled {
            dirty: 0,
            first_batch: None,
        }
    );
}

#[test]
fn camera_keeps_full_window_inside_world() {
    let mut camera = ViewportCamera::new(60, 20, 200, 100);
    camera.set_target(Vec2::new(150.0, 90.0), false);
    let viewport = camera.viewport();

    assert!(viewport.origin_x >= 0 && viewport.origin_x + 60 <= 200);
    assert!(viewport.origin_y >= 0 && viewport.origin_y + 20 <= 100);
    assert_eq!((viewport.origin_x, viewport.origin_y), (120, 80));
}

#[test]
fn unexplored_cells_resolve_to_fog_for_every_terrain() {
    let theme = Theme::builtin("crypt").expect("crypt");
    let resolver = TerrainThemeResolver::default();
    let record = VisibilityRecord::default();
    for cell in CellType::ALL {
        let resolved = resolver.resolve_record(cell, &record, &theme);
        assert_eq!(resolved.glyph, theme.fog_glyph());
        assert_eq!(resolved.color, theme.fog_color());
        assert_eq!(record.state(), VisibilityState::Unexplored);
    }
}

#[test]
fn walking_away_leaves_dimmed_memory_on_screen() {
    let terrain = TerrainGrid::from_ascii(
        "\
####################
#..................#
#..................#
####################",
    )
    .expect("terrain");
    let theme = Theme::builtin("classic").expect("classic");
    let floor = theme.color_for(CellType::Floor);
    let mut pipeline = RenderPipeline::new(
        ManualFrameHost::new(),
        terrain,
        20,
        4,
        theme,
        RenderConfig::default(),
    );
    let mut surface = GridSurface::new(20, 4);

    pipeline.reveal_from(GridPos::new(2, 1), 3);
    drain(&mut pipeline, &mut surface);
    assert_eq!(surface.get(3, 1).map(|cell| cell.color), Some(floor));

    pipeline.reveal_from(GridPos::new(15, 1), 3);
    drain(&mut pipeline, &mut surface);
    let remembered = surface.get(3, 1).expect("remembered cell");
    assert_eq!(remembered.glyph, '.');
    assert_eq!(remembered.color, floor.scaled(0.4));
    assert!((remembered.opacity - 0.6).abs() < f32::EPSILON);
    assert_eq!(surface.get(15, 1).map(|cell| cell.color), Some(floor));
}

#[test]
fn theme_switch_recolors_without_invalidation() {
    let terrain = TerrainGrid::filled(8, 4, CellType::Floor);
    let mut pipeline = RenderPipeline::new(
        ManualFrameHost::new(),
        terrain,
        8,
        4,
        Theme::builtin("classic").expect("classic"),
        RenderConfig::default(),
    );
    let mut surface = GridSurface::new(8, 4);
    pipeline.reveal_from(GridPos::new(3, 2), 10);
    drain(&mut pipeline, &mut surface);

    let glacier = Theme::builtin("glacier").expect("glacier");
    let expected = ResolvedGlyph::new(
        glacier.glyph_for(CellType::Floor),
        glacier.color_for(CellType::Floor),
        1.0,
    );
    pipeline.set_theme(glacier);
    drain(&mut pipeline, &mut surface);

    let cell = surface.get(3, 2).expect("cell");
    assert_eq!(cell.glyph, expected.glyph);
    assert_eq!(cell.color, expected.color);
}

#[test]
fn exploration_survives_snapshot_into_fresh_pipeline() {
    let map = "\
##########
#........#
#........#
##########";
    let theme = Theme::builtin("classic").expect("classic");
    let mut first = RenderPipeline::new(
        ManualFrameHost::new(),
        TerrainGrid::from_ascii(map).expect("terrain"),
        10,
        4,
        theme.clone(),
        RenderConfig::default(),
    );
    first.reveal_from(GridPos::new(2, 1), 2);
    let snapshot = first.visibility().export_exploration();
    let explored = first.visibility().explored_count();
    first.teardown();

    let mut second = RenderPipeline::new(
        ManualFrameHost::new(),
        TerrainGrid::from_ascii(map).expect("terrain"),
        10,
        4,
        theme,
        RenderConfig::default(),
    );
    let restored = second
        .visibility_mut()
        .import_exploration(&snapshot)
        .expect("import");
    assert_eq!(restored, explored);
    second.request_render();
    let mut surface = GridSurface::new(10, 4);
    drain(&mut second, &mut surface);

    let remembered = surface.get(1, 1).expect("cell");
    assert_eq!(remembered.glyph, '.');
    assert!((remembered.opacity - 0.6).abs() < f32::EPSILON);
    assert_eq!(surface.get(8, 2).map(|cell| cell.color), Some(Rgb::new(20, 20, 20)));
}

#[test]
fn metrics_handle_tracks_pipeline_from_outside() {
    let terrain = TerrainGrid::filled(12, 6, CellType::Floor);
    let mut pipeline = RenderPipeline::new(
        ManualFrameHost::new(),
        terrain,
        12,
        6,
        Theme::builtin("classic").expect("classic"),
        RenderConfig::default(),
    );
    let handle = pipeline.metrics_handle();
    let mut surface = GridSurface::new(12, 6);
    pipeline.reveal_from(GridPos::new(6, 3), 10);
    drain(&mut pipeline, &mut surface);

    let metrics = handle.snapshot();
    assert_eq!(metrics, pipeline.metrics());
    assert_eq!(metrics.diff_count, 1);
    assert_eq!(metrics.cells_updated, 72);
    assert!(metrics.memory_usage_estimate > 0);
}

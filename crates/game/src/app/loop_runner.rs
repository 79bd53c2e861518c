use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use delve_engine::{
    FrameOutcome, GridSurface, PerformanceMetrics, RenderPipeline, SystemFrameHost, Vec2,
};
use tracing::{error, info, warn};

use super::bootstrap::{AppError, AppWiring};
use super::demo_world::{markers_for, torch_positions, ScriptedWalk};
use super::persist::save_exploration;

/// Consecutive quiet frames after the walk before the run ends.
const SETTLE_FRAMES: u32 = 30;

struct RunSummary {
    rows: Vec<String>,
    frames: u32,
    explored_ratio: f32,
    metrics: PerformanceMetrics,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_viewer(app) {
        Ok(summary) => {
            for row in &summary.rows {
                println!("{row}");
            }
            let metrics = summary.metrics;
            info!(
                frames = summary.frames,
                explored_ratio = summary.explored_ratio,
                batches = metrics.batch_count,
                cells_updated = metrics.cells_updated,
                cells_skipped = metrics.cells_skipped,
                cache_hit_rate = metrics.cache_hit_rate,
                frames_skipped = metrics.frames_skipped,
                pooled_reuse_count = metrics.pooled_reuse_count,
                "run_complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_viewer(app: AppWiring) -> Result<RunSummary, AppError> {
    let AppWiring {
        config,
        theme,
        terrain,
        exploration,
    } = app;

    let mut pipeline = RenderPipeline::new(
        SystemFrameHost::new(),
        terrain,
        config.viewport_width,
        config.viewport_height,
        theme,
        config.render.clone(),
    );
    if let Some(snapshot) = &exploration {
        match pipeline.visibility_mut().import_exploration(snapshot) {
            Ok(restored) => info!(restored, "exploration_restored"),
            Err(err) => warn!(error = %err, "exploration snapshot ignored"),
        }
    }
    for torch in torch_positions() {
        pipeline.add_light_source(*torch);
    }

    let mut surface = GridSurface::new(config.viewport_width, config.viewport_height);
    let mut walk = ScriptedWalk::new();
    let start = walk.position();
    pipeline.set_camera_target(Vec2::from(start), false);
    pipeline.set_markers(markers_for(start));
    pipeline.reveal_from(start, config.vision_range);

    let frame_target = target_frame_duration(config.render.frame_target_ms);
    let mut walking = true;
    let mut quiet_frames = 0u32;
    let mut frames = 0u32;
    while frames < config.frames {
        let frame_start = Instant::now();

        if walking && frames > 0 && frames % config.frames_per_step == 0 {
            match walk.next() {
                Some(position) => {
                    pipeline.set_markers(markers_for(position));
                    pipeline.set_camera_target(Vec2::from(position), true);
                    pipeline.reveal_from(position, config.vision_range);
                }
                None => {
                    walking = false;
                    info!(frames, "scripted_walk_finished");
                }
            }
        }

        let camera_moved = pipeline.tick(1);
        let outcome = match pipeline.host_mut().take_pending() {
            Some(handle) => pipeline.on_frame(handle, &mut surface),
            None => FrameOutcome::Idle,
        };
        frames += 1;

        if !walking && !camera_moved && pipeline.is_idle() && outcome == FrameOutcome::Idle {
            quiet_frames += 1;
            if quiet_frames >= SETTLE_FRAMES {
                break;
            }
        } else {
            quiet_frames = 0;
        }

        thread::sleep(compute_cap_sleep(frame_start.elapsed(), Some(frame_target)));
    }

    if let Some(path) = &config.exploration_file {
        save_exploration(path, &pipeline.visibility().export_exploration())?;
        info!(path = %path.display(), "exploration_saved");
    }

    let summary = RunSummary {
        rows: surface.rows(),
        frames,
        explored_ratio: pipeline.visibility().explored_ratio(),
        metrics: pipeline.metrics(),
    };
    pipeline.teardown();
    Ok(summary)
}

fn target_frame_duration(frame_target_ms: f32) -> Duration {
    Duration::from_secs_f64(f64::from(frame_target_ms) / 1000.0)
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use delve_engine::RenderConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const CONFIG_ENV_VAR: &str = "DELVE_CONFIG";

const MIN_VIEWPORT_EXTENT: u32 = 4;
const MAX_VIEWPORT_EXTENT: u32 = 400;
const MAX_VISION_RANGE: i32 = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ViewerConfig {
    pub(crate) viewport_width: u32,
    pub(crate) viewport_height: u32,
    pub(crate) vision_range: i32,
    pub(crate) theme: String,
    pub(crate) theme_file: Option<PathBuf>,
    /// Upper bound on refresh iterations, including the drain after the walk ends.
    pub(crate) frames: u32,
    /// Refresh iterations between two player steps.
    pub(crate) frames_per_step: u32,
    pub(crate) exploration_file: Option<PathBuf>,
    pub(crate) render: RenderConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            viewport_width: 40,
            viewport_height: 16,
            vision_range: 8,
            theme: "classic".to_string(),
            theme_file: None,
            frames: 600,
            frames_per_step: 4,
            exploration_file: None,
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read viewer config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse viewer config {path}{}: {source}", format_json_path(.json_path))]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_json_path(json_path: &str) -> String {
    if json_path.is_empty() || json_path == "." {
        String::new()
    } else {
        format!(" at {json_path}")
    }
}

/// First CLI argument wins over the environment variable.
pub(crate) fn resolve_config_path(cli_arg: Option<PathBuf>) -> Option<PathBuf> {
    cli_arg.or_else(|| {
        std::env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

pub(crate) fn load_viewer_config(path: Option<&Path>) -> Result<ViewerConfig, ConfigError> {
    let Some(path) = path else {
        info!("viewer config not provided; using defaults");
        return Ok(ViewerConfig::default().normalized());
    };
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_viewer_config(&raw, path)?;
    info!(path = %path.display(), theme = config.theme.as_str(), "viewer_config_loaded");
    Ok(config.normalized())
}

fn parse_viewer_config(raw: &str, path: &Path) -> Result<ViewerConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, ViewerConfig>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            json_path,
            source: error.into_inner(),
        }
    })
}

impl ViewerConfig {
    pub(crate) fn normalized(self) -> Self {
        Self {
            viewport_width: normalize_extent("viewport_width", self.viewport_width),
            viewport_height: normalize_extent("viewport_height", self.viewport_height),
            vision_range: normalize_vision_range(self.vision_range),
            frames_per_step: self.frames_per_step.max(1),
            render: self.render.normalized(),
            ..self
        }
    }
}

fn normalize_extent(field: &'static str, value: u32) -> u32 {
    let clamped = value.clamp(MIN_VIEWPORT_EXTENT, MAX_VIEWPORT_EXTENT);
    if clamped != value {
        warn!(field, value, clamped, "viewer config value clamped");
    }
    clamped
}

fn normalize_vision_range(value: i32) -> i32 {
    let clamped = value.clamp(0, MAX_VISION_RANGE);
    if clamped != value {
        warn!(field = "vision_range", value, clamped, "viewer config value clamped");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_viewer_config(None).expect("defaults");
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("viewer.json");
        fs::write(
            &path,
            r#"{ "theme": "crypt", "render": { "max_batch_size": 60 } }"#,
        )
        .expect("write config");

        let config = load_viewer_config(Some(&path)).expect("load");
        assert_eq!(config.theme, "crypt");
        assert_eq!(config.render.max_batch_size, 60);
        assert!(config.render.enable_virtual_dom);
        assert_eq!(config.viewport_width, 40);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{ "render": { "frame_target_ms": "fast" } }"#).expect("write");

        let err = load_viewer_config(Some(&path)).expect_err("bad type");
        match &err {
            ConfigError::Parse { json_path, .. } => {
                assert_eq!(json_path, "render.frame_target_ms")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("at render.frame_target_ms"));
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_viewer_config(Some(&dir.path().join("absent.json"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = ViewerConfig {
            viewport_width: 1,
            viewport_height: 10_000,
            vision_range: -4,
            frames_per_step: 0,
            ..ViewerConfig::default()
        }
        .normalized();
        assert_eq!(config.viewport_width, MIN_VIEWPORT_EXTENT);
        assert_eq!(config.viewport_height, MAX_VIEWPORT_EXTENT);
        assert_eq!(config.vision_range, 0);
        assert_eq!(config.frames_per_step, 1);
    }

    #[test]
    fn cli_argument_takes_precedence() {
        let path = resolve_config_path(Some(PathBuf::from("cli.json")));
        assert_eq!(path, Some(PathBuf::from("cli.json")));
    }
}

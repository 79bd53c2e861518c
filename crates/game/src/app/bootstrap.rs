use std::path::PathBuf;

use delve_engine::{
    ExplorationSnapshot, TerrainGrid, TerrainGridError, Theme, ThemeError, ThemeRegistry,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_viewer_config, resolve_config_path, ConfigError, ViewerConfig};
use super::demo_world;
use super::persist::{load_exploration, PersistError};

pub(crate) struct AppWiring {
    pub(crate) config: ViewerConfig,
    pub(crate) theme: Theme,
    pub(crate) terrain: TerrainGrid,
    pub(crate) exploration: Option<ExplorationSnapshot>,
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error("unknown theme '{name}' (available: {available})")]
    UnknownTheme { name: String, available: String },
    #[error("demo map is invalid: {0}")]
    Terrain(#[from] TerrainGridError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub(crate) fn build_app(cli_config: Option<PathBuf>) -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Delve Startup ===");

    let config_path = resolve_config_path(cli_config);
    let config = load_viewer_config(config_path.as_deref())?;
    let theme = select_theme(&config)?;
    let terrain = demo_world::demo_terrain()?;
    let exploration = match &config.exploration_file {
        Some(path) => load_exploration(path)?,
        None => None,
    };

    Ok(AppWiring {
        config,
        theme,
        terrain,
        exploration,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn select_theme(config: &ViewerConfig) -> Result<Theme, AppError> {
    let mut registry = ThemeRegistry::with_builtins();
    if let Some(path) = &config.theme_file {
        registry.load_file(path)?;
    }
    registry
        .get(&config.theme)
        .cloned()
        .ok_or_else(|| AppError::UnknownTheme {
            name: config.theme.clone(),
            available: registry.names().join(", "),
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn builtin_theme_is_selected_by_name() {
        let config = ViewerConfig {
            theme: "glacier".to_string(),
            ..ViewerConfig::default()
        };
        assert_eq!(select_theme(&config).expect("glacier").name(), "glacier");
    }

    #[test]
    fn unknown_theme_lists_available_names() {
        let config = ViewerConfig {
            theme: "neon".to_string(),
            ..ViewerConfig::default()
        };
        let err = select_theme(&config).expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "unknown theme 'neon' (available: classic, crypt, glacier)"
        );
    }

    #[test]
    fn theme_file_adds_selectable_themes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("themes.json");
        fs::write(
            &path,
            r##"{ "themes": [ {
                "name": "sepia",
                "ambient_color": "#3a2e20",
                "fog_color": "#1a140c",
                "glyphs": { "wall": "#", "floor": "." },
                "colors": { "wall": "#8a6d45", "floor": "#6b5536" }
            } ] }"##,
        )
        .expect("write themes");
        let config = ViewerConfig {
            theme: "sepia".to_string(),
            theme_file: Some(path),
            ..ViewerConfig::default()
        };
        assert_eq!(select_theme(&config).expect("sepia").name(), "sepia");
    }
}

//! Exploration memory saved between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use delve_engine::ExplorationSnapshot;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum PersistError {
    #[error("failed to read exploration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write exploration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse exploration file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode exploration snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

/// `Ok(None)` when no file exists yet.
pub(crate) fn load_exploration(path: &Path) -> Result<Option<ExplorationSnapshot>, PersistError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize::<_, ExplorationSnapshot>(&mut deserializer)
        .map(Some)
        .map_err(|error| PersistError::Parse {
            path: path.to_path_buf(),
            json_path: error.path().to_string(),
            source: error.into_inner(),
        })
}

/// Writes next to `path` first and renames over it, so a crash never leaves a torn file.
pub(crate) fn save_exploration(
    path: &Path,
    snapshot: &ExplorationSnapshot,
) -> Result<(), PersistError> {
    let text = serde_json::to_string_pretty(snapshot).map_err(PersistError::Encode)?;
    let write_error = |source: io::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "exploration.json".to_string());
    let staging = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&staging, text).map_err(write_error)?;
    fs::rename(&staging, path).map_err(|source| {
        let _ = fs::remove_file(&staging);
        write_error(source)
    })
}

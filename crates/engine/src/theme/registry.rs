use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::color::{ColorParseError, Rgb};
use crate::grid::CellType;

use super::builtin::builtin_themes;
use super::Theme;

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("failed to read theme file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse theme source {origin} at {json_path}: {message}")]
    Parse {
        origin: String,
        json_path: String,
        message: String,
    },
    #[error("theme '{theme}' field {field}: {source}")]
    InvalidColor {
        theme: String,
        field: String,
        #[source]
        source: ColorParseError,
    },
    #[error("theme '{theme}' field {field} must be exactly one character, got '{value}'")]
    InvalidGlyph {
        theme: String,
        field: String,
        value: String,
    },
    #[error("theme '{theme}' names unknown cell type '{cell_type}'")]
    UnknownCellType { theme: String, cell_type: String },
    #[error("theme '{name}' is defined more than once in {origin}")]
    DuplicateName { name: String, origin: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeLoad {
    Added,
    Replaced,
    /// Same name and same fingerprint as the registered theme; nothing to redraw.
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThemeFile {
    themes: Vec<ThemeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThemeDef {
    name: String,
    ambient_color: String,
    fog_color: String,
    #[serde(default = "default_fog_glyph")]
    fog_glyph: String,
    #[serde(default)]
    glyphs: BTreeMap<String, String>,
    #[serde(default)]
    colors: BTreeMap<String, String>,
}

fn default_fog_glyph() -> String {
    " ".to_string()
}

#[derive(Debug, Clone)]
struct RegisteredTheme {
    theme: Theme,
    /// `None` for built-in tables.
    fingerprint: Option<String>,
}

/// Named themes, seeded with the built-in tables and extended from JSON theme files.
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: HashMap<String, RegisteredTheme>,
}

impl ThemeRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for theme in builtin_themes() {
            registry.themes.insert(
                theme.name().to_string(),
                RegisteredTheme {
                    theme,
                    fingerprint: None,
                },
            );
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name).map(|registered| &registered.theme)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Sorted for stable listings.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.themes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn insert(&mut self, theme: Theme) -> ThemeLoad {
        let name = theme.name().to_string();
        let previous = self.themes.insert(
            name,
            RegisteredTheme {
                theme,
                fingerprint: None,
            },
        );
        if previous.is_some() {
            ThemeLoad::Replaced
        } else {
            ThemeLoad::Added
        }
    }

    pub fn load_file(&mut self, path: &Path) -> Result<Vec<(String, ThemeLoad)>, ThemeError> {
        let source = fs::read_to_string(path).map_err(|source| ThemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&source, &path.display().to_string())
    }

    /// Parses and validates every theme in `source` before registering any of them.
    pub fn load_str(
        &mut self,
        source: &str,
        origin: &str,
    ) -> Result<Vec<(String, ThemeLoad)>, ThemeError> {
        let file = parse_theme_file(source, origin)?;

        let mut parsed = Vec::with_capacity(file.themes.len());
        for def in &file.themes {
            if parsed
                .iter()
                .any(|(theme, _): &(Theme, String)| theme.name() == def.name)
            {
                return Err(ThemeError::DuplicateName {
                    name: def.name.clone(),
                    origin: origin.to_string(),
                });
            }
            parsed.push((theme_from_def(def)?, fingerprint(def)));
        }

        let mut outcomes = Vec::with_capacity(parsed.len());
        for (theme, fingerprint) in parsed {
            let name = theme.name().to_string();
            let outcome = match self.themes.get(&name) {
                Some(existing) if existing.fingerprint.as_deref() == Some(fingerprint.as_str()) => {
                    ThemeLoad::Unchanged
                }
                Some(_) => ThemeLoad::Replaced,
                None => ThemeLoad::Added,
            };
            if outcome != ThemeLoad::Unchanged {
                self.themes.insert(
                    name.clone(),
                    RegisteredTheme {
                        theme,
                        fingerprint: Some(fingerprint.clone()),
                    },
                );
            }
            info!(
                theme = %name,
                origin,
                outcome = ?outcome,
                fingerprint = %fingerprint,
                "theme_loaded"
            );
            outcomes.push((name, outcome));
        }
        Ok(outcomes)
    }
}

fn parse_theme_file(source: &str, origin: &str) -> Result<ThemeFile, ThemeError> {
    let deserializer = &mut serde_json::Deserializer::from_str(source);
    serde_path_to_error::deserialize(deserializer).map_err(|error| ThemeError::Parse {
        origin: origin.to_string(),
        json_path: error.path().to_string(),
        message: error.inner().to_string(),
    })
}

fn theme_from_def(def: &ThemeDef) -> Result<Theme, ThemeError> {
    let ambient = parse_color(&def.name, "ambient_color", &def.ambient_color)?;
    let fog_color = parse_color(&def.name, "fog_color", &def.fog_color)?;
    let fog_glyph = parse_glyph(&def.name, "fog_glyph", &def.fog_glyph)?;
    let mut theme = Theme::new(def.name.clone(), ambient, fog_color, fog_glyph);

    for (cell_name, glyph) in &def.glyphs {
        let cell = parse_cell_type(&def.name, cell_name)?;
        theme.set_glyph(cell, parse_glyph(&def.name, &format!("glyphs.{cell_name}"), glyph)?);
    }
    for (cell_name, color) in &def.colors {
        let cell = parse_cell_type(&def.name, cell_name)?;
        theme.set_color(cell, parse_color(&def.name, &format!("colors.{cell_name}"), color)?);
    }
    Ok(theme)
}

fn parse_cell_type(theme: &str, name: &str) -> Result<CellType, ThemeError> {
    CellType::from_name(name).ok_or_else(|| ThemeError::UnknownCellType {
        theme: theme.to_string(),
        cell_type: name.to_string(),
    })
}

fn parse_color(theme: &str, field: &str, value: &str) -> Result<Rgb, ThemeError> {
    Rgb::from_hex(value).map_err(|source| ThemeError::InvalidColor {
        theme: theme.to_string(),
        field: field.to_string(),
        source,
    })
}

fn parse_glyph(theme: &str, field: &str, value: &str) -> Result<char, ThemeError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(glyph), None) => Ok(glyph),
        _ => Err(ThemeError::InvalidGlyph {
            theme: theme.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn fingerprint(def: &ThemeDef) -> String {
    let mut hasher = Sha256::new();
    hasher.update(def.name.as_bytes());
    hasher.update([0u8]);
    hasher.update(def.ambient_color.to_ascii_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(def.fog_color.to_ascii_lowercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(def.fog_glyph.as_bytes());
    hasher.update([0u8]);
    for (table, entries) in [("glyphs", &def.glyphs), ("colors", &def.colors)] {
        hasher.update(table.as_bytes());
        hasher.update([0u8]);
        for (key, value) in entries {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
    }
    to_hex_lower(&hasher.finalize())
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

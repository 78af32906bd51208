//! TOML configuration with defaults for every field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::export::DEFAULT_FILE_NAME;
use crate::model::Color;
use crate::render::Style;

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub style: StyleConfig,
    pub image: ImageConfig,
    pub export: ExportConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub stroke_width: f32,
    pub marker_radius: f32,
    pub default_color: Color,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let style = Style::default();
        Self {
            stroke_width: style.stroke_width,
            marker_radius: style.marker_radius,
            default_color: Color::DEFAULT,
        }
    }
}

impl StyleConfig {
    pub fn to_style(&self) -> Style {
        Style {
            stroke_width: self.stroke_width,
            marker_radius: self.marker_radius,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Shown at startup instead of the bundled example.
    pub default_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/roof-annotate/config.toml` or the platform
    /// equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roof-annotate").join("config.toml"))
    }

    /// Reads `path`, or the default location when `None`. A missing file at
    /// the default location is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => {
                    log::debug!("no config directory on this platform, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !explicit && !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.surface.width == 0 || self.surface.height == 0 {
            return Err(ConfigError::Invalid {
                field: "surface",
                reason: format!(
                    "{}x{} has a zero dimension",
                    self.surface.width, self.surface.height
                ),
            });
        }
        if !positive(self.style.stroke_width) {
            return Err(ConfigError::Invalid {
                field: "style.stroke_width",
                reason: format!("{} is not positive", self.style.stroke_width),
            });
        }
        if !positive(self.style.marker_radius) {
            return Err(ConfigError::Invalid {
                field: "style.marker_radius",
                reason: format!("{} is not positive", self.style.marker_radius),
            });
        }
        if self.export.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "export.file_name",
                reason: "empty file name".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

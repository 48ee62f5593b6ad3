//! Renderer configuration, stored as RON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use worldview_core::{CameraState, Color};

/// Configuration error types
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Text rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// TrueType/OpenType file to rasterize glyphs from. The built-in box
    /// font is used when unset or unreadable.
    pub font_path: Option<PathBuf>,
    /// Cache key of the font.
    pub font_name: String,
    /// Glyph rasterization size in pixels; one marker unit spans this many.
    pub resolution: u32,
    /// Edge length of each square glyph atlas.
    pub atlas_size: u32,
    /// Derive label backgrounds from the foreground color.
    pub auto_background_color: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_name: "sans-serif".to_string(),
            resolution: 64,
            atlas_size: 1024,
            auto_background_color: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub clear_color: Color,
    /// Point size range in pixels, `[min, max]`.
    pub point_size_limits: [f32; 2],
    pub text: TextConfig,
    pub camera: CameraState,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::rgba(0.08, 0.08, 0.1, 1.0),
            point_size_limits: [1.0, 64.0],
            text: TextConfig::default(),
            camera: CameraState::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a file path
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = Self::from_ron_str(&content)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Like [`RendererConfig::load`], falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(_)) => {
                tracing::info!("No config file at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save the configuration to disk, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = self.to_ron_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

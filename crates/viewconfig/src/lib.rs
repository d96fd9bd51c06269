use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use panel::{FieldDescriptor, FieldGroup, FieldPanel, InitialValuePolicy, PanelError};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

const TRANSFORM_PRESET: &str = include_str!("../presets/transform.toml");
const CAMERA_PRESET: &str = include_str!("../presets/camera.toml");

/// Names accepted by [`ViewerConfig::preset`].
pub const PRESET_NAMES: [&str; 2] = ["transform", "camera"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown preset '{0}'; expected one of: transform, camera")]
    UnknownPreset(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid field layout: {0}")]
    Panel(#[from] PanelError),
}

/// Mesh uploaded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryLayout {
    /// One full-screen quad.
    #[default]
    Quad,
    /// Two half-screen quads tagged with a side attribute.
    SplitQuad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub version: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub fixed_width: u32,
    #[serde(default)]
    pub geometry: GeometryLayout,
    #[serde(default)]
    pub initial_values: InitialValuePolicy,
    #[serde(default = "default_shader_dir")]
    pub shaders: PathBuf,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub uniforms: BTreeMap<String, f32>,
    #[serde(default)]
    pub groups: Vec<FieldGroup>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

fn default_shader_dir() -> PathBuf {
    PathBuf::from("shaders")
}

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file; a relative shader directory is resolved
    /// against the file's parent directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if config.shaders.is_relative() {
            if let Some(parent) = path.parent() {
                config.shaders = parent.join(&config.shaders);
            }
        }
        Ok(config)
    }

    /// Returns one of the bundled layouts. Shader paths stay relative to the
    /// working directory.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let source = match name {
            "transform" => TRANSFORM_PRESET,
            "camera" => CAMERA_PRESET,
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        };
        Self::from_toml_str(source)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("custom")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {} (expected {CONFIG_VERSION})",
                self.version
            )));
        }
        if self.fixed_width == 0 {
            return Err(ConfigError::Invalid(
                "fixed_width must be greater than zero".into(),
            ));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid(
                "canvas dimensions must be greater than zero".into(),
            ));
        }
        if let Some((name, _)) = self.uniforms.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "default uniform '{name}' must be a finite number"
            )));
        }
        self.build_panel()?;
        Ok(())
    }

    /// Instantiates the field panel described by this configuration.
    pub fn build_panel(&self) -> Result<FieldPanel, ConfigError> {
        Ok(FieldPanel::build(
            &self.groups,
            &self.fields,
            self.initial_values,
        )?)
    }

    /// Default uniforms in a stable order.
    pub fn default_uniforms(&self) -> Vec<(String, f32)> {
        self.uniforms
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

use anyhow::{Context, Result};
use renderer::{GeometryKind, RendererConfig};
use viewconfig::{GeometryLayout, ViewerConfig};

use crate::cli::{RunArgs, SourceArgs};

pub const DEFAULT_PRESET: &str = "transform";

/// Loads the layout named by `source` and applies its command-line overrides.
pub fn load_config(source: &SourceArgs) -> Result<ViewerConfig> {
    let mut config = match &source.config {
        Some(path) => ViewerConfig::from_file(path)
            .with_context(|| format!("failed to load viewer config {}", path.display()))?,
        None => {
            let name = source.preset.as_deref().unwrap_or(DEFAULT_PRESET);
            ViewerConfig::preset(name)?
        }
    };

    if let Some(dir) = &source.shader_dir {
        config.shaders = dir.clone();
    }
    if let Some(width) = source.fixed_width {
        config.fixed_width = width;
    }
    config.validate()?;
    tracing::debug!(
        name = config.display_name(),
        shaders = %config.shaders.display(),
        fixed_width = config.fixed_width,
        "resolved viewer config"
    );
    Ok(config)
}

pub fn geometry_kind(layout: GeometryLayout) -> GeometryKind {
    match layout {
        GeometryLayout::Quad => GeometryKind::Quad,
        GeometryLayout::SplitQuad => GeometryKind::SplitQuad,
    }
}

pub fn renderer_config(config: &ViewerConfig, args: &RunArgs) -> RendererConfig {
    RendererConfig {
        surface_size: args
            .size
            .unwrap_or((config.canvas.width, config.canvas.height)),
        shader_dir: config.shaders.clone(),
        geometry: geometry_kind(config.geometry),
        fixed_width: config.fixed_width,
        default_uniforms: config.default_uniforms(),
        color_space: args.color_space,
        initial_image: args.image.clone(),
        title: format!("quadview: {}", config.display_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use renderer::ColorSpaceMode;

    fn run_args(source: SourceArgs) -> RunArgs {
        RunArgs {
            image: Some(PathBuf::from("photo.png")),
            source,
            size: None,
            color_space: ColorSpaceMode::Linear,
        }
    }

    #[test]
    fn defaults_to_transform_preset() {
        let config = load_config(&SourceArgs::default()).unwrap();
        assert_eq!(config.display_name(), "transform");
    }

    #[test]
    fn overrides_replace_config_values() {
        let source = SourceArgs {
            preset: Some("camera".into()),
            shader_dir: Some(PathBuf::from("/tmp/glsl")),
            fixed_width: Some(1234),
            ..SourceArgs::default()
        };
        let config = load_config(&source).unwrap();
        assert_eq!(config.shaders, PathBuf::from("/tmp/glsl"));
        assert_eq!(config.fixed_width, 1234);
    }

    #[test]
    fn zero_width_override_is_rejected() {
        let source = SourceArgs {
            fixed_width: Some(0),
            ..SourceArgs::default()
        };
        assert!(load_config(&source).is_err());
    }

    #[test]
    fn maps_camera_preset_to_split_geometry() {
        let source = SourceArgs {
            preset: Some("camera".into()),
            ..SourceArgs::default()
        };
        let config = load_config(&source).unwrap();
        let renderer = renderer_config(&config, &run_args(source));
        assert_eq!(renderer.geometry, GeometryKind::SplitQuad);
        assert_eq!(renderer.fixed_width, 1000);
        assert_eq!(renderer.surface_size, (1000, 500));
        assert_eq!(renderer.color_space, ColorSpaceMode::Linear);
        assert_eq!(renderer.initial_image, Some(PathBuf::from("photo.png")));
        assert!(renderer
            .default_uniforms
            .iter()
            .any(|(name, value)| name == "earth_radius" && *value == 6_371_000.0));
    }

    #[test]
    fn explicit_size_wins_over_canvas() {
        let config = load_config(&SourceArgs::default()).unwrap();
        let mut args = run_args(SourceArgs::default());
        args.size = Some((320, 200));
        assert_eq!(renderer_config(&config, &args).surface_size, (320, 200));
    }
}

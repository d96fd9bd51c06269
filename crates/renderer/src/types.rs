use std::path::PathBuf;

/// Mesh uploaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryKind {
    /// Four 2D vertices, two triangles.
    #[default]
    Quad,
    /// Two side-by-side quads; every vertex carries a third float selecting
    /// its half-plane (0 = left, 1 = right).
    SplitQuad,
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Match browser canvas behaviour (gamma-encoded swapchain).
    #[default]
    Auto,
    /// Treat shader outputs/textures as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains/textures for conversion.
    Linear,
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels, before any image is loaded.
    pub surface_size: (u32, u32),
    /// Directory holding `vertex.glsl` and `fragment.glsl`.
    pub shader_dir: PathBuf,
    /// Mesh the shaders are written against.
    pub geometry: GeometryKind,
    /// Canvas width every loaded image is fitted to.
    pub fixed_width: u32,
    /// Uniform values applied right after the program is linked.
    pub default_uniforms: Vec<(String, f32)>,
    /// Desired color handling for swapchain/textures.
    pub color_space: ColorSpaceMode,
    /// Image queued for intake as soon as the window is up.
    pub initial_image: Option<PathBuf>,
    /// Window title prefix.
    pub title: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            shader_dir: PathBuf::from("shaders"),
            geometry: GeometryKind::default(),
            fixed_width: 800,
            default_uniforms: Vec::new(),
            color_space: ColorSpaceMode::default(),
            initial_image: None,
            title: "quadview".to_string(),
        }
    }
}

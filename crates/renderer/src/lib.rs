//! Renderer crate for quadview, an interactive image viewer that draws a
//! photo through a user-supplied GLSL program.
//!
//! The overall flow is:
//!
//! ```text
//!   quadview CLI
//!        │ RendererConfig + FieldPanel
//!        ▼
//!   Renderer::run ──▶ ViewerWindow ──▶ winit event loop ──▶ render_frame()
//!        ▲                  │   ▲                               │
//!        │     key presses ─┘   └─ decoded images (intake)      └─▶ uniform block
//! ```
//!
//! Shaders are read from `<shader_dir>/vertex.glsl` and
//! `<shader_dir>/fragment.glsl`. Both stages share one std140 uniform block at
//! `set = 0, binding = 0` whose float members are addressed by name; the image
//! is bound at `set = 1` as a `texture2D` (binding 0) and `sampler`
//! (binding 1).

mod canvas;
mod compile;
mod error;
mod gpu;
mod intake;
mod types;
mod window;

use anyhow::Result;
use panel::FieldPanel;

pub use canvas::{CanvasSize, SCREEN_RATIO_UNIFORM};
pub use compile::{check_shaders, ShaderReport, ShaderStage};
pub use error::ShaderError;
pub use intake::{decode_image, DecodedImage, IntakeOutcome};
pub use types::{ColorSpaceMode, GeometryKind, RendererConfig};

/// Entry point that owns the viewer configuration and its field panel.
pub struct Renderer {
    config: RendererConfig,
    panel: FieldPanel,
}

impl Renderer {
    pub fn new(config: RendererConfig, panel: FieldPanel) -> Self {
        Self { config, panel }
    }

    /// Opens the window and blocks until it is closed.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            shader_dir = %self.config.shader_dir.display(),
            geometry = ?self.config.geometry,
            fields = self.panel.fields().len(),
            "starting viewer"
        );
        window::run(self.config, self.panel)
    }
}

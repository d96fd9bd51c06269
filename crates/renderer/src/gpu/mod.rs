//! GPU side of the viewer.
//!
//! - `context` owns wgpu instance/device/surface wiring and rebuilds the
//!   swapchain when the canvas changes size.
//! - `pipeline` links a vertex/fragment pair into a render pipeline after
//!   checking the stage interface and the shared uniform block.
//! - `uniforms` reflects the uniform block and keeps a CPU shadow of it
//!   addressed by uniform name.
//! - `geometry` holds the quad and split-quad meshes.
//! - `texture` owns the image texture, its mip chain and sampler.
//! - `state` glues everything together for `window`.

mod context;
mod geometry;
pub(crate) mod pipeline;
mod state;
mod texture;
pub(crate) mod uniforms;

pub(crate) use state::RenderState;

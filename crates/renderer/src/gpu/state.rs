use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::canvas::{CanvasSize, SCREEN_RATIO_UNIFORM};
use crate::compile::{self, ShaderStage};
use crate::error::ShaderError;
use crate::intake::DecodedImage;
use crate::types::{GeometryKind, RendererConfig};

use super::context::GpuContext;
use super::geometry::Geometry;
use super::pipeline::{PipelineLayouts, ShaderProgram, DEPTH_FORMAT};
use super::texture::TextureManager;
use super::uniforms::UniformCache;

struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTarget {
    fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Everything needed to draw one frame: program, geometry, uniforms, the
/// image texture and the render targets.
pub(crate) struct RenderState {
    context: GpuContext,
    layouts: PipelineLayouts,
    program: ShaderProgram,
    geometry: Geometry,
    geometry_kind: GeometryKind,
    shader_dir: std::path::PathBuf,
    defaults: Vec<(String, f32)>,
    uniforms: UniformCache,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    textures: TextureManager,
    texture_bind_group: wgpu::BindGroup,
    depth: DepthTarget,
    canvas: CanvasSize,
    fixed_width: u32,
}

impl RenderState {
    /// Loads and links the shaders, uploads geometry, applies the default
    /// uniforms and sizes the canvas.
    pub fn new<T>(target: &T, initial_size: PhysicalSize<u32>, config: &RendererConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, config.color_space)?;
        let layouts = PipelineLayouts::new(&context.device);

        let vertex = compile::load_shader(&config.shader_dir, ShaderStage::Vertex)?;
        let fragment = compile::load_shader(&config.shader_dir, ShaderStage::Fragment)?;
        let program = ShaderProgram::link(
            &context.device,
            &layouts,
            context.surface_format,
            &vertex,
            &fragment,
            config.geometry,
        )?;
        let geometry = Geometry::upload(&context.device, config.geometry);

        let uniforms = UniformCache::new(program.uniforms.clone());
        let uniform_buffer = create_uniform_buffer(&context.device, uniforms.buffer_size());
        let uniform_bind_group = layouts.uniform_bind_group(&context.device, &uniform_buffer);

        let textures = TextureManager::new(
            &context.device,
            &context.queue,
            context.color_space,
            context.max_dimension,
        );
        let texture_bind_group =
            layouts.texture_bind_group(&context.device, textures.view(), textures.sampler());

        let canvas = CanvasSize::fit_to_width(
            config.fixed_width,
            initial_size.width,
            initial_size.height,
        );
        let depth = DepthTarget::new(&context.device, context.size);

        let mut state = Self {
            context,
            layouts,
            program,
            geometry,
            geometry_kind: config.geometry,
            shader_dir: config.shader_dir.clone(),
            defaults: config.default_uniforms.clone(),
            uniforms,
            uniform_buffer,
            uniform_bind_group,
            textures,
            texture_bind_group,
            depth,
            canvas,
            fixed_width: config.fixed_width,
        };
        let defaults = state.defaults.clone();
        state.uniforms.set_uniforms(defaults);
        state.resize_canvas(canvas);
        Ok(state)
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Reconfigures the surface and depth target for `size` and publishes
    /// the new screen ratio.
    pub fn resize_canvas(&mut self, size: CanvasSize) -> CanvasSize {
        let applied = CanvasSize::from(self.context.resize(size.into()));
        self.depth = DepthTarget::new(&self.context.device, applied.into());
        self.canvas = applied;
        self.set_uniforms([(SCREEN_RATIO_UNIFORM, applied.screen_ratio())]);
        tracing::debug!(
            width = applied.width,
            height = applied.height,
            ratio = applied.screen_ratio(),
            "canvas resized"
        );
        applied
    }

    pub fn set_uniforms<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        self.uniforms.set_uniforms(values);
        self.flush_uniforms();
    }

    pub fn uniform(&self, name: &str) -> Option<f32> {
        self.uniforms.get(name)
    }

    /// Resizes the canvas to the image's aspect ratio and uploads it.
    pub fn update_image(&mut self, image: &DecodedImage) -> CanvasSize {
        let canvas = CanvasSize::fit_to_width(self.fixed_width, image.width(), image.height());
        let canvas = self.resize_canvas(canvas);
        let rebound = self
            .textures
            .update_image(&self.context.device, &self.context.queue, image);
        if rebound {
            self.texture_bind_group = self.layouts.texture_bind_group(
                &self.context.device,
                self.textures.view(),
                self.textures.sampler(),
            );
        }
        canvas
    }

    /// Rebuilds the program from disk. On failure the running program is
    /// left untouched.
    pub fn reload_program(&mut self) -> Result<(), ShaderError> {
        let vertex = compile::load_shader(&self.shader_dir, ShaderStage::Vertex)?;
        let fragment = compile::load_shader(&self.shader_dir, ShaderStage::Fragment)?;
        let program = ShaderProgram::link(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            &vertex,
            &fragment,
            self.geometry_kind,
        )?;

        let mut uniforms = UniformCache::new(program.uniforms.clone());
        uniforms.set_uniforms(self.defaults.iter().map(|(name, value)| (name.as_str(), *value)));
        uniforms.carry_over(&self.uniforms);
        uniforms.set(SCREEN_RATIO_UNIFORM, self.canvas.screen_ratio());

        if uniforms.buffer_size() != self.uniforms.buffer_size() {
            self.uniform_buffer = create_uniform_buffer(&self.context.device, uniforms.buffer_size());
            self.uniform_bind_group = self
                .layouts
                .uniform_bind_group(&self.context.device, &self.uniform_buffer);
        }

        let previous = std::mem::replace(&mut self.program, program);
        drop(previous);
        self.uniforms = uniforms;
        self.flush_uniforms();
        Ok(())
    }

    /// Reapplies the surface configuration after it was lost or outdated.
    pub fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    pub fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.flush_uniforms();
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let size = self.context.size;
            render_pass.set_viewport(0.0, 0.0, size.width as f32, size.height as f32, 0.0, 1.0);
            render_pass.set_pipeline(&self.program.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.texture_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.geometry.vertex_buffer.slice(..));
            render_pass.set_index_buffer(
                self.geometry.index_buffer.slice(..),
                wgpu::IndexFormat::Uint16,
            );
            render_pass.draw_indexed(0..self.geometry.index_count, 0, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn flush_uniforms(&mut self) {
        if self.uniforms.take_dirty() {
            self.context
                .queue
                .write_buffer(&self.uniform_buffer, 0, self.uniforms.bytes());
        }
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

use std::collections::BTreeSet;

use wgpu::naga;

use crate::compile::{self, CompiledShader, ShaderStage};
use crate::error::ShaderError;
use crate::types::GeometryKind;

use super::uniforms::UniformLayout;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Bind group layouts shared by every program the viewer links: the uniform
/// block at set 0 and the image texture plus sampler at set 1.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("image texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            uniform_layout,
            texture_layout,
        }
    }

    pub fn uniform_bind_group(&self, device: &wgpu::Device, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("image texture bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

/// A linked vertex/fragment pair.
pub(crate) struct ShaderProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub uniforms: UniformLayout,
}

impl ShaderProgram {
    /// Links the two stages against the geometry's vertex layout. Interface
    /// mismatches and pipeline validation failures surface as
    /// [`ShaderError::Link`].
    pub fn link(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
        vertex: &CompiledShader,
        fragment: &CompiledShader,
        geometry: GeometryKind,
    ) -> Result<Self, ShaderError> {
        let uniforms = link_interface(vertex, fragment, geometry)?;
        let vertex_module = compile::create_module(device, vertex)?;
        let fragment_module = compile::create_module(device, fragment)?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("program layout"),
            bind_group_layouts: &[&layouts.uniform_layout, &layouts.texture_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("program"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[geometry.vertex_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::link(error.to_string()));
        }

        tracing::debug!(
            uniforms = ?uniforms.float_names().collect::<Vec<_>>(),
            ?geometry,
            "linked shader program"
        );
        Ok(Self { pipeline, uniforms })
    }
}

/// Checks that the stages fit together and with the geometry, returning the
/// merged uniform block layout.
pub(crate) fn link_interface(
    vertex: &CompiledShader,
    fragment: &CompiledShader,
    geometry: GeometryKind,
) -> Result<UniformLayout, ShaderError> {
    let vertex_entry = entry_point(vertex)?;
    let fragment_entry = entry_point(fragment)?;

    let mut vertex_inputs = BTreeSet::new();
    for argument in &vertex_entry.function.arguments {
        collect_locations(&vertex.module, argument.ty, argument.binding.as_ref(), &mut vertex_inputs);
    }
    let provided: BTreeSet<u32> = geometry
        .attributes()
        .iter()
        .map(|attribute| attribute.shader_location)
        .collect();
    if let Some(missing) = vertex_inputs.difference(&provided).next() {
        return Err(ShaderError::link(format!(
            "vertex input at location {missing} is not provided by the {geometry:?} geometry"
        )));
    }

    let mut vertex_outputs = BTreeSet::new();
    if let Some(result) = &vertex_entry.function.result {
        collect_locations(&vertex.module, result.ty, result.binding.as_ref(), &mut vertex_outputs);
    }
    let mut fragment_inputs = BTreeSet::new();
    for argument in &fragment_entry.function.arguments {
        collect_locations(&fragment.module, argument.ty, argument.binding.as_ref(), &mut fragment_inputs);
    }
    if let Some(missing) = fragment_inputs.difference(&vertex_outputs).next() {
        return Err(ShaderError::link(format!(
            "fragment input at location {missing} has no matching vertex output"
        )));
    }

    UniformLayout::merge(
        UniformLayout::reflect(&vertex.module),
        UniformLayout::reflect(&fragment.module),
    )
    .map_err(ShaderError::link)
}

fn entry_point(shader: &CompiledShader) -> Result<&naga::EntryPoint, ShaderError> {
    let expected = match shader.stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    shader
        .module
        .entry_points
        .iter()
        .find(|entry| entry.stage == expected)
        .ok_or_else(|| ShaderError::link(format!("{} shader has no entry point", shader.stage)))
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeSet<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location);
        }
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

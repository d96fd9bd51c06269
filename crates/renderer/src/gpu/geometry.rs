use wgpu::util::DeviceExt;

use crate::types::GeometryKind;

const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0, -1.0];
const QUAD_INDICES: [u16; 6] = [0, 1, 3, 3, 1, 2];
const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

// x, y, side
#[rustfmt::skip]
const SPLIT_VERTICES: [f32; 24] = [
    -1.0, -1.0, 0.0,
    -1.0,  1.0, 0.0,
     0.0, -1.0, 0.0,
     0.0,  1.0, 0.0,
     0.0, -1.0, 1.0,
     0.0,  1.0, 1.0,
     1.0, -1.0, 1.0,
     1.0,  1.0, 1.0,
];
const SPLIT_INDICES: [u16; 12] = [0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7];
const SPLIT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32];

impl GeometryKind {
    pub(crate) fn vertices(self) -> &'static [f32] {
        match self {
            GeometryKind::Quad => &QUAD_VERTICES,
            GeometryKind::SplitQuad => &SPLIT_VERTICES,
        }
    }

    pub(crate) fn indices(self) -> &'static [u16] {
        match self {
            GeometryKind::Quad => &QUAD_INDICES,
            GeometryKind::SplitQuad => &SPLIT_INDICES,
        }
    }

    pub(crate) fn attributes(self) -> &'static [wgpu::VertexAttribute] {
        match self {
            GeometryKind::Quad => &QUAD_ATTRIBUTES,
            GeometryKind::SplitQuad => &SPLIT_ATTRIBUTES,
        }
    }

    /// Floats per vertex.
    pub(crate) fn components(self) -> usize {
        match self {
            GeometryKind::Quad => 2,
            GeometryKind::SplitQuad => 3,
        }
    }

    pub(crate) fn vertex_layout(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: (self.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes(),
        }
    }
}

/// Vertex and index buffers for one [`GeometryKind`], uploaded once.
pub(crate) struct Geometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl Geometry {
    pub fn upload(device: &wgpu::Device, kind: GeometryKind) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("geometry vertices"),
            contents: bytemuck::cast_slice(kind.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("geometry indices"),
            contents: bytemuck::cast_slice(kind.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        tracing::debug!(?kind, index_count = kind.indices().len(), "uploaded geometry");
        Self {
            vertex_buffer,
            index_buffer,
            index_count: kind.indices().len() as u32,
        }
    }
}

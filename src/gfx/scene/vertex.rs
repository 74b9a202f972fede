//! # Vertex Data Structures
//!
//! GPU-compatible vertex format shared by every shading program.

use crate::io::PlyVertex;

/// A mesh vertex as uploaded to the GPU.
///
/// # Memory Layout
///
/// `#[repr(C)]` keeps the field order fixed so the attribute offsets below
/// match the shader locations:
///
/// - location 0: position `vec3<f32>`
/// - location 1: normal `vec3<f32>`
/// - location 2: color `vec4<f32>`
/// - location 3: texture coordinate `vec2<f32>`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl Vertex3D {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2,
    ];

    /// Vertex buffer layout with one element per vertex.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        Self::layout(wgpu::VertexStepMode::Vertex)
    }

    /// The same layout stepped per instance.
    ///
    /// The point program draws one screen-space quad per mesh vertex, so the
    /// vertex buffer is bound as instance data there.
    pub fn desc_instanced() -> wgpu::VertexBufferLayout<'static> {
        Self::layout(wgpu::VertexStepMode::Instance)
    }

    fn layout(step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&PlyVertex> for Vertex3D {
    fn from(vertex: &PlyVertex) -> Self {
        Self {
            position: vertex.position,
            normal: vertex.normal,
            color: vertex.color,
            tex_coord: vertex.tex_coord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_stride_matches_attributes() {
        assert_eq!(std::mem::size_of::<Vertex3D>(), 48);

        let layout = Vertex3D::desc();
        assert_eq!(layout.array_stride, 48);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 40]);
        assert_eq!(
            Vertex3D::desc_instanced().step_mode,
            wgpu::VertexStepMode::Instance
        );
    }
}

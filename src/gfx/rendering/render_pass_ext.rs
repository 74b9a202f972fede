//! Render pass extension for issuing a planned mesh draw

use super::render_engine::DrawCall;
use crate::gfx::scene::GpuMesh;

/// Binds mesh buffers and issues the draw described by a [`DrawCall`]
pub trait DrawMesh {
    /// Returns false, drawing nothing, when the buffer the call needs was
    /// never uploaded
    fn draw_mesh(&mut self, mesh: &GpuMesh, call: DrawCall) -> bool;
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &GpuMesh, call: DrawCall) -> bool {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));

        match call {
            DrawCall::IndexedTriangles { index_count }
            | DrawCall::WireframePolygons { index_count } => {
                let Some(index_buffer) = &mesh.index_buffer else {
                    return false;
                };
                self.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                self.draw_indexed(0..index_count, 0, 0..1);
            }
            DrawCall::IndexedLines { index_count } => {
                let Some(edge_buffer) = &mesh.edge_buffer else {
                    return false;
                };
                self.set_index_buffer(edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
                self.draw_indexed(0..index_count, 0, 0..1);
            }
            DrawCall::InstancedPoints { instance_count } => {
                self.draw(0..6, 0..instance_count);
            }
        }
        true
    }
}

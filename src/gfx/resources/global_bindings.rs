//! Per-draw uniform bindings
//!
//! Every shading program reads the same [`DrawUniforms`] block at group 0,
//! binding 0. The orchestrator rewrites it right before each draw.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    gfx::{
        camera::{convert_matrix4_to_array, normal_matrix, Camera},
        rendering::settings::RenderSettings,
    },
    wgpu_utils::{binding_types, uniform_buffer::UniformBuffer},
};

/// Uniform block shared by all shading programs.
///
/// MUST match the `DrawUniforms` struct in the WGSL sources exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Inverse-transpose of the model matrix
    pub normal_matrix: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    pub light_position: [f32; 4],
    /// RGB premultiplied by intensity, w unused
    pub light_color: [f32; 4],
    pub wireframe_color: [f32; 4],
    /// x = shininess, y = point size in pixels, z/w = viewport size
    pub params: [f32; 4],
}
// 4 * 64 + 5 * 16 = 336 bytes

impl Default for DrawUniforms {
    fn default() -> Self {
        let identity = convert_matrix4_to_array(Matrix4::identity());
        Self {
            model: identity,
            view: identity,
            projection: identity,
            normal_matrix: identity,
            view_position: [0.0, 0.0, 0.0, 1.0],
            light_position: [0.0, 0.0, 0.0, 1.0],
            light_color: [1.0; 4],
            wireframe_color: [1.0; 4],
            params: [32.0, 5.0, 1.0, 1.0],
        }
    }
}

impl DrawUniforms {
    /// Collects the transforms, light and mode parameters for one draw
    pub fn compose(
        camera: &Camera,
        model: Matrix4<f32>,
        settings: &RenderSettings,
        viewport: (u32, u32),
    ) -> Self {
        let eye = camera.position();
        let light = &settings.light;
        let intensity = light.intensity;

        Self {
            model: convert_matrix4_to_array(model),
            view: convert_matrix4_to_array(camera.view_matrix()),
            projection: convert_matrix4_to_array(camera.projection_matrix()),
            normal_matrix: convert_matrix4_to_array(normal_matrix(model)),
            view_position: [eye.x, eye.y, eye.z, 1.0],
            light_position: [light.position[0], light.position[1], light.position[2], 1.0],
            light_color: [
                light.color[0] * intensity,
                light.color[1] * intensity,
                light.color[2] * intensity,
                1.0,
            ],
            wireframe_color: settings.wireframe_color,
            params: [
                settings.shininess,
                settings.point_size,
                viewport.0.max(1) as f32,
                viewport.1.max(1) as f32,
            ],
        }
    }
}

/// Point light used by the lit program
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [5.0, 5.0, 5.0],
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

pub type DrawUBO = UniformBuffer<DrawUniforms>;

/// Layout, buffer and bind group for [`DrawUniforms`]
pub struct DrawBindings {
    layout: wgpu::BindGroupLayout,
    ubo: DrawUBO,
    bind_group: wgpu::BindGroup,
}

impl DrawBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Layout"),
            entries: &[binding_types::rendering_entry(
                0,
                binding_types::sized_uniform::<DrawUniforms>(),
            )],
        });

        let ubo = DrawUBO::new(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniforms Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }],
        });

        Self {
            layout,
            ubo,
            bind_group,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn update(&mut self, queue: &wgpu::Queue, uniforms: DrawUniforms) {
        self.ubo.update_content(queue, uniforms);
    }
}

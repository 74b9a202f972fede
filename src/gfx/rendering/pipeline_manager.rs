//! Render pipeline management for wgpu
//!
//! Compiles WGSL modules and builds render pipelines from a builder-style
//! [`PipelineConfig`]. Shader and pipeline creation run inside a validation
//! error scope so a bad program surfaces as an error instead of a device
//! panic.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::error::{Result, ViewerError};
use crate::gfx::resources::TextureResource;
use crate::gfx::scene::vertex::Vertex3D;

/// How the mesh vertex buffer is stepped by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexStepping {
    PerVertex,
    /// One instance per mesh vertex, used for screen-space point quads
    PerInstance,
}

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub cull_mode: Option<Face>,
    pub depth_format: Option<TextureFormat>,
    pub color_format: TextureFormat,
    pub blend: Option<BlendState>,
    pub vertex_stepping: VertexStepping,
}

impl Default for PipelineConfig {
    /// Depth test `Less`, back-face culling and alpha blending
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "shader.wgsl".to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            polygon_mode: PolygonMode::Fill,
            cull_mode: Some(Face::Back),
            depth_format: Some(TextureResource::DEPTH_FORMAT),
            color_format: TextureFormat::Bgra8Unorm,
            blend: Some(BlendState::ALPHA_BLENDING),
            vertex_stepping: VertexStepping::PerVertex,
        }
    }
}

impl PipelineConfig {
    pub fn default_with_shader(shader: &str) -> Self {
        Self {
            shader: shader.to_string(),
            label: shader.to_string(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_format = format;
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    /// `PolygonMode::Line` requires `Features::POLYGON_MODE_LINE`
    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn with_vertex_stepping(mut self, stepping: VertexStepping) -> Self {
        self.vertex_stepping = stepping;
        self
    }
}

/// Owns compiled shader modules and the pipelines built from them
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<String, RenderPipeline>,
    shader_modules: HashMap<String, ShaderModule>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            shader_modules: HashMap::new(),
        }
    }

    /// Compiles a WGSL module and stores it under `name`.
    ///
    /// On failure any module previously stored under `name` is kept.
    pub fn load_shader(&mut self, name: &str, source: &str) -> Result<()> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ViewerError::Resource(format!(
                "shader '{}' failed to compile: {}",
                name, error
            )));
        }

        self.shader_modules.insert(name.to_string(), shader_module);
        Ok(())
    }

    /// Builds a pipeline immediately, replacing any pipeline named `name`
    /// only when creation succeeds
    pub fn create_pipeline(&mut self, name: &str, config: PipelineConfig) -> Result<()> {
        let pipeline = self.create_pipeline_from_config(name, &config)?;
        self.pipelines.insert(name.to_string(), pipeline);
        Ok(())
    }

    pub fn get_pipeline(&self, name: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(name)
    }

    pub fn has_pipeline(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    fn create_pipeline_from_config(&self, name: &str, config: &PipelineConfig) -> Result<RenderPipeline> {
        let shader = self.shader_modules.get(&config.shader).ok_or_else(|| {
            ViewerError::Resource(format!("shader '{}' not loaded", config.shader))
        })?;

        self.device.push_error_scope(ErrorFilter::Validation);

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", name)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let vertex_buffers = [match config.vertex_stepping {
            VertexStepping::PerVertex => Vertex3D::desc(),
            VertexStepping::PerInstance => Vertex3D::desc_instanced(),
        }];

        let color_targets = [Some(ColorTargetState {
            format: config.color_format,
            blend: config.blend,
            write_mask: ColorWrites::ALL,
        })];

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: config.polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ViewerError::Resource(format!(
                "pipeline '{}' creation failed: {}",
                name, error
            )));
        }

        Ok(pipeline)
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_pipelines: self.pipelines.len(),
            loaded_shaders: self.shader_modules.len(),
        }
    }
}

/// Statistics about pipeline manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub loaded_shaders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_carries_global_state() {
        let config = PipelineConfig::default_with_shader("lit");
        assert_eq!(config.shader, "lit");
        assert_eq!(config.cull_mode, Some(Face::Back));
        assert_eq!(config.depth_format, Some(TextureFormat::Depth32Float));
        assert_eq!(config.blend, Some(BlendState::ALPHA_BLENDING));
        assert_eq!(config.polygon_mode, PolygonMode::Fill);
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::default()
            .with_label("points")
            .with_cull_mode(None)
            .with_primitive_topology(PrimitiveTopology::LineList)
            .with_vertex_stepping(VertexStepping::PerInstance)
            .with_color_format(TextureFormat::Rgba8Unorm);
        assert_eq!(config.label, "points");
        assert_eq!(config.cull_mode, None);
        assert_eq!(config.primitive_topology, PrimitiveTopology::LineList);
        assert_eq!(config.vertex_stepping, VertexStepping::PerInstance);
        assert_eq!(config.color_format, TextureFormat::Rgba8Unorm);
    }
}

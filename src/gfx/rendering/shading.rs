//! # Shading Programs
//!
//! Four built-in programs (unlit, lit, wireframe, point) plus one optional
//! caller-supplied program. [`select_shading_mode`] decides which one a frame
//! uses; [`ShadingPipeline`] owns the compiled pipelines.
//!
//! All programs share the `DrawUniforms` block and the [`Vertex3D`] layout.
//! Custom sources get the same declarations prepended, so they only need to
//! define `vs_main` and `fs_main`.
//!
//! [`Vertex3D`]: crate::gfx::scene::Vertex3D

use std::sync::Arc;

use super::pipeline_manager::{PipelineConfig, PipelineManager, VertexStepping};
use crate::error::Result;
use crate::gfx::resources::GpuContext;

/// Declarations shared by every program
pub const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");

const UNLIT_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/unlit.wgsl")
);
const LIT_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/lit.wgsl")
);
const WIREFRAME_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/wireframe.wgsl")
);
const POINT_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/point.wgsl")
);

/// Top-level drawing style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Solid,
    Wireframe,
    Points,
}

/// Program used in [`RenderMode::Solid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderType {
    Unlit,
    #[default]
    Lit,
    Custom,
}

/// A concrete shading program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    Unlit,
    Lit,
    Wireframe,
    Point,
    Custom,
}

impl ShadingMode {
    pub const BUILT_IN: [ShadingMode; 4] = [
        ShadingMode::Unlit,
        ShadingMode::Lit,
        ShadingMode::Wireframe,
        ShadingMode::Point,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShadingMode::Unlit => "unlit",
            ShadingMode::Lit => "lit",
            ShadingMode::Wireframe => "wireframe",
            ShadingMode::Point => "point",
            ShadingMode::Custom => "custom",
        }
    }

    fn built_in_source(self) -> Option<&'static str> {
        match self {
            ShadingMode::Unlit => Some(UNLIT_WGSL),
            ShadingMode::Lit => Some(LIT_WGSL),
            ShadingMode::Wireframe => Some(WIREFRAME_WGSL),
            ShadingMode::Point => Some(POINT_WGSL),
            ShadingMode::Custom => None,
        }
    }
}

/// Program the render and shader modes ask for, before availability
pub fn requested_shading_mode(render_mode: RenderMode, shader_type: ShaderType) -> ShadingMode {
    match render_mode {
        RenderMode::Solid => match shader_type {
            ShaderType::Unlit => ShadingMode::Unlit,
            ShaderType::Lit => ShadingMode::Lit,
            ShaderType::Custom => ShadingMode::Custom,
        },
        RenderMode::Wireframe => ShadingMode::Wireframe,
        RenderMode::Points => ShadingMode::Point,
    }
}

/// Picks the program for a frame.
///
/// An unavailable program falls back to unlit; `None` when unlit is
/// unavailable too.
pub fn select_shading_mode(
    render_mode: RenderMode,
    shader_type: ShaderType,
    is_available: impl Fn(ShadingMode) -> bool,
) -> Option<ShadingMode> {
    let requested = requested_shading_mode(render_mode, shader_type);
    if is_available(requested) {
        Some(requested)
    } else if is_available(ShadingMode::Unlit) {
        Some(ShadingMode::Unlit)
    } else {
        None
    }
}

/// Compiled shading programs for one device
pub struct ShadingPipeline {
    manager: PipelineManager,
    uniform_layout: wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
    line_polygons: bool,
}

impl ShadingPipeline {
    /// Builds every built-in program.
    ///
    /// A program that fails to build is logged and left unavailable.
    pub fn new(context: &GpuContext, uniform_layout: &wgpu::BindGroupLayout) -> Self {
        let mut pipeline = Self {
            manager: PipelineManager::new(Arc::clone(&context.device)),
            uniform_layout: uniform_layout.clone(),
            color_format: context.color_format,
            line_polygons: context.supports_line_polygons(),
        };

        for mode in ShadingMode::BUILT_IN {
            if let Some(source) = mode.built_in_source() {
                if let Err(e) = pipeline.build(mode, source) {
                    log::warn!("Shading program '{}' unavailable: {}", mode.label(), e);
                }
            }
        }

        let stats = pipeline.manager.get_stats();
        log::info!(
            "Built {} shading programs (line polygons: {})",
            stats.total_pipelines,
            pipeline.line_polygons
        );
        pipeline
    }

    /// Compiles `source` as the custom program.
    ///
    /// `source` must define `vs_main` and `fs_main`; the shared uniform and
    /// vertex declarations are prepended. On failure the previous custom
    /// program stays in place.
    pub fn set_custom_program(&mut self, source: &str) -> Result<()> {
        let full_source = format!("{}{}", COMMON_WGSL, source);
        self.build(ShadingMode::Custom, &full_source)
            .inspect_err(|e| log::warn!("Custom shading program rejected: {}", e))
    }

    pub fn is_available(&self, mode: ShadingMode) -> bool {
        self.manager.has_pipeline(mode.label())
    }

    pub fn program(&self, mode: ShadingMode) -> Option<&wgpu::RenderPipeline> {
        self.manager.get_pipeline(mode.label())
    }

    pub fn select(&self, render_mode: RenderMode, shader_type: ShaderType) -> Option<ShadingMode> {
        select_shading_mode(render_mode, shader_type, |mode| self.is_available(mode))
    }

    /// Whether the wireframe program rasterizes triangles as lines
    pub fn uses_line_polygons(&self) -> bool {
        self.line_polygons
    }

    fn build(&mut self, mode: ShadingMode, source: &str) -> Result<()> {
        let shader_name = format!("{}.wgsl", mode.label());
        self.manager.load_shader(&shader_name, source)?;
        let config = self.config_for(mode, &shader_name);
        self.manager.create_pipeline(mode.label(), config)
    }

    fn config_for(&self, mode: ShadingMode, shader: &str) -> PipelineConfig {
        let config = PipelineConfig::default_with_shader(shader)
            .with_label(mode.label())
            .with_color_format(self.color_format)
            .with_bind_group_layouts(vec![self.uniform_layout.clone()]);

        match mode {
            ShadingMode::Wireframe if self.line_polygons => {
                config.with_polygon_mode(wgpu::PolygonMode::Line)
            }
            ShadingMode::Wireframe => config
                .with_primitive_topology(wgpu::PrimitiveTopology::LineList)
                .with_cull_mode(None),
            ShadingMode::Point => config
                .with_vertex_stepping(VertexStepping::PerInstance)
                .with_cull_mode(None),
            ShadingMode::Unlit | ShadingMode::Lit | ShadingMode::Custom => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_available(_: ShadingMode) -> bool {
        true
    }

    #[test]
    fn test_render_mode_picks_category() {
        for shader_type in [ShaderType::Unlit, ShaderType::Lit, ShaderType::Custom] {
            assert_eq!(
                select_shading_mode(RenderMode::Wireframe, shader_type, all_available),
                Some(ShadingMode::Wireframe)
            );
            assert_eq!(
                select_shading_mode(RenderMode::Points, shader_type, all_available),
                Some(ShadingMode::Point)
            );
        }
    }

    #[test]
    fn test_solid_mode_uses_shader_type() {
        assert_eq!(
            select_shading_mode(RenderMode::Solid, ShaderType::Unlit, all_available),
            Some(ShadingMode::Unlit)
        );
        assert_eq!(
            select_shading_mode(RenderMode::Solid, ShaderType::Lit, all_available),
            Some(ShadingMode::Lit)
        );
        assert_eq!(
            select_shading_mode(RenderMode::Solid, ShaderType::Custom, all_available),
            Some(ShadingMode::Custom)
        );
    }

    #[test]
    fn test_missing_custom_program_falls_back_to_unlit() {
        let selected = select_shading_mode(RenderMode::Solid, ShaderType::Custom, |mode| {
            mode != ShadingMode::Custom
        });
        assert_eq!(selected, Some(ShadingMode::Unlit));
    }

    #[test]
    fn test_any_missing_variant_falls_back_to_unlit() {
        let only_unlit = |mode: ShadingMode| mode == ShadingMode::Unlit;
        assert_eq!(
            select_shading_mode(RenderMode::Points, ShaderType::Lit, only_unlit),
            Some(ShadingMode::Unlit)
        );
        assert_eq!(
            select_shading_mode(RenderMode::Wireframe, ShaderType::Lit, only_unlit),
            Some(ShadingMode::Unlit)
        );
    }

    #[test]
    fn test_nothing_selected_without_unlit() {
        let selected = select_shading_mode(RenderMode::Solid, ShaderType::Custom, |mode| {
            mode == ShadingMode::Lit
        });
        assert_eq!(selected, None);
    }

    #[test]
    fn test_built_in_sources_share_declarations() {
        for mode in ShadingMode::BUILT_IN {
            let source = mode.built_in_source().unwrap();
            assert!(source.starts_with(COMMON_WGSL));
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
        }
        assert!(ShadingMode::Custom.built_in_source().is_none());
    }
}

//! WGPU-based render orchestration
//!
//! [`RenderEngine`] owns the mesh, the camera and the shading programs and
//! turns them into one draw per frame. CPU-side state can be configured
//! before a GPU context exists; [`RenderEngine::initialize`] attaches the
//! device later.

use std::path::Path;

use cgmath::{Matrix4, SquareMatrix};

use super::render_pass_ext::DrawMesh;
use super::settings::RenderSettings;
use super::shading::{RenderMode, ShaderType, ShadingMode, ShadingPipeline};
use crate::error::{Result, ViewerError};
use crate::gfx::{
    camera::Camera,
    resources::{DrawBindings, DrawUniforms, GpuContext, TextureResource},
    scene::{MeshData, MeshModel},
};
use crate::performance::PerformanceMonitor;

/// GPU work planned for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    /// Triangle list over the mesh indices
    IndexedTriangles { index_count: u32 },
    /// Triangle list rasterized as lines
    WireframePolygons { index_count: u32 },
    /// Line list over the unique edge indices
    IndexedLines { index_count: u32 },
    /// One screen-space quad per vertex
    InstancedPoints { instance_count: u32 },
}

/// What `render_frame` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No GPU context yet; nothing was submitted
    Uninitialized,
    /// Target cleared; no mesh, camera or usable program
    Cleared,
    Drawn { mode: ShadingMode, call: DrawCall },
}

/// Chooses the draw for `mode`; `None` when the mesh has nothing to draw in
/// that mode
pub fn plan_draw(mode: ShadingMode, mesh: &MeshData, line_polygons: bool) -> Option<DrawCall> {
    let non_zero = |count: usize| u32::try_from(count).ok().filter(|&c| c > 0);

    match mode {
        ShadingMode::Unlit | ShadingMode::Lit | ShadingMode::Custom => {
            non_zero(mesh.index_count()).map(|index_count| DrawCall::IndexedTriangles { index_count })
        }
        ShadingMode::Wireframe if line_polygons => non_zero(mesh.index_count())
            .map(|index_count| DrawCall::WireframePolygons { index_count }),
        ShadingMode::Wireframe => non_zero(mesh.edge_index_count())
            .map(|index_count| DrawCall::IndexedLines { index_count }),
        ShadingMode::Point => non_zero(mesh.vertex_count())
            .map(|instance_count| DrawCall::InstancedPoints { instance_count }),
    }
}

struct GpuState {
    context: GpuContext,
    shading: ShadingPipeline,
    bindings: DrawBindings,
    depth_texture: TextureResource,
}

/// Composes mesh, camera and shading into frames
pub struct RenderEngine {
    settings: RenderSettings,
    camera: Option<Camera>,
    mesh: Option<MeshModel>,
    model_matrix: Matrix4<f32>,
    viewport: (u32, u32),
    pending_custom_shader: Option<String>,
    /// Why the last custom program was rejected, if it was
    custom_shader_error: Option<String>,
    gpu: Option<GpuState>,
    performance: PerformanceMonitor,
}

impl RenderEngine {
    /// Creates an engine with no GPU context, mesh or camera
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            camera: None,
            mesh: None,
            model_matrix: Matrix4::identity(),
            viewport: (1, 1),
            pending_custom_shader: None,
            custom_shader_error: None,
            gpu: None,
            performance: PerformanceMonitor::new(),
        }
    }

    /// Attaches a GPU context and builds every GPU resource.
    ///
    /// Calling it again while initialized does nothing.
    pub fn initialize(&mut self, context: GpuContext) {
        if self.gpu.is_some() {
            log::debug!("RenderEngine already initialized");
            return;
        }

        let bindings = DrawBindings::new(&context.device);
        let mut shading = ShadingPipeline::new(&context, bindings.layout());

        if let Some(source) = self.pending_custom_shader.take() {
            let result = shading.set_custom_program(&source);
            if let Err(e) = &result {
                log::error!("Pending custom shader not installed: {}", e);
            }
            self.record_custom_shader(&result);
        }

        let depth_texture = TextureResource::create_depth_texture(
            &context.device,
            self.viewport.0,
            self.viewport.1,
            "Depth Texture",
        );

        if let Some(mesh) = self.mesh.as_mut() {
            mesh.upload(&context.device);
        }

        log::info!(
            "RenderEngine initialized on {} ({}x{})",
            context.adapter_info.name,
            self.viewport.0,
            self.viewport.1
        );

        self.gpu = Some(GpuState {
            context,
            shading,
            bindings,
            depth_texture,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Updates the viewport, camera aspect ratio and depth buffer.
    ///
    /// Zero sizes are ignored. The depth buffer is only recreated when its
    /// size changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.viewport = (width, height);

        if let Some(camera) = self.camera.as_mut() {
            if let Err(e) = camera.set_aspect_ratio(width as f32 / height as f32) {
                log::warn!("Aspect ratio not applied: {}", e);
            }
        }

        let needs_depth = |gpu: &&mut GpuState| gpu.depth_texture.size() != (width, height);
        if let Some(gpu) = self.gpu.as_mut().filter(needs_depth) {
            gpu.depth_texture = TextureResource::create_depth_texture(
                &gpu.context.device,
                width,
                height,
                "Depth Texture",
            );
        }
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Clears `target` and draws the mesh into it.
    ///
    /// `target` must use the context's color format. A target whose size
    /// differs from the viewport triggers a resize first.
    pub fn render_frame(&mut self, target: &wgpu::Texture) -> Result<FrameOutcome> {
        if self.gpu.is_none() {
            return Ok(FrameOutcome::Uninitialized);
        }

        let target_size = (target.width(), target.height());
        if target_size != self.viewport {
            self.resize(target_size.0, target_size.1);
        }

        self.performance.begin_frame();
        let outcome = self.encode_frame(target);
        self.performance.end_frame();

        let (draw_calls, vertex_count) = match outcome {
            Ok(FrameOutcome::Drawn { .. }) => (1, self.vertex_count() as u32),
            _ => (0, 0),
        };
        self.performance.update_render_stats(draw_calls, vertex_count);

        outcome
    }

    fn encode_frame(&mut self, target: &wgpu::Texture) -> Result<FrameOutcome> {
        let plan = self.plan_frame();

        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(FrameOutcome::Uninitialized);
        };

        if let (Some(_), Some(camera)) = (plan, self.camera.as_ref()) {
            let uniforms =
                DrawUniforms::compose(camera, self.model_matrix, &self.settings, self.viewport);
            gpu.bindings.update(&gpu.context.queue, uniforms);
        }

        let device = &gpu.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let mut drawn = None;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.settings.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let gpu_mesh = self.mesh.as_ref().and_then(MeshModel::gpu);
            if let (Some((mode, call)), Some(gpu_mesh)) = (plan, gpu_mesh) {
                if let Some(pipeline) = gpu.shading.program(mode) {
                    render_pass.set_pipeline(pipeline);
                    render_pass.set_bind_group(0, gpu.bindings.bind_group(), &[]);
                    if render_pass.draw_mesh(gpu_mesh, call) {
                        drawn = Some((mode, call));
                    }
                }
            }
        }

        gpu.context.queue.submit(std::iter::once(encoder.finish()));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ViewerError::Resource(format!("frame submission failed: {}", error)));
        }

        Ok(match drawn {
            Some((mode, call)) => {
                log::debug!("Drew {:?} with {} program", call, mode.label());
                FrameOutcome::Drawn { mode, call }
            }
            None => FrameOutcome::Cleared,
        })
    }

    /// Program and draw for the current state, if anything is drawable
    fn plan_frame(&self) -> Option<(ShadingMode, DrawCall)> {
        let gpu = self.gpu.as_ref()?;
        self.camera.as_ref()?;
        let mesh = self.mesh.as_ref().filter(|mesh| mesh.has_data())?;

        let mode = gpu
            .shading
            .select(self.settings.render_mode, self.settings.shader_type)?;
        let line_polygons = gpu.shading.uses_line_polygons();
        plan_draw(mode, mesh.data(), line_polygons).map(|call| (mode, call))
    }

    // Mesh

    /// Parses `path` and replaces the current mesh.
    ///
    /// On failure the current mesh is left untouched.
    pub fn load_mesh<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        match MeshData::load(path) {
            Ok(data) => {
                self.set_mesh_data(data);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load mesh {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Replaces the current mesh, uploading it when a context is attached.
    ///
    /// The previous mesh's GPU buffers are released.
    pub fn set_mesh_data(&mut self, data: MeshData) {
        let mut model = MeshModel::new(data);
        if let Some(gpu) = self.gpu.as_ref() {
            model.upload(&gpu.context.device);
        }

        log::info!(
            "Mesh installed: {} vertices, {} triangles",
            model.data().vertex_count(),
            model.data().triangle_count()
        );
        self.mesh = Some(model);
    }

    pub fn clear_mesh(&mut self) {
        self.mesh = None;
    }

    pub fn mesh(&self) -> Option<&MeshData> {
        self.mesh.as_ref().map(MeshModel::data)
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.as_ref().is_some_and(MeshModel::has_data)
    }

    fn vertex_count(&self) -> usize {
        self.mesh().map_or(0, MeshData::vertex_count)
    }

    // Camera

    /// Binds a camera, adopting the current viewport aspect ratio
    pub fn set_camera(&mut self, mut camera: Camera) {
        let (width, height) = self.viewport;
        if let Err(e) = camera.set_aspect_ratio(width as f32 / height as f32) {
            log::warn!("Aspect ratio not applied: {}", e);
        }
        self.camera = Some(camera);
    }

    pub fn take_camera(&mut self) -> Option<Camera> {
        self.camera.take()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Aims the bound camera at the mesh bounding sphere
    pub fn fit_camera_to_mesh(&mut self) -> bool {
        match (self.camera.as_mut(), self.mesh.as_ref()) {
            (Some(camera), Some(mesh)) if mesh.has_data() => {
                let data = mesh.data();
                camera.fit_to_sphere(data.center(), data.bounding_radius());
                true
            }
            _ => false,
        }
    }

    // Configuration

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.settings.render_mode = mode;
    }

    pub fn set_shader_type(&mut self, shader_type: ShaderType) {
        self.settings.shader_type = shader_type;
    }

    pub fn set_background_color(&mut self, color: [f32; 4]) {
        self.settings.background_color = color;
    }

    pub fn set_wireframe_color(&mut self, color: [f32; 4]) {
        self.settings.wireframe_color = color;
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.settings = self.settings.with_point_size(size);
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.settings = self.settings.with_shininess(shininess);
    }

    pub fn set_light_position(&mut self, position: [f32; 3]) {
        self.settings.light.position = position;
    }

    pub fn set_light_color(&mut self, color: [f32; 3]) {
        self.settings.light.color = color;
    }

    pub fn set_model_matrix(&mut self, model: Matrix4<f32>) {
        self.model_matrix = model;
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model_matrix
    }

    /// Installs a custom solid-mode program.
    ///
    /// Before initialization the source is kept and compiled by `initialize`.
    pub fn set_custom_shader(&mut self, source: &str) -> Result<()> {
        let result = match self.gpu.as_mut() {
            Some(gpu) => gpu.shading.set_custom_program(source),
            None => {
                self.pending_custom_shader = Some(source.to_string());
                Ok(())
            }
        };
        self.record_custom_shader(&result);
        result
    }

    /// Compile error of the last custom program, including one deferred to
    /// `initialize`
    pub fn custom_shader_error(&self) -> Option<&str> {
        self.custom_shader_error.as_deref()
    }

    fn record_custom_shader(&mut self, result: &Result<()>) {
        self.custom_shader_error = result.as_ref().err().map(ToString::to_string);
    }

    /// Program the next frame would use
    pub fn active_shading_mode(&self) -> Option<ShadingMode> {
        self.gpu
            .as_ref()?
            .shading
            .select(self.settings.render_mode, self.settings.shader_type)
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.performance
    }

    pub fn device(&self) -> Option<&wgpu::Device> {
        self.gpu.as_ref().map(|gpu| gpu.context.device.as_ref())
    }

    pub fn queue(&self) -> Option<&wgpu::Queue> {
        self.gpu.as_ref().map(|gpu| gpu.context.queue.as_ref())
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::Vertex3D;

    fn vertex(position: [f32; 3]) -> Vertex3D {
        Vertex3D {
            position,
            normal: [0.0, 0.0, 1.0],
            color: [1.0; 4],
            tex_coord: [0.0; 2],
        }
    }

    fn quad() -> MeshData {
        MeshData::from_triangles(
            vec![
                vertex([0.0, 0.0, 0.0]),
                vertex([1.0, 0.0, 0.0]),
                vertex([1.0, 1.0, 0.0]),
                vertex([0.0, 1.0, 0.0]),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn test_solid_modes_draw_indexed_triangles() {
        let mesh = quad();
        for mode in [ShadingMode::Unlit, ShadingMode::Lit, ShadingMode::Custom] {
            assert_eq!(
                plan_draw(mode, &mesh, false),
                Some(DrawCall::IndexedTriangles { index_count: 6 })
            );
        }
    }

    #[test]
    fn test_wireframe_draw_depends_on_line_polygons() {
        let mesh = quad();
        assert_eq!(
            plan_draw(ShadingMode::Wireframe, &mesh, true),
            Some(DrawCall::WireframePolygons { index_count: 6 })
        );
        // 5 unique edges
        assert_eq!(
            plan_draw(ShadingMode::Wireframe, &mesh, false),
            Some(DrawCall::IndexedLines { index_count: 10 })
        );
    }

    #[test]
    fn test_points_draw_one_instance_per_vertex() {
        assert_eq!(
            plan_draw(ShadingMode::Point, &quad(), false),
            Some(DrawCall::InstancedPoints { instance_count: 4 })
        );
    }

    #[test]
    fn test_point_cloud_only_draws_in_point_mode() {
        let cloud = MeshData::from_triangles(vec![vertex([0.0; 3]), vertex([1.0; 3])], Vec::new());
        assert_eq!(plan_draw(ShadingMode::Lit, &cloud, true), None);
        assert_eq!(plan_draw(ShadingMode::Wireframe, &cloud, false), None);
        assert_eq!(
            plan_draw(ShadingMode::Point, &cloud, false),
            Some(DrawCall::InstancedPoints { instance_count: 2 })
        );
    }

    #[test]
    fn test_frame_before_initialize_is_skipped() {
        let mut engine = RenderEngine::default();
        engine.set_mesh_data(quad());
        engine.set_camera(Camera::default());
        assert!(!engine.is_initialized());
        assert_eq!(engine.active_shading_mode(), None);
        assert!(engine.plan_frame().is_none());
    }

    #[test]
    fn test_resize_updates_camera_aspect() {
        let mut engine = RenderEngine::default();
        engine.set_camera(Camera::default());
        engine.resize(800, 400);
        assert_eq!(engine.viewport(), (800, 400));
        assert_eq!(engine.camera().unwrap().aspect_ratio(), 2.0);

        engine.resize(0, 300);
        assert_eq!(engine.viewport(), (800, 400));
    }

    #[test]
    fn test_setters_reach_settings() {
        let mut engine = RenderEngine::default();
        engine.set_render_mode(RenderMode::Points);
        engine.set_shader_type(ShaderType::Unlit);
        engine.set_point_size(9.0);
        engine.set_light_position([1.0, 2.0, 3.0]);
        engine.set_light_color([0.0, 1.0, 0.0]);
        engine.set_background_color([0.0, 0.0, 0.0, 1.0]);

        let settings = engine.settings();
        assert_eq!(settings.render_mode, RenderMode::Points);
        assert_eq!(settings.shader_type, ShaderType::Unlit);
        assert_eq!(settings.point_size, 9.0);
        assert_eq!(settings.light.position, [1.0, 2.0, 3.0]);
        assert_eq!(settings.light.color, [0.0, 1.0, 0.0]);
        assert_eq!(settings.background_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_custom_shader_is_deferred_until_initialize() {
        let mut engine = RenderEngine::default();
        assert!(engine.set_custom_shader("not wgsl").is_ok());
        assert_eq!(engine.pending_custom_shader.as_deref(), Some("not wgsl"));
        assert_eq!(engine.custom_shader_error(), None);
    }

    #[test]
    fn test_custom_shader_failure_is_kept_until_replaced() {
        let mut engine = RenderEngine::default();
        engine.record_custom_shader(&Err(ViewerError::Resource(
            "shader 'custom.wgsl' failed to compile".to_string(),
        )));
        assert!(engine
            .custom_shader_error()
            .is_some_and(|e| e.contains("custom.wgsl")));

        engine.set_custom_shader("@vertex fn vs_main() {}").unwrap();
        assert_eq!(engine.custom_shader_error(), None);
    }

    #[test]
    fn test_fit_camera_needs_mesh_and_camera() {
        let mut engine = RenderEngine::default();
        assert!(!engine.fit_camera_to_mesh());

        engine.set_camera(Camera::default());
        engine.set_mesh_data(quad());
        assert!(engine.fit_camera_to_mesh());
        let target = engine.camera().unwrap().target();
        assert_eq!((target.x, target.y, target.z), (0.5, 0.5, 0.0));
    }
}

//! Device and queue acquisition

use std::sync::Arc;

use crate::error::{Result, ViewerError};

/// A wgpu device, its queue and the capabilities the renderer cares about
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    /// Format of the color target frames are rendered into
    pub color_format: wgpu::TextureFormat,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Wraps an existing device, e.g. one created alongside a window surface
    pub fn from_parts(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        color_format: wgpu::TextureFormat,
        adapter_info: wgpu::AdapterInfo,
    ) -> Self {
        Self {
            device,
            queue,
            color_format,
            adapter_info,
        }
    }

    /// Creates a device without a surface, blocking until it is ready.
    ///
    /// Line polygon mode is requested when the adapter offers it.
    pub fn new_headless(color_format: wgpu::TextureFormat) -> Result<Self> {
        pollster::block_on(Self::request_headless(color_format))
    }

    async fn request_headless(color_format: wgpu::TextureFormat) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::Resource(format!("no suitable adapter: {}", e)))?;

        let required_features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("plyview Device"),
                required_features,
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ViewerError::Resource(format!("device request failed: {}", e)))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter {} ({:?}), line polygons: {}",
            adapter_info.name,
            adapter_info.backend,
            required_features.contains(wgpu::Features::POLYGON_MODE_LINE)
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            color_format,
            adapter_info,
        })
    }

    /// Whether pipelines can rasterize triangles as lines
    pub fn supports_line_polygons(&self) -> bool {
        self.device
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE)
    }
}

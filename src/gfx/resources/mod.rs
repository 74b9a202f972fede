//! GPU resource management
//!
//! Handles the device, depth/color targets and uniform bindings used for rendering.

pub mod global_bindings;
pub mod gpu_context;
pub mod texture_resource;

pub use global_bindings::{DrawBindings, DrawUniforms, LightConfig};
pub use gpu_context::GpuContext;
pub use texture_resource::TextureResource;

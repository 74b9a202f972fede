//! # plyview Prelude
//!
//! ```rust
//! use plyview::prelude::*;
//!
//! let mut camera = Camera::default();
//! camera.orbit(10.0, 0.0);
//! ```

pub use crate::error::{PlySection, Result, ViewerError};

pub use crate::io::{load_ply, parse_ply_str, PlyDocument};

pub use crate::gfx::camera::{Camera, CameraBounds, ProjectionKind};
pub use crate::gfx::rendering::{
    DrawCall, FrameOutcome, RenderEngine, RenderMode, RenderSettings, ShaderType, ShadingMode,
};
pub use crate::gfx::resources::{GpuContext, LightConfig};
pub use crate::gfx::scene::{Aabb, MeshData, MeshModel, Vertex3D};

pub use crate::performance::{PerformanceMonitor, RedrawTimer};

pub use cgmath::{InnerSpace, Matrix4, Vector3, Zero};

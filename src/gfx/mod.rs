//! # Graphics Module
//!
//! Camera, mesh data, GPU resources and the shading/render pipeline.
//!
//! - **Camera** ([`camera`]) - orbit/pan/zoom camera with cached matrices
//! - **Scene** ([`scene`]) - triangulated mesh data and its GPU buffers
//! - **Resources** ([`resources`]) - device context, depth targets, uniforms
//! - **Rendering** ([`rendering`]) - shading programs and the [`RenderEngine`]
//!
//! ```no_run
//! use plyview::gfx::{Camera, RenderEngine};
//! use plyview::gfx::rendering::RenderSettings;
//!
//! let mut engine = RenderEngine::new(RenderSettings::default());
//! engine.set_camera(Camera::default());
//! engine.load_mesh("bunny.ply")?;
//! engine.fit_camera_to_mesh();
//! # Ok::<(), plyview::ViewerError>(())
//! ```

pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::Camera;
pub use rendering::render_engine::RenderEngine;

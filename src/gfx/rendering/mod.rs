//! Core rendering functionality
//!
//! Shading programs, pipeline creation and per-frame orchestration.

pub mod pipeline_manager;
pub mod render_engine;
pub mod render_pass_ext;
pub mod settings;
pub mod shading;

pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats, VertexStepping};
pub use render_engine::{plan_draw, DrawCall, FrameOutcome, RenderEngine};
pub use settings::RenderSettings;
pub use shading::{select_shading_mode, RenderMode, ShaderType, ShadingMode, ShadingPipeline};

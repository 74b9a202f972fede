//! plyview
//!
//! Core of an ASCII PLY mesh viewer: a geometry parser, an orbit camera and
//! a wgpu shading pipeline that draws one mesh per frame.

pub mod error;
pub mod gfx;
pub mod io;
pub mod performance;
pub mod prelude;
pub mod wgpu_utils;

pub use error::{Result, ViewerError};

pub mod camera_utils;
pub mod orbit_camera;

pub use camera_utils::{convert_matrix4_to_array, normal_matrix, OPENGL_TO_WGPU_MATRIX};
pub use orbit_camera::{Camera, CameraBounds, ProjectionKind};

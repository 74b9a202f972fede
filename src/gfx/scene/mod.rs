//! # Mesh Data
//!
//! In-memory geometry for the single mesh the viewer displays.
//!
//! - [`MeshData`] - triangulated vertices, indices, edges and bounds
//! - [`MeshModel`] - mesh data plus its GPU buffers
//! - [`Vertex3D`] - vertex layout shared by all shading programs

pub mod mesh;
pub mod vertex;

pub use mesh::{Aabb, GpuMesh, MeshData, MeshModel};
pub use vertex::Vertex3D;

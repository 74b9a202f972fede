//! Geometry file input
//!
//! Only the ASCII PLY variant is supported.

pub mod ply;

pub use ply::{load_ply, parse_ply, parse_ply_str, PlyDocument, PlyFace, PlyHeader, PlyVertex};

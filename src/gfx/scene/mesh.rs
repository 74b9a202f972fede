//! # Mesh Model
//!
//! [`MeshData`] is the validated, triangulated CPU-side mesh: vertices in
//! upload layout, fan-triangulated indices, a unique edge list and the
//! bounding volume, all computed once at load time.
//!
//! [`MeshModel`] pairs a `MeshData` with the GPU buffers created from it.
//! Buffers are released when the model is dropped or re-uploaded.

use std::collections::HashSet;
use std::path::Path;

use cgmath::{InnerSpace, Vector3, Zero};
use wgpu::util::DeviceExt;

use super::vertex::Vertex3D;
use crate::error::Result;
use crate::io::{self, PlyDocument};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every position; a zero box when empty
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let mut positions = positions.into_iter().map(|p| Vector3::from(*p));
        let Some(first) = positions.next() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        positions.fold(Self::new(first, first), |mut aabb, v| {
            aabb.min.x = aabb.min.x.min(v.x);
            aabb.min.y = aabb.min.y.min(v.y);
            aabb.min.z = aabb.min.z.min(v.z);
            aabb.max.x = aabb.max.x.max(v.x);
            aabb.max.y = aabb.max.y.max(v.y);
            aabb.max.z = aabb.max.z.max(v.z);
            aabb
        })
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn contains(&self, point: Vector3<f32>) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.z >= self.min.z
            && point.x <= self.max.x
            && point.y <= self.max.y
            && point.z <= self.max.z
    }
}

/// Triangulated mesh ready for upload
#[derive(Debug, Clone)]
pub struct MeshData {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
    edge_indices: Vec<u32>,
    face_colors: Vec<[f32; 4]>,
    bounding_box: Aabb,
    bounding_radius: f32,
}

impl MeshData {
    /// Parses a PLY file and builds the mesh from it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        io::load_ply(path).map(Self::from_document)
    }

    /// Builds the GPU layout, triangulation and bounds from parsed records
    pub fn from_document(document: PlyDocument) -> Self {
        let vertices: Vec<Vertex3D> = document.vertices.iter().map(Vertex3D::from).collect();

        let mut indices = Vec::with_capacity(document.triangle_count() * 3);
        for face in &document.faces {
            for triangle in face.fan_triangles() {
                indices.extend_from_slice(&triangle);
            }
        }

        let face_colors = document.faces.iter().map(|face| face.color).collect();

        Self::from_parts(vertices, indices, face_colors)
    }

    /// Builds a mesh from an already triangulated vertex/index pair
    pub fn from_triangles(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Self {
        Self::from_parts(vertices, indices, Vec::new())
    }

    fn from_parts(vertices: Vec<Vertex3D>, indices: Vec<u32>, face_colors: Vec<[f32; 4]>) -> Self {
        let bounding_box = Aabb::from_positions(vertices.iter().map(|v| &v.position));
        let center = bounding_box.center();
        let bounding_radius = vertices
            .iter()
            .map(|v| (Vector3::from(v.position) - center).magnitude())
            .fold(0.0_f32, f32::max);
        let edge_indices = unique_edges(&indices);

        Self {
            vertices,
            indices,
            edge_indices,
            face_colors,
            bounding_box,
            bounding_radius,
        }
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    /// Triangle list indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Line list indices, one pair per unique triangle edge
    pub fn edge_indices(&self) -> &[u32] {
        &self.edge_indices
    }

    /// Per-face colors in declaration order
    pub fn face_colors(&self) -> &[[f32; 4]] {
        &self.face_colors
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn edge_index_count(&self) -> usize {
        self.edge_indices.len()
    }

    pub fn has_data(&self) -> bool {
        !self.vertices.is_empty()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    /// Largest distance from the box center to any vertex
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Midpoint of the bounding box
    pub fn center(&self) -> Vector3<f32> {
        self.bounding_box.center()
    }
}

fn unique_edges(indices: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(indices.len());
    let mut edges = Vec::with_capacity(indices.len() * 2);

    for triangle in indices.chunks_exact(3) {
        for (a, b) in [
            (triangle[0], triangle[1]),
            (triangle[1], triangle[2]),
            (triangle[2], triangle[0]),
        ] {
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                edges.push(a);
                edges.push(b);
            }
        }
    }

    edges
}

/// GPU buffers for one mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub edge_buffer: Option<wgpu::Buffer>,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, data: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(data.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Zero-sized buffers are valid in wgpu but useless to bind
        let index_buffer = (!data.indices().is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(data.indices()),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        let edge_buffer = (!data.edge_indices().is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Edge Buffer"),
                contents: bytemuck::cast_slice(data.edge_indices()),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        Self {
            vertex_buffer,
            index_buffer,
            edge_buffer,
        }
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        self.vertex_buffer.destroy();
        if let Some(buffer) = &self.index_buffer {
            buffer.destroy();
        }
        if let Some(buffer) = &self.edge_buffer {
            buffer.destroy();
        }
    }
}

/// A mesh and, once uploaded, its GPU buffers
pub struct MeshModel {
    data: MeshData,
    gpu: Option<GpuMesh>,
}

impl MeshModel {
    pub fn new(data: MeshData) -> Self {
        Self { data, gpu: None }
    }

    /// Creates GPU buffers, releasing any previous ones
    pub fn upload(&mut self, device: &wgpu::Device) {
        if !self.data.has_data() {
            self.gpu = None;
            return;
        }
        self.gpu = Some(GpuMesh::new(device, &self.data));
        log::debug!(
            "Uploaded mesh: {} vertices, {} indices",
            self.data.vertex_count(),
            self.data.index_count()
        );
    }

    /// Drops the GPU buffers but keeps the CPU data
    pub fn release_gpu(&mut self) {
        self.gpu = None;
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    pub fn gpu(&self) -> Option<&GpuMesh> {
        self.gpu.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.has_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_ply_str;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn vertex(position: [f32; 3]) -> Vertex3D {
        Vertex3D {
            position,
            normal: [0.0, 0.0, 1.0],
            color: [1.0; 4],
            tex_coord: [0.0; 2],
        }
    }

    #[test]
    fn test_right_triangle_mesh() {
        let doc = parse_ply_str(
            "ply\nformat ascii 1.0\nelement vertex 3\nelement face 1\nend_header\n\
             0 0 0\n3 0 0\n0 4 0\n3 0 1 2\n",
        )
        .unwrap();
        let mesh = MeshData::from_document(doc);

        assert!(mesh.has_data());
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(mesh.bounding_box().min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.bounding_box().max, Vector3::new(3.0, 4.0, 0.0));
        assert_eq!(mesh.center(), Vector3::new(1.5, 2.0, 0.0));
        assert_relative_eq!(mesh.bounding_radius(), 2.5);
        for v in mesh.vertices() {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_triangle_count_sums_fans() {
        let doc = parse_ply_str(
            "ply\nformat ascii 1.0\nelement vertex 6\nelement face 3\nend_header\n\
             0 0 0\n1 0 0\n1 1 0\n0 1 0\n0 2 0\n1 2 0\n\
             3 0 1 2\n4 0 1 2 3\n5 0 1 2 5 4\n",
        )
        .unwrap();
        let mesh = MeshData::from_document(doc);

        assert_eq!(mesh.triangle_count(), 1 + 2 + 3);
        assert_eq!(mesh.index_count(), 18);
        assert_eq!(mesh.face_colors().len(), 3);
        assert_eq!(&mesh.indices()[3..9], &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_shared_edges_are_listed_once() {
        // Two triangles sharing edge 0-2
        let mesh = MeshData::from_triangles(
            vec![
                vertex([0.0, 0.0, 0.0]),
                vertex([1.0, 0.0, 0.0]),
                vertex([1.0, 1.0, 0.0]),
                vertex([0.0, 1.0, 0.0]),
            ],
            vec![0, 1, 2, 0, 2, 3],
        );
        assert_eq!(mesh.edge_index_count(), 10);
    }

    #[test]
    fn test_empty_mesh_has_no_data() {
        let mesh = MeshData::from_document(PlyDocument::default());
        assert!(!mesh.has_data());
        assert_eq!(mesh.bounding_radius(), 0.0);
        assert_eq!(mesh.bounding_box().min, Vector3::zero());

        let model = MeshModel::new(mesh);
        assert!(!model.has_data());
        assert!(!model.is_uploaded());
    }

    #[test]
    fn test_points_without_faces_still_have_data() {
        let mesh = MeshData::from_triangles(vec![vertex([1.0, 2.0, 3.0])], Vec::new());
        assert!(mesh.has_data());
        assert_eq!(mesh.triangle_count(), 0);
        assert_eq!(mesh.center(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.bounding_radius(), 0.0);
    }

    #[test]
    fn test_random_clouds_are_bounded() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let count = rng.random_range(1..200);
            let vertices: Vec<Vertex3D> = (0..count)
                .map(|_| {
                    vertex([
                        rng.random_range(-50.0..50.0),
                        rng.random_range(-50.0..50.0),
                        rng.random_range(-50.0..50.0),
                    ])
                })
                .collect();
            let mesh = MeshData::from_triangles(vertices, Vec::new());
            let aabb = mesh.bounding_box();
            let center = mesh.center();

            let mut farthest = 0.0_f32;
            for v in mesh.vertices() {
                let p = Vector3::from(v.position);
                assert!(aabb.contains(p));
                farthest = farthest.max((p - center).magnitude());
            }
            assert!(mesh.bounding_radius() >= 0.0);
            assert_relative_eq!(mesh.bounding_radius(), farthest);
        }
    }
}

//! Mesh data structures

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Single-precision 3D point used for mesh vertices
pub type Point3f = Point3<f32>;

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// True when every face references an existing vertex
    pub fn has_valid_faces(&self) -> bool {
        let n = self.vertices.len();
        self.faces.iter().all(|face| face.iter().all(|&i| i < n))
    }
}

//! OBJ format support

use crate::MeshReader;
use gtforge_core::{Error, MeshLoader, Point3f, Result, TriangleMesh};
use obj::{Obj, ObjData};
use std::path::Path;

pub struct ObjReader;

impl ObjReader {
    /// Convert parsed OBJ data into a triangle mesh; polygons are fan-triangulated
    pub fn mesh_from_data(data: &ObjData) -> Result<TriangleMesh> {
        let vertices: Vec<Point3f> = data
            .position
            .iter()
            .map(|p| Point3f::new(p[0], p[1], p[2]))
            .collect();

        let mut faces = Vec::new();
        for object in &data.objects {
            for group in &object.groups {
                for poly in &group.polys {
                    let indices: Vec<usize> = poly.0.iter().map(|tuple| tuple.0).collect();
                    if indices.len() < 3 {
                        continue;
                    }
                    for i in 1..indices.len() - 1 {
                        faces.push([indices[0], indices[i], indices[i + 1]]);
                    }
                }
            }
        }

        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if !mesh.has_valid_faces() {
            return Err(Error::InvalidData(
                "OBJ face references a missing vertex".to_string(),
            ));
        }
        Ok(mesh)
    }
}

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let obj = Obj::load(path)
            .map_err(|e| Error::InvalidData(format!("failed to load {}: {}", path.display(), e)))?;
        Self::mesh_from_data(&obj.data)
    }
}

impl MeshLoader for ObjReader {
    fn load_mesh(&self, path: &Path) -> Result<TriangleMesh> {
        <Self as MeshReader>::read_mesh(path)
    }
}

//! I/O operations for the annotation pipeline
//!
//! This crate reads camera trajectories and meshes, and writes the dataset
//! artifacts: masks, masked RGB frames, pose matrices and JSON documents.

pub mod fs;
pub mod images;
pub mod json;
pub mod obj;
pub mod pose_file;
pub mod trajectory;

pub use fs::{ensure_dir, frame_file_name, frame_instance_file_name, list_files_with_extension};
pub use json::write_json_document;
pub use trajectory::{trajectory_file_for, DuplicateFrames, PoseCatalog, TrajectoryOptions};

use gtforge_core::{Error, MeshLoader, Result, TriangleMesh};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("obj") => obj::ObjReader::read_mesh(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Mesh loader that dispatches on file extension
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMeshLoader;

impl MeshLoader for FileMeshLoader {
    fn load_mesh(&self, path: &Path) -> Result<TriangleMesh> {
        read_mesh(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_detect_obj() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.OBJ");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let mesh = FileMeshLoader.load_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn test_unsupported_format() {
        let result = read_mesh("model.stl");
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }
}

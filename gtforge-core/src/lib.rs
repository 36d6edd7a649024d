//! Core data structures and traits for gtforge
//!
//! This crate provides the fundamental types of the annotation pipeline:
//! rigid transforms and pose conventions, camera intrinsics, the static
//! scene graph, depth/mask buffers, and the renderer and mesh-loading
//! capabilities the pipeline is driven through.

pub mod camera;
pub mod error;
pub mod mesh;
pub mod pose;
pub mod raster;
pub mod scene;
pub mod traits;
pub mod transform;

pub use camera::*;
pub use error::*;
pub use mesh::*;
pub use pose::*;
pub use raster::*;
pub use scene::*;
pub use traits::*;
pub use transform::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, UnitQuaternion, Vector3};

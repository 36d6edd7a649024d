//! # gtforge
//!
//! Ground-truth generation for object datasets captured with a moving camera.
//!
//! This is the umbrella crate that provides convenient access to all gtforge
//! functionality. Use it to get everything in one place, or depend on the
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Transforms, camera poses and intrinsics, the scene graph,
//!   depth/mask buffers and the renderer capability
//! - **I/O**: Trajectory parsing, OBJ meshes, images, pose matrices and JSON documents
//! - **Annotate**: Occlusion-aware segmentation, per-object and BOP export,
//!   and the frame pipeline
//!
//! ## Quick Start
//!
//! ```rust
//! use gtforge::prelude::*;
//!
//! // Raw camera-to-world pose and its render-convention counterpart
//! let pose = Transform3D::from_translation_rotation(
//!     Vector3::new(0.0, 0.0, 1.5),
//!     UnitQuaternion::identity(),
//! );
//! let render_pose = compose_camera_pose(&pose);
//! assert_eq!(render_pose.matrix[(1, 1)], -1.0);
//!
//! // Object pose in camera space
//! let model = Transform3D::identity();
//! let m2c = model_to_camera(&pose, &model).unwrap();
//! assert_eq!(m2c.translation().z, -1.5);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables io and annotate
//! - `io`: File format support
//! - `annotate`: Segmentation, export and pipeline (implies `io`)
//! - `all`: Enables all features

// Re-export core functionality
pub use gtforge_core::*;

// Re-export sub-crates
#[cfg(feature = "io")]
pub use gtforge_io as io;

#[cfg(feature = "annotate")]
pub use gtforge_annotate as annotate;

/// Convenient imports for common use cases
pub mod prelude {
    pub use gtforge_core::*;

    #[cfg(feature = "io")]
    pub use gtforge_io::{DuplicateFrames, FileMeshLoader, PoseCatalog, TrajectoryOptions};

    #[cfg(feature = "annotate")]
    pub use gtforge_annotate::{
        AnnotationConfig, AnnotationPipeline, AnnotationWriter, BopOptions, ExportMode,
        ObjectEntry, ObjectKind, OcclusionSegmenter,
    };
}

//! Ground-truth annotation for gtforge
//!
//! Given a camera trajectory, a set of object meshes and a depth renderer,
//! this crate produces per-frame instance masks, object poses in camera
//! space and visibility statistics, and writes them either as per-object
//! folders or as a BOP scene.
//!
//! ```no_run
//! use gtforge_annotate::{AnnotationConfig, AnnotationPipeline};
//! use gtforge_core::{DepthMap, DepthRenderer, Result, SceneGraph};
//! use gtforge_io::FileMeshLoader;
//!
//! struct MyRenderer { width: u32, height: u32 }
//!
//! impl DepthRenderer for MyRenderer {
//!     fn viewport(&self) -> (u32, u32) { (self.width, self.height) }
//!     fn render_depth(&mut self, _scene: &SceneGraph) -> Result<DepthMap> {
//!         Ok(DepthMap::zeros(self.width, self.height))
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let config = AnnotationConfig::from_json_file("annotate.json")?;
//! let summary = AnnotationPipeline::new(config)?
//!     .run(FileMeshLoader, |width, height| Ok(MyRenderer { width, height }))?;
//! println!("{} frames annotated", summary.frames);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod scene_builder;
pub mod segmentation;

pub use annotation::{
    visibility_fraction, Annotator, CameraRecord, FrameAnnotation, InstanceAnnotation,
};
pub use config::{
    ycb_video_categories, AnnotationConfig, BopOptions, ExportMode, ObjectEntry, ObjectKind,
    DEFAULT_BOP_PAD_X, DEFAULT_BOP_PAD_Y, DEFAULT_DEPTH_EPSILON,
};
pub use export::{AnnotationWriter, BopExporter, Exporter, FrameContext, PerObjectExporter};
pub use pipeline::{AnnotationPipeline, RunSummary};
pub use scene_builder::SceneBuilder;
pub use segmentation::{FrameSegmentation, InstanceCoverage, OcclusionSegmenter};

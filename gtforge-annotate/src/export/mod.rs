//! Dataset writers
//!
//! The export layout is fixed for a run. [`Exporter`] is the closed set of
//! layouts the pipeline can produce; each variant implements
//! [`AnnotationWriter`].

pub mod bop;
pub mod per_object;

pub use bop::{BopExporter, SceneCameraEntry, SceneGtEntry, SceneGtInfoEntry};
pub use per_object::PerObjectExporter;

use crate::annotation::FrameAnnotation;
use crate::config::{AnnotationConfig, ExportMode};
use crate::segmentation::FrameSegmentation;
use gtforge_core::{CameraPose, Result, SceneGraph};
use std::path::PathBuf;

/// Input files and position of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    /// Position in the trajectory, used as the BOP frame index
    pub index: usize,
    pub frame_id: String,
    /// Frame id without its extension, used for pose file names
    pub stem: String,
    /// Raw RGB image of the frame
    pub rgb_path: PathBuf,
    /// Raw depth image of the frame
    pub depth_path: PathBuf,
}

impl FrameContext {
    pub fn new(index: usize, pose: &CameraPose, config: &AnnotationConfig) -> Self {
        Self {
            index,
            frame_id: pose.frame_id.clone(),
            stem: pose.frame_stem().to_string(),
            rgb_path: config.rgb_path(&pose.frame_id),
            depth_path: config.depth_path(&pose.frame_id),
        }
    }
}

/// Persists frame annotations in some dataset layout
pub trait AnnotationWriter {
    /// Create output directories; called once before the first frame
    fn prepare(&mut self, scene: &SceneGraph) -> Result<()>;

    /// Write everything belonging to one frame
    fn write_frame(
        &mut self,
        frame: &FrameContext,
        scene: &SceneGraph,
        annotation: &FrameAnnotation,
        segmentation: &FrameSegmentation,
    ) -> Result<()>;

    /// Whether annotations should count pixels against the input depth image
    fn uses_depth_validity(&self) -> bool {
        false
    }
}

/// Writer selected by the configured [`ExportMode`]
#[derive(Debug)]
pub enum Exporter {
    PerObject(PerObjectExporter),
    Bop(BopExporter),
}

impl Exporter {
    pub fn from_config(config: &AnnotationConfig) -> Self {
        match &config.export {
            ExportMode::PerObject => {
                Exporter::PerObject(PerObjectExporter::new(&config.output_dir))
            }
            ExportMode::Bop(_) => Exporter::Bop(BopExporter::new(&config.output_dir)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Exporter::PerObject(_) => "per-object",
            Exporter::Bop(_) => "bop",
        }
    }
}

impl AnnotationWriter for Exporter {
    fn prepare(&mut self, scene: &SceneGraph) -> Result<()> {
        match self {
            Exporter::PerObject(writer) => writer.prepare(scene),
            Exporter::Bop(writer) => writer.prepare(scene),
        }
    }

    fn write_frame(
        &mut self,
        frame: &FrameContext,
        scene: &SceneGraph,
        annotation: &FrameAnnotation,
        segmentation: &FrameSegmentation,
    ) -> Result<()> {
        match self {
            Exporter::PerObject(writer) => {
                writer.write_frame(frame, scene, annotation, segmentation)
            }
            Exporter::Bop(writer) => writer.write_frame(frame, scene, annotation, segmentation),
        }
    }

    fn uses_depth_validity(&self) -> bool {
        match self {
            Exporter::PerObject(writer) => writer.uses_depth_validity(),
            Exporter::Bop(writer) => writer.uses_depth_validity(),
        }
    }
}

//! One folder per instance with pose matrices and masked RGB frames

use super::{AnnotationWriter, FrameContext};
use crate::annotation::FrameAnnotation;
use crate::segmentation::FrameSegmentation;
use gtforge_core::{Result, SceneGraph};
use gtforge_io::ensure_dir;
use gtforge_io::images::{read_rgb, write_masked_rgb};
use gtforge_io::pose_file::write_matrix;
use log::debug;
use std::path::{Path, PathBuf};

const POSE_DIR: &str = "pose";
const RGB_DIR: &str = "rgb";

/// Writes `<out>/<instance>/pose/<stem>.txt` and `<out>/<instance>/rgb/<frame id>`
#[derive(Debug, Clone)]
pub struct PerObjectExporter {
    output_dir: PathBuf,
}

impl PerObjectExporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn pose_dir(&self, instance_name: &str) -> PathBuf {
        self.output_dir.join(instance_name).join(POSE_DIR)
    }

    pub fn rgb_dir(&self, instance_name: &str) -> PathBuf {
        self.output_dir.join(instance_name).join(RGB_DIR)
    }
}

impl AnnotationWriter for PerObjectExporter {
    fn prepare(&mut self, scene: &SceneGraph) -> Result<()> {
        for instance in scene.instances() {
            ensure_dir(self.pose_dir(&instance.name))?;
            ensure_dir(self.rgb_dir(&instance.name))?;
        }
        Ok(())
    }

    fn write_frame(
        &mut self,
        frame: &FrameContext,
        _scene: &SceneGraph,
        annotation: &FrameAnnotation,
        segmentation: &FrameSegmentation,
    ) -> Result<()> {
        let rgb = read_rgb(&frame.rgb_path)?;
        let pose_file = format!("{}.txt", frame.stem);

        for inst in &annotation.instances {
            write_matrix(
                &inst.model_to_render_camera,
                self.pose_dir(&inst.name).join(&pose_file),
            )?;
            let region = segmentation.labels.instance_mask(inst.index);
            write_masked_rgb(&rgb, &region, self.rgb_dir(&inst.name).join(&frame.frame_id))?;
        }

        debug!(
            "Wrote {} per-object records for frame '{}'",
            annotation.instances.len(),
            frame.frame_id
        );
        Ok(())
    }
}

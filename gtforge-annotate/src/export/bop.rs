//! BOP scene layout
//!
//! ```text
//! <out>/scene_camera.json
//! <out>/scene_gt.json
//! <out>/scene_gt_info.json
//! <out>/rgb/{frame:06}.png
//! <out>/depth/{frame:06}.png
//! <out>/mask/{frame:06}_{instance:06}.png
//! <out>/mask_visib/{frame:06}_{instance:06}.png
//! ```
//!
//! The JSON documents hold every frame written so far and are replaced as a
//! whole after each frame.

use super::{AnnotationWriter, FrameContext};
use crate::annotation::{FrameAnnotation, InstanceAnnotation};
use crate::segmentation::FrameSegmentation;
use gtforge_core::{BoundingBox, Result, SceneGraph, Transform3D};
use gtforge_io::images::{copy_verbatim, write_mask};
use gtforge_io::{ensure_dir, frame_file_name, frame_instance_file_name, write_json_document};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCENE_CAMERA_FILE: &str = "scene_camera.json";
pub const SCENE_GT_FILE: &str = "scene_gt.json";
pub const SCENE_GT_INFO_FILE: &str = "scene_gt_info.json";

const IMAGE_DIRS: [&str; 4] = ["rgb", "depth", "mask", "mask_visib"];
const IMAGE_EXTENSION: &str = "png";

/// Camera record of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCameraEntry {
    #[serde(rename = "cam_K")]
    pub cam_k: [f64; 9],
    #[serde(rename = "cam_R_w2c")]
    pub cam_r_w2c: [f64; 9],
    pub cam_t_w2c: [f64; 3],
    pub depth_scale: f64,
    pub mode: u32,
}

/// Ground-truth pose of one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGtEntry {
    #[serde(rename = "cam_R_m2c")]
    pub cam_r_m2c: [f64; 9],
    pub cam_t_m2c: [f64; 3],
    pub obj_id: u32,
}

/// Visibility statistics of one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGtInfoEntry {
    pub bbox_obj: BoundingBox,
    pub bbox_visib: BoundingBox,
    pub px_count_all: usize,
    pub px_count_valid: usize,
    pub px_count_visib: usize,
    pub visib_fract: f64,
}

fn rotation_row_major(transform: &Transform3D) -> [f64; 9] {
    let r = transform.rotation();
    std::array::from_fn(|i| r[(i / 3, i % 3)])
}

fn translation_array(transform: &Transform3D) -> [f64; 3] {
    let t = transform.translation();
    [t.x, t.y, t.z]
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl SceneCameraEntry {
    pub fn from_annotation(annotation: &FrameAnnotation) -> Self {
        let camera = &annotation.camera;
        Self {
            cam_k: camera.intrinsics.to_row_major(),
            cam_r_w2c: rotation_row_major(&camera.world_to_camera),
            cam_t_w2c: translation_array(&camera.world_to_camera),
            depth_scale: round_to(camera.depth_scale, 5),
            mode: 0,
        }
    }
}

impl From<&InstanceAnnotation> for SceneGtEntry {
    fn from(inst: &InstanceAnnotation) -> Self {
        Self {
            cam_r_m2c: rotation_row_major(&inst.model_to_camera),
            cam_t_m2c: translation_array(&inst.model_to_camera),
            obj_id: inst.category_id,
        }
    }
}

impl From<&InstanceAnnotation> for SceneGtInfoEntry {
    fn from(inst: &InstanceAnnotation) -> Self {
        Self {
            bbox_obj: inst.bbox_obj,
            bbox_visib: inst.bbox_visib,
            px_count_all: inst.px_count_all,
            px_count_valid: inst.px_count_valid,
            px_count_visib: inst.px_count_visib,
            visib_fract: inst.visib_fract,
        }
    }
}

/// Accumulates BOP records and rewrites the scene documents every frame
#[derive(Debug, Clone, Default)]
pub struct BopExporter {
    output_dir: PathBuf,
    scene_camera: BTreeMap<usize, SceneCameraEntry>,
    scene_gt: BTreeMap<usize, Vec<SceneGtEntry>>,
    scene_gt_info: BTreeMap<usize, Vec<SceneGtInfoEntry>>,
}

impl BopExporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scene_camera(&self) -> &BTreeMap<usize, SceneCameraEntry> {
        &self.scene_camera
    }

    pub fn scene_gt(&self) -> &BTreeMap<usize, Vec<SceneGtEntry>> {
        &self.scene_gt
    }

    pub fn scene_gt_info(&self) -> &BTreeMap<usize, Vec<SceneGtInfoEntry>> {
        &self.scene_gt_info
    }

    /// Number of frames recorded so far
    pub fn frame_count(&self) -> usize {
        self.scene_camera.len()
    }

    fn image_dir(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    fn write_images(&self, frame: &FrameContext, annotation: &FrameAnnotation) -> Result<()> {
        let name = frame_file_name(frame.index, IMAGE_EXTENSION);
        copy_verbatim(&frame.rgb_path, self.image_dir("rgb").join(&name))?;
        copy_verbatim(&frame.depth_path, self.image_dir("depth").join(&name))?;

        for (position, inst) in annotation.instances.iter().enumerate() {
            let mask_name = frame_instance_file_name(frame.index, position, IMAGE_EXTENSION);
            write_mask(&inst.mask, self.image_dir("mask").join(&mask_name))?;
            write_mask(&inst.mask_visible, self.image_dir("mask_visib").join(&mask_name))?;
        }
        Ok(())
    }

    fn write_documents(&self) -> Result<()> {
        write_json_document(&self.scene_camera, self.output_dir.join(SCENE_CAMERA_FILE))?;
        write_json_document(&self.scene_gt, self.output_dir.join(SCENE_GT_FILE))?;
        write_json_document(&self.scene_gt_info, self.output_dir.join(SCENE_GT_INFO_FILE))?;
        Ok(())
    }
}

impl AnnotationWriter for BopExporter {
    fn prepare(&mut self, _scene: &SceneGraph) -> Result<()> {
        ensure_dir(&self.output_dir)?;
        for dir in IMAGE_DIRS {
            ensure_dir(self.image_dir(dir))?;
        }
        Ok(())
    }

    fn write_frame(
        &mut self,
        frame: &FrameContext,
        _scene: &SceneGraph,
        annotation: &FrameAnnotation,
        _segmentation: &FrameSegmentation,
    ) -> Result<()> {
        self.write_images(frame, annotation)?;

        self.scene_camera
            .insert(frame.index, SceneCameraEntry::from_annotation(annotation));
        self.scene_gt.insert(
            frame.index,
            annotation.instances.iter().map(SceneGtEntry::from).collect(),
        );
        self.scene_gt_info.insert(
            frame.index,
            annotation.instances.iter().map(SceneGtInfoEntry::from).collect(),
        );
        self.write_documents()?;

        debug!("Wrote BOP frame {} ('{}')", frame.index, frame.frame_id);
        Ok(())
    }

    fn uses_depth_validity(&self) -> bool {
        true
    }
}

//! Per-frame ground-truth records derived from a segmentation

use crate::config::AnnotationConfig;
use crate::segmentation::FrameSegmentation;
use gtforge_core::{
    compose_camera_pose, model_to_camera, BoundingBox, CameraIntrinsics, CameraPose, Error, Mask,
    PublishWindow, Result, SceneGraph, Transform3D,
};

/// Camera parameters of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    /// Intrinsics of the published (unpadded) image
    pub intrinsics: CameraIntrinsics,
    pub world_to_camera: Transform3D,
    pub depth_scale: f64,
}

/// Ground truth of one instance in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceAnnotation {
    pub index: usize,
    pub category_id: u32,
    pub name: String,
    /// `inverse(camera-to-world) * model`, in the trajectory's camera frame
    pub model_to_camera: Transform3D,
    /// `inverse(camera-to-world * A) * model`, in the render camera frame
    pub model_to_render_camera: Transform3D,
    /// All-mask cropped to the publish window
    pub mask: Mask,
    /// Visible mask cropped to the publish window
    pub mask_visible: Mask,
    pub bbox_obj: BoundingBox,
    pub bbox_visib: BoundingBox,
    /// All-mask pixels on the whole canvas, before cropping
    pub px_count_all: usize,
    pub px_count_valid: usize,
    pub px_count_visib: usize,
    pub visib_fract: f64,
}

/// Ground truth of one frame, one entry per scene instance
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnnotation {
    pub frame_id: String,
    pub camera: CameraRecord,
    pub instances: Vec<InstanceAnnotation>,
}

impl FrameAnnotation {
    /// Check the record before it is persisted
    pub fn validate(&self, instance_count: usize) -> Result<()> {
        if self.instances.len() != instance_count {
            return Err(Error::InvalidData(format!(
                "frame '{}' annotates {} instances, scene has {}",
                self.frame_id,
                self.instances.len(),
                instance_count
            )));
        }
        if !self.camera.world_to_camera.is_finite() || !self.camera.depth_scale.is_finite() {
            return Err(Error::InvalidData(format!(
                "frame '{}' has a non-finite camera record",
                self.frame_id
            )));
        }
        for inst in &self.instances {
            let finite = inst.model_to_camera.is_finite()
                && inst.model_to_render_camera.is_finite()
                && inst.visib_fract.is_finite();
            if !finite {
                return Err(Error::InvalidData(format!(
                    "frame '{}', instance {} has non-finite values",
                    self.frame_id, inst.index
                )));
            }
            if !(0.0..=1.0).contains(&inst.visib_fract) {
                return Err(Error::InvalidData(format!(
                    "frame '{}', instance {}: visibility fraction {} out of range",
                    self.frame_id, inst.index, inst.visib_fract
                )));
            }
        }
        Ok(())
    }
}

/// Visible share of an instance; 0 when it covers no pixel at all
pub fn visibility_fraction(px_count_visib: usize, px_count_all: usize) -> f64 {
    if px_count_all == 0 {
        0.0
    } else {
        px_count_visib as f64 / px_count_all as f64
    }
}

/// Turns segmentations into [`FrameAnnotation`]s
#[derive(Debug, Clone)]
pub struct Annotator {
    intrinsics: CameraIntrinsics,
    window: PublishWindow,
    depth_scale: f64,
}

impl Annotator {
    /// `intrinsics` describe the published image, `window` locates it on the canvas
    pub fn new(intrinsics: CameraIntrinsics, window: PublishWindow, depth_scale: f64) -> Self {
        Self {
            intrinsics,
            window,
            depth_scale,
        }
    }

    pub fn from_config(config: &AnnotationConfig) -> Self {
        Self::new(config.intrinsics, config.publish_window(), config.depth_scale)
    }

    pub fn window(&self) -> &PublishWindow {
        &self.window
    }

    /// Annotate one frame
    ///
    /// `depth_validity` marks pixels of the input depth image with a reading;
    /// without it every published pixel counts as valid.
    pub fn annotate(
        &self,
        pose: &CameraPose,
        scene: &SceneGraph,
        segmentation: &FrameSegmentation,
        depth_validity: Option<&Mask>,
    ) -> Result<FrameAnnotation> {
        if segmentation.instances.len() != scene.len() {
            return Err(Error::InvalidData(format!(
                "segmentation has {} instances, scene has {}",
                segmentation.instances.len(),
                scene.len()
            )));
        }
        if let Some(valid) = depth_validity {
            if (valid.width(), valid.height()) != (self.window.width, self.window.height) {
                return Err(Error::InvalidData(format!(
                    "depth image of frame '{}' is {}x{}, expected {}x{}",
                    pose.frame_id,
                    valid.width(),
                    valid.height(),
                    self.window.width,
                    self.window.height
                )));
            }
        }

        let camera_to_world = pose.camera_to_world_transform()?;
        let render_pose = compose_camera_pose(&camera_to_world);

        let mut instances = Vec::with_capacity(scene.len());
        for (instance, coverage) in scene.instances().zip(&segmentation.instances) {
            let mask = coverage.all.crop(&self.window)?;
            let mask_visible = coverage.visible.crop(&self.window)?;

            let px_count_all = coverage.all.count();
            let px_count_visib = mask_visible.count();
            let px_count_valid = match depth_validity {
                Some(valid) => count_both(&mask, valid),
                None => mask.count(),
            };

            instances.push(InstanceAnnotation {
                index: instance.index,
                category_id: instance.category_id,
                name: instance.name.clone(),
                model_to_camera: model_to_camera(&camera_to_world, &instance.transform)?,
                model_to_render_camera: model_to_camera(&render_pose, &instance.transform)?,
                bbox_obj: mask.bounding_box_or_zero(),
                bbox_visib: mask_visible.bounding_box_or_zero(),
                mask,
                mask_visible,
                px_count_all,
                px_count_valid,
                px_count_visib,
                visib_fract: visibility_fraction(px_count_visib, px_count_all),
            });
        }

        let annotation = FrameAnnotation {
            frame_id: pose.frame_id.clone(),
            camera: CameraRecord {
                intrinsics: self.intrinsics,
                world_to_camera: camera_to_world.try_inverse()?,
                depth_scale: self.depth_scale,
            },
            instances,
        };
        annotation.validate(scene.len())?;
        Ok(annotation)
    }
}

fn count_both(a: &Mask, b: &Mask) -> usize {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .filter(|&(&x, &y)| x && y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::InstanceCoverage;
    use approx::assert_relative_eq;
    use gtforge_core::{
        axis_alignment, CameraNode, ObjectInstance, SegmentationMap, TriangleMesh, UnitQuaternion,
        Vector3,
    };
    use std::sync::Arc;

    fn scene(canvas: CameraIntrinsics, transforms: &[Transform3D]) -> SceneGraph {
        let mesh = Arc::new(TriangleMesh::new());
        let instances = transforms
            .iter()
            .enumerate()
            .map(|(i, t)| {
                ObjectInstance::new(i, format!("obj_{i}"), mesh.clone(), *t)
                    .with_category_id(i as u32 + 5)
            })
            .collect();
        SceneGraph::new(CameraNode::new(canvas), instances).unwrap()
    }

    fn mask_with(width: u32, height: u32, pixels: &[(u32, u32)]) -> Mask {
        let mut mask = Mask::empty(width, height);
        for &(col, row) in pixels {
            mask.set(col, row, true);
        }
        mask
    }

    #[test]
    fn test_visibility_fraction() {
        assert_eq!(visibility_fraction(0, 0), 0.0);
        assert_eq!(visibility_fraction(5, 0), 0.0);
        assert_relative_eq!(visibility_fraction(1, 4), 0.25);
    }

    #[test]
    fn test_counts_on_padded_canvas() {
        // 4x2 image published from an 8x4 canvas with pads 2/1
        let image = CameraIntrinsics::new(10.0, 10.0, 2.0, 1.0, 4, 2);
        let canvas = image.padded(2, 1);
        let window = PublishWindow::new(2, 1, 4, 2);
        let scene = scene(canvas, &[Transform3D::identity()]);

        // one pixel outside the window, three inside, two of them visible
        let all = mask_with(8, 4, &[(0, 0), (2, 1), (3, 1), (5, 2)]);
        let visible = mask_with(8, 4, &[(3, 1), (5, 2)]);
        let segmentation = FrameSegmentation {
            labels: SegmentationMap::background(8, 4),
            instances: vec![InstanceCoverage { all, visible }],
        };
        let validity = mask_with(4, 2, &[(0, 0), (3, 1)]);

        let pose = CameraPose::camera_to_world(
            "000000.png",
            Transform3D::from_translation_rotation(
                Vector3::new(0.0, 0.0, -2.0),
                UnitQuaternion::identity(),
            ),
        );
        let annotation = Annotator::new(image, window, 0.1)
            .annotate(&pose, &scene, &segmentation, Some(&validity))
            .unwrap();
        let inst = &annotation.instances[0];

        assert_eq!(inst.category_id, 5);
        assert_eq!(inst.px_count_all, 4);
        assert_eq!(inst.px_count_visib, 2);
        assert_eq!(inst.px_count_valid, 2);
        assert_relative_eq!(inst.visib_fract, 0.5);
        assert_eq!(inst.bbox_obj, BoundingBox::new(0, 0, 3, 1));
        assert_eq!(inst.bbox_visib, BoundingBox::new(1, 0, 2, 1));
        assert_eq!(inst.mask.width(), 4);

        assert_eq!(annotation.camera.intrinsics, image);
        assert_relative_eq!(annotation.camera.world_to_camera.translation().z, 2.0);
    }

    #[test]
    fn test_model_to_camera_conventions() {
        let image = CameraIntrinsics::new(10.0, 10.0, 2.0, 2.0, 4, 4);
        let model = Transform3D::from_translation_rotation(
            Vector3::new(0.1, 0.2, 0.3),
            UnitQuaternion::identity(),
        );
        let scene = scene(image, &[model]);
        let segmentation = FrameSegmentation {
            labels: SegmentationMap::background(4, 4),
            instances: vec![InstanceCoverage {
                all: Mask::empty(4, 4),
                visible: Mask::empty(4, 4),
            }],
        };
        let c2w = Transform3D::from_translation_rotation(
            Vector3::new(1.0, -0.5, 2.0),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9),
        );
        let pose = CameraPose::camera_to_world("000001.png", c2w);

        let annotation = Annotator::new(image, PublishWindow::full(4, 4), 1.0)
            .annotate(&pose, &scene, &segmentation, None)
            .unwrap();
        let inst = &annotation.instances[0];

        let expected = c2w.try_inverse().unwrap() * model;
        assert_relative_eq!(inst.model_to_camera.matrix, expected.matrix, epsilon = 1e-12);
        // render-camera pose differs by the axis flip only
        let flipped = axis_alignment() * inst.model_to_camera;
        assert_relative_eq!(inst.model_to_render_camera.matrix, flipped.matrix, epsilon = 1e-12);

        // empty masks keep the frame with zero metrics
        assert_eq!(inst.bbox_obj, BoundingBox::default());
        assert_eq!(inst.visib_fract, 0.0);
        assert_eq!(inst.px_count_valid, 0);
    }

    #[test]
    fn test_singular_pose_is_rejected() {
        let image = CameraIntrinsics::new(10.0, 10.0, 2.0, 2.0, 4, 4);
        let scene = scene(image, &[Transform3D::identity()]);
        let segmentation = FrameSegmentation {
            labels: SegmentationMap::background(4, 4),
            instances: vec![InstanceCoverage {
                all: Mask::empty(4, 4),
                visible: Mask::empty(4, 4),
            }],
        };
        let mut degenerate = Transform3D::identity();
        degenerate.matrix[(2, 2)] = 0.0;
        let pose = CameraPose::camera_to_world("000002.png", degenerate);

        let result = Annotator::new(image, PublishWindow::full(4, 4), 1.0)
            .annotate(&pose, &scene, &segmentation, None);
        assert!(matches!(result, Err(Error::SingularTransform(_))));
    }

    #[test]
    fn test_depth_image_size_mismatch() {
        let image = CameraIntrinsics::new(10.0, 10.0, 2.0, 2.0, 4, 4);
        let scene = scene(image, &[]);
        let segmentation = FrameSegmentation {
            labels: SegmentationMap::background(4, 4),
            instances: Vec::new(),
        };
        let pose = CameraPose::camera_to_world("000003.png", Transform3D::identity());
        let wrong = Mask::empty(3, 4);

        let result = Annotator::new(image, PublishWindow::full(4, 4), 1.0).annotate(
            &pose,
            &scene,
            &segmentation,
            Some(&wrong),
        );
        assert!(result.is_err());
    }
}

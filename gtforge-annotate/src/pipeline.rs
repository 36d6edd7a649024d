//! Single-threaded driver for a whole annotation run

use crate::annotation::Annotator;
use crate::config::AnnotationConfig;
use crate::export::{AnnotationWriter, Exporter, FrameContext};
use crate::scene_builder::SceneBuilder;
use crate::segmentation::OcclusionSegmenter;
use gtforge_core::{
    compose_camera_pose, CameraPose, DepthRenderer, Error, MeshLoader, Result, SceneGraph,
};
use gtforge_io::images::read_depth_validity;
use gtforge_io::PoseCatalog;
use log::{debug, info};

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub instances: usize,
}

/// Parses the trajectory, builds the scene and annotates every frame
#[derive(Debug, Clone)]
pub struct AnnotationPipeline {
    config: AnnotationConfig,
    segmenter: OcclusionSegmenter,
}

impl AnnotationPipeline {
    pub fn new(config: AnnotationConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = OcclusionSegmenter::with_epsilon(config.depth_epsilon);
        Ok(Self { config, segmenter })
    }

    pub fn config(&self) -> &AnnotationConfig {
        &self.config
    }

    /// Parse the trajectory, apply the registration and validate every pose
    pub fn load_catalog(&self) -> Result<PoseCatalog> {
        let mut catalog = PoseCatalog::from_file_with_options(
            &self.config.trajectory_file,
            &self.config.trajectory,
        )?;

        if let Some(registration) = &self.config.registration {
            catalog.try_map_transforms(|pose| registration.apply(&pose.transform))?;
            debug!(
                "Applied registration (scale {}) to {} poses",
                registration.scale,
                catalog.len()
            );
        }
        for pose in &catalog {
            pose.validate()?;
        }
        Ok(catalog)
    }

    /// Build the scene on the render canvas
    pub fn build_scene<L: MeshLoader>(&self, loader: L) -> Result<SceneGraph> {
        SceneBuilder::from_config(&self.config, loader)
            .build(&self.config.objects, self.config.render_intrinsics())
    }

    /// Run over every frame of the trajectory
    ///
    /// `make_renderer` receives the canvas size and is called once, after
    /// the trajectory and the scene were loaded successfully.
    pub fn run<L, R, F>(&self, loader: L, make_renderer: F) -> Result<RunSummary>
    where
        L: MeshLoader,
        R: DepthRenderer,
        F: FnOnce(u32, u32) -> Result<R>,
    {
        let catalog = self.load_catalog()?;
        let mut scene = self.build_scene(loader)?;

        let (width, height) = self.config.canvas_size();
        let mut renderer = make_renderer(width, height)?;
        if renderer.viewport() != (width, height) {
            return Err(Error::InvalidData(format!(
                "renderer canvas {:?} does not match the configured {}x{}",
                renderer.viewport(),
                width,
                height
            )));
        }

        let mut exporter = Exporter::from_config(&self.config);
        exporter.prepare(&scene)?;
        info!(
            "Annotating {} frames with {} instances ({} export, {}x{} canvas)",
            catalog.len(),
            scene.len(),
            exporter.name(),
            width,
            height
        );

        for (index, pose) in catalog.iter().enumerate() {
            let frame = FrameContext::new(index, pose, &self.config);
            self.process_frame(&frame, pose, &mut scene, &mut renderer, &mut exporter)?;
        }

        let summary = RunSummary {
            frames: catalog.len(),
            instances: scene.len(),
        };
        info!(
            "Finished: {} frames written to {}",
            summary.frames,
            self.config.output_dir.display()
        );
        Ok(summary)
    }

    /// Segment, annotate and write a single frame
    pub fn process_frame<R, W>(
        &self,
        frame: &FrameContext,
        pose: &CameraPose,
        scene: &mut SceneGraph,
        renderer: &mut R,
        writer: &mut W,
    ) -> Result<()>
    where
        R: DepthRenderer + ?Sized,
        W: AnnotationWriter + ?Sized,
    {
        let camera_to_world = pose.camera_to_world_transform()?;
        scene.set_camera_pose(compose_camera_pose(&camera_to_world));

        let segmentation = self.segmenter.segment(renderer, scene)?;

        let validity = if writer.uses_depth_validity() {
            Some(read_depth_validity(&frame.depth_path)?)
        } else {
            None
        };
        let annotation = Annotator::from_config(&self.config).annotate(
            pose,
            scene,
            &segmentation,
            validity.as_ref(),
        )?;

        writer.write_frame(frame, scene, &annotation, &segmentation)?;
        debug!("Frame {} ('{}') done", frame.index, frame.frame_id);
        Ok(())
    }
}

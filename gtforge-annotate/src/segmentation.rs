//! Occlusion-aware instance segmentation from depth-only render passes
//!
//! For every frame the scene is rendered once with all instances visible,
//! then once per instance with only that instance visible. A pixel belongs
//! to instance `i` when `i`'s solo depth equals the composite depth there,
//! i.e. `i` is the front-most surface. Cost is `1 + N` renders per frame.

use crate::config::DEFAULT_DEPTH_EPSILON;
use gtforge_core::{DepthMap, DepthRenderer, Error, Mask, Result, SceneGraph, SegmentationMap};
use log::{debug, warn};
use rayon::prelude::*;

/// Masks of one instance for one frame, on the full render canvas
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceCoverage {
    /// Pixels covered by the instance's own geometry, ignoring occluders
    pub all: Mask,
    /// Pixels where the instance is the front-most surface
    pub visible: Mask,
}

/// Segmentation result of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSegmentation {
    /// 0 for background, otherwise instance index + 1
    pub labels: SegmentationMap,
    /// Per-instance masks in index order
    pub instances: Vec<InstanceCoverage>,
}

impl FrameSegmentation {
    fn background(width: u32, height: u32, instance_count: usize) -> Self {
        let empty = InstanceCoverage {
            all: Mask::empty(width, height),
            visible: Mask::empty(width, height),
        };
        Self {
            labels: SegmentationMap::background(width, height),
            instances: vec![empty; instance_count],
        }
    }
}

/// Multi-pass depth segmenter
#[derive(Debug, Clone, Copy)]
pub struct OcclusionSegmenter {
    epsilon: f32,
}

impl Default for OcclusionSegmenter {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_DEPTH_EPSILON,
        }
    }
}

impl OcclusionSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth tolerance when comparing solo and composite passes
    pub fn with_epsilon(epsilon: f32) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Segment the current frame
    ///
    /// Renders from the scene camera's current pose. Every instance is
    /// visible again when this returns, whether or not rendering failed.
    pub fn segment<R>(&self, renderer: &mut R, scene: &mut SceneGraph) -> Result<FrameSegmentation>
    where
        R: DepthRenderer + ?Sized,
    {
        let result = self.run_passes(renderer, scene);
        scene.set_all_visible(true);
        result
    }

    fn run_passes<R>(&self, renderer: &mut R, scene: &mut SceneGraph) -> Result<FrameSegmentation>
    where
        R: DepthRenderer + ?Sized,
    {
        let (width, height) = renderer.viewport();
        let k = scene.intrinsics();
        if (k.width, k.height) != (width, height) {
            return Err(Error::InvalidData(format!(
                "renderer canvas {}x{} does not match camera {}x{}",
                width, height, k.width, k.height
            )));
        }

        scene.set_all_visible(true);
        let full = render_checked(renderer, scene, (width, height))?;

        if !full.has_geometry() {
            warn!("Full-scene depth pass is empty; emitting background segmentation");
            return Ok(FrameSegmentation::background(width, height, scene.len()));
        }

        scene.set_all_visible(false);
        let mut labels = SegmentationMap::background(width, height);
        let mut instances = Vec::with_capacity(scene.len());

        for index in 0..scene.len() {
            scene.set_visible(index, true)?;
            let solo = render_checked(renderer, scene, (width, height))?;
            scene.set_visible(index, false)?;

            let coverage = self.classify(&solo, &full)?;
            let label = index as u32 + 1;
            labels
                .labels_mut()
                .par_iter_mut()
                .zip(coverage.visible.as_slice().par_iter())
                .for_each(|(l, &front)| {
                    if front {
                        *l = label;
                    }
                });

            debug!(
                "Instance {}: {} px total, {} px visible",
                index,
                coverage.all.count(),
                coverage.visible.count()
            );
            instances.push(coverage);
        }

        Ok(FrameSegmentation { labels, instances })
    }

    /// Compare one solo pass against the composite pass
    pub fn classify(&self, solo: &DepthMap, full: &DepthMap) -> Result<InstanceCoverage> {
        if solo.dimensions() != full.dimensions() {
            return Err(Error::InvalidData(format!(
                "depth passes differ in size: {:?} vs {:?}",
                solo.dimensions(),
                full.dimensions()
            )));
        }
        let (width, height) = full.dimensions();
        let eps = self.epsilon;

        let all: Vec<bool> = solo.as_slice().par_iter().map(|&s| s > 0.0).collect();
        // s > 0 keeps visible a subset of all even for composite depths below eps
        let visible: Vec<bool> = solo
            .as_slice()
            .par_iter()
            .zip(full.as_slice().par_iter())
            .map(|(&s, &f)| f > 0.0 && s > 0.0 && (s - f).abs() < eps)
            .collect();

        Ok(InstanceCoverage {
            all: Mask::new(width, height, all)?,
            visible: Mask::new(width, height, visible)?,
        })
    }
}

fn render_checked<R>(renderer: &mut R, scene: &SceneGraph, expected: (u32, u32)) -> Result<DepthMap>
where
    R: DepthRenderer + ?Sized,
{
    let depth = renderer.render_depth(scene)?;
    if depth.dimensions() != expected {
        return Err(Error::InvalidData(format!(
            "renderer returned {:?} depth for a {:?} canvas",
            depth.dimensions(),
            expected
        )));
    }
    Ok(depth)
}

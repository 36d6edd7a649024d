//! Capabilities the pipeline consumes but does not implement

use crate::{DepthMap, Result, SceneGraph, TriangleMesh};
use std::path::Path;

/// Offscreen depth renderer bound to a fixed canvas
///
/// Implementations render every instance flagged visible in `scene` from
/// the scene camera's pose, and return camera-space depth with 0 where no
/// geometry lands. The canvas size never changes for the renderer's lifetime
/// and must match the scene camera's intrinsics.
pub trait DepthRenderer {
    /// Canvas size as `(width, height)`
    fn viewport(&self) -> (u32, u32);

    /// Render a depth-only pass of the currently visible instances
    fn render_depth(&mut self, scene: &SceneGraph) -> Result<DepthMap>;
}

impl<R: DepthRenderer + ?Sized> DepthRenderer for &mut R {
    fn viewport(&self) -> (u32, u32) {
        (**self).viewport()
    }

    fn render_depth(&mut self, scene: &SceneGraph) -> Result<DepthMap> {
        (**self).render_depth(scene)
    }
}

impl<R: DepthRenderer + ?Sized> DepthRenderer for Box<R> {
    fn viewport(&self) -> (u32, u32) {
        (**self).viewport()
    }

    fn render_depth(&mut self, scene: &SceneGraph) -> Result<DepthMap> {
        (**self).render_depth(scene)
    }
}

/// Loads mesh assets from a model repository
pub trait MeshLoader {
    fn load_mesh(&self, path: &Path) -> Result<TriangleMesh>;
}

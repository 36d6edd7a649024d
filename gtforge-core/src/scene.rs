//! Static multi-object scene: one camera node and a fixed set of instances
//!
//! Instance transforms never change after construction. Between frames only
//! the camera pose and the per-instance visibility flags are mutated.

use crate::{CameraIntrinsics, CameraNode, Error, Result, Transform3D, TriangleMesh};
use std::path::PathBuf;
use std::sync::Arc;

/// One renderable object occurrence
#[derive(Debug, Clone)]
pub struct ObjectInstance {
    /// Position in the scene, unique and stable for the run
    pub index: usize,
    /// Dataset category id (`obj_id` in BOP records)
    pub category_id: u32,
    pub name: String,
    pub mesh: Arc<TriangleMesh>,
    /// File the mesh was loaded from, if any
    pub mesh_path: Option<PathBuf>,
    /// Static model-to-world transform
    pub transform: Transform3D,
}

impl ObjectInstance {
    /// Instance whose category id equals its index
    pub fn new(
        index: usize,
        name: impl Into<String>,
        mesh: Arc<TriangleMesh>,
        transform: Transform3D,
    ) -> Self {
        Self {
            index,
            category_id: index as u32,
            name: name.into(),
            mesh,
            mesh_path: None,
            transform,
        }
    }

    pub fn with_category_id(mut self, category_id: u32) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn with_mesh_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mesh_path = Some(path.into());
        self
    }
}

/// Instance plus its mutable visibility flag
#[derive(Debug, Clone)]
pub struct InstanceNode {
    instance: ObjectInstance,
    visible: bool,
}

impl InstanceNode {
    pub fn instance(&self) -> &ObjectInstance {
        &self.instance
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// The scene handed to every render call
#[derive(Debug, Clone)]
pub struct SceneGraph {
    camera: CameraNode,
    nodes: Vec<InstanceNode>,
}

impl SceneGraph {
    /// Build a scene; instance indices must be `0..n` in order
    pub fn new(camera: CameraNode, instances: Vec<ObjectInstance>) -> Result<Self> {
        for (position, instance) in instances.iter().enumerate() {
            if instance.index != position {
                return Err(Error::InvalidData(format!(
                    "instance '{}' has index {} but sits at position {}",
                    instance.name, instance.index, position
                )));
            }
            if !instance.transform.is_finite() {
                return Err(Error::InvalidData(format!(
                    "instance '{}' has a non-finite transform",
                    instance.name
                )));
            }
        }

        let nodes = instances
            .into_iter()
            .map(|instance| InstanceNode {
                instance,
                visible: true,
            })
            .collect();

        Ok(Self { camera, nodes })
    }

    pub fn camera(&self) -> &CameraNode {
        &self.camera
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.camera.intrinsics
    }

    /// Update the render-convention camera-to-world pose
    pub fn set_camera_pose(&mut self, pose: Transform3D) {
        self.camera.pose = pose;
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[InstanceNode] {
        &self.nodes
    }

    /// Instances in index order
    pub fn instances(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.nodes.iter().map(|node| &node.instance)
    }

    pub fn instance(&self, index: usize) -> Option<&ObjectInstance> {
        self.nodes.get(index).map(|node| &node.instance)
    }

    /// Instances currently flagged visible
    pub fn visible_instances(&self) -> impl Iterator<Item = &ObjectInstance> {
        self.nodes
            .iter()
            .filter(|node| node.visible)
            .map(|node| &node.instance)
    }

    pub fn is_visible(&self, index: usize) -> Option<bool> {
        self.nodes.get(index).map(|node| node.visible)
    }

    /// Change one instance's visibility flag
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        let count = self.nodes.len();
        let node = self.nodes.get_mut(index).ok_or_else(|| {
            Error::InvalidData(format!("instance index {index} out of range (scene has {count})"))
        })?;
        node.visible = visible;
        Ok(())
    }

    /// Set every instance's visibility flag
    pub fn set_all_visible(&mut self, visible: bool) {
        for node in &mut self.nodes {
            node.visible = visible;
        }
    }

    /// True when every instance is visible
    pub fn all_visible(&self) -> bool {
        self.nodes.iter().all(|node| node.visible)
    }
}

//! Camera poses keyed by frame identifier

use crate::{Error, Result, Transform3D};
use serde::{Deserialize, Serialize};

/// Tolerance used when validating the rotation block of a pose
pub const RIGIDITY_TOLERANCE: f64 = 1e-6;

/// Direction a pose maps between camera and world frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseConvention {
    CameraToWorld,
    WorldToCamera,
}

/// A camera pose for one frame of the trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Frame identifier, usually the image file name
    pub frame_id: String,
    pub transform: Transform3D,
    pub convention: PoseConvention,
}

impl CameraPose {
    /// Create a camera-to-world pose
    pub fn camera_to_world(frame_id: impl Into<String>, transform: Transform3D) -> Self {
        Self {
            frame_id: frame_id.into(),
            transform,
            convention: PoseConvention::CameraToWorld,
        }
    }

    /// File stem of the frame identifier (`"000012.png"` -> `"000012"`)
    pub fn frame_stem(&self) -> &str {
        self.frame_id
            .split('.')
            .next()
            .unwrap_or(self.frame_id.as_str())
    }

    /// Same pose expressed in the opposite convention
    pub fn inverted(&self) -> Result<Self> {
        Ok(Self {
            frame_id: self.frame_id.clone(),
            transform: self.transform.try_inverse()?,
            convention: match self.convention {
                PoseConvention::CameraToWorld => PoseConvention::WorldToCamera,
                PoseConvention::WorldToCamera => PoseConvention::CameraToWorld,
            },
        })
    }

    /// Camera-to-world transform regardless of the stored convention
    pub fn camera_to_world_transform(&self) -> Result<Transform3D> {
        match self.convention {
            PoseConvention::CameraToWorld => Ok(self.transform),
            PoseConvention::WorldToCamera => self.transform.try_inverse(),
        }
    }

    /// Check that entries are finite and the rotation block is orthonormal
    pub fn validate(&self) -> Result<()> {
        if !self.transform.is_finite() {
            return Err(Error::InvalidData(format!(
                "pose for frame '{}' has non-finite entries",
                self.frame_id
            )));
        }
        if !self.transform.is_rigid(RIGIDITY_TOLERANCE) {
            return Err(Error::InvalidData(format!(
                "pose for frame '{}' is not a rigid transform",
                self.frame_id
            )));
        }
        Ok(())
    }
}

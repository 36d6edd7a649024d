//! Rigid transforms and the fixed pose conventions used by the pipeline
//!
//! Trajectories arrive camera-to-world in the vision convention (x right,
//! y down, z forward). The renderer expects the graphics convention (y up,
//! looking down -z). [`compose_camera_pose`] bridges the two with the
//! axis-alignment matrix `A = diag(1, -1, -1, 1)`.

use crate::{Error, Result};
use nalgebra::{Isometry3, Matrix3, Matrix4, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Determinant magnitude below which a transform is treated as non-invertible
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// A 4x4 homogeneous transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f64>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a transformation from translation and rotation
    pub fn from_translation_rotation(
        translation: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        let isometry = Isometry3::from_parts(translation.into(), rotation);
        Self {
            matrix: isometry.to_homogeneous(),
        }
    }

    /// Build from a row-major `[[f64; 4]; 4]`, the layout used in configuration files
    pub fn from_rows(rows: &[[f64; 4]; 4]) -> Self {
        Self {
            matrix: Matrix4::from_fn(|r, c| rows[r][c]),
        }
    }

    /// Row-major copy of the matrix
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }

    /// Upper-left 3x3 block
    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Translation column
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Compose this transformation with another (`self * other`)
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Inverse, failing with [`Error::SingularTransform`] when the determinant is ~0
    pub fn try_inverse(&self) -> Result<Self> {
        let det = self.matrix.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return Err(Error::SingularTransform(format!(
                "determinant {det:e} is not invertible"
            )));
        }
        self.matrix
            .try_inverse()
            .filter(|inv| inv.iter().all(|v| v.is_finite()))
            .map(|matrix| Self { matrix })
            .ok_or_else(|| Error::SingularTransform("matrix inversion failed".to_string()))
    }

    /// True when every entry is finite
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }

    /// True when the bottom row is `[0 0 0 1]` and the rotation block is
    /// orthonormal with determinant +1, within `tolerance`
    pub fn is_rigid(&self, tolerance: f64) -> bool {
        if !self.is_finite() {
            return false;
        }
        let bottom = self.matrix.fixed_view::<1, 4>(3, 0);
        let expected_bottom = [0.0, 0.0, 0.0, 1.0];
        if bottom
            .iter()
            .zip(expected_bottom.iter())
            .any(|(a, b)| (a - b).abs() > tolerance)
        {
            return false;
        }
        let rotation = self.rotation();
        let gram = rotation.transpose() * rotation;
        (gram - Matrix3::identity()).amax() <= tolerance
            && (rotation.determinant() - 1.0).abs() <= tolerance
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f64>> for Transform3D {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }
}

impl From<Isometry3<f64>> for Transform3D {
    fn from(isometry: Isometry3<f64>) -> Self {
        Self {
            matrix: isometry.to_homogeneous(),
        }
    }
}

/// The axis-alignment matrix `diag(1, -1, -1, 1)`
pub fn axis_alignment() -> Transform3D {
    Transform3D::from(Matrix4::from_diagonal(&nalgebra::Vector4::new(
        1.0, -1.0, -1.0, 1.0,
    )))
}

/// Render-convention camera pose: `pose * A`, with no renormalization
pub fn compose_camera_pose(pose: &Transform3D) -> Transform3D {
    *pose * axis_alignment()
}

/// Object pose in camera space: `inverse(camera_pose) * model_transform`
pub fn model_to_camera(
    camera_pose: &Transform3D,
    model_transform: &Transform3D,
) -> Result<Transform3D> {
    let model_to_cam = camera_pose.try_inverse()? * *model_transform;
    if !model_to_cam.is_finite() {
        return Err(Error::SingularTransform(
            "model-to-camera transform has non-finite entries".to_string(),
        ));
    }
    Ok(model_to_cam)
}

/// One-time alignment of a reconstruction frame to the canonical scene frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Scale applied to pose translations
    pub scale: f64,
    /// Rigid transform applied on the left after scaling
    pub transform: Transform3D,
    /// The trajectory stores world-to-camera poses and must be inverted first
    pub invert_poses: bool,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            scale: 1.0,
            transform: Transform3D::identity(),
            invert_poses: false,
        }
    }
}

impl Registration {
    /// Create a registration from scale and transform
    pub fn new(scale: f64, transform: Transform3D) -> Self {
        Self {
            scale,
            transform,
            invert_poses: false,
        }
    }

    /// Mark the source trajectory as world-to-camera
    pub fn with_inverted_poses(mut self, invert: bool) -> Self {
        self.invert_poses = invert;
        self
    }

    /// Apply to a single pose
    pub fn apply(&self, pose: &Transform3D) -> Result<Transform3D> {
        let mut scaled = *pose;
        for row in 0..3 {
            scaled.matrix[(row, 3)] *= self.scale;
        }
        let oriented = if self.invert_poses {
            scaled.try_inverse()?
        } else {
            scaled
        };
        Ok(self.transform * oriented)
    }
}

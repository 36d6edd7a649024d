//! Pinhole camera description shared by the scene graph and the exporters

use serde::{Deserialize, Serialize};

/// Default near clipping plane of the render camera
pub const DEFAULT_ZNEAR: f64 = 0.05;
/// Default far clipping plane of the render camera
pub const DEFAULT_ZFAR: f64 = 100.0;

/// Camera intrinsic parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl CameraIntrinsics {
    /// Create intrinsics for a `width` x `height` image
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// K flattened row-major
    pub fn to_row_major(&self) -> [f64; 9] {
        [self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0]
    }

    /// Intrinsics for a canvas grown by `pad_x` columns and `pad_y` rows on
    /// every side; the input image sits centered in the new canvas
    ///
    /// Returns `None` when the canvas size does not fit in `u32`.
    pub fn checked_padded(&self, pad_x: u32, pad_y: u32) -> Option<Self> {
        let width = pad_x.checked_mul(2)?.checked_add(self.width)?;
        let height = pad_y.checked_mul(2)?.checked_add(self.height)?;
        Some(Self {
            fx: self.fx,
            fy: self.fy,
            cx: self.cx + pad_x as f64,
            cy: self.cy + pad_y as f64,
            width,
            height,
        })
    }

    /// Like [`checked_padded`](Self::checked_padded), saturating the canvas
    /// size on overflow
    pub fn padded(&self, pad_x: u32, pad_y: u32) -> Self {
        self.checked_padded(pad_x, pad_y).unwrap_or_else(|| Self {
            fx: self.fx,
            fy: self.fy,
            cx: self.cx + pad_x as f64,
            cy: self.cy + pad_y as f64,
            width: pad_x.saturating_mul(2).saturating_add(self.width),
            height: pad_y.saturating_mul(2).saturating_add(self.height),
        })
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// The scene's single camera node
#[derive(Debug, Clone, PartialEq)]
pub struct CameraNode {
    pub intrinsics: CameraIntrinsics,
    pub znear: f64,
    pub zfar: f64,
    /// Camera-to-world pose in the render convention
    pub pose: crate::Transform3D,
}

impl CameraNode {
    /// Camera at the origin with default clipping planes
    pub fn new(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            znear: DEFAULT_ZNEAR,
            zfar: DEFAULT_ZFAR,
            pose: crate::Transform3D::identity(),
        }
    }
}

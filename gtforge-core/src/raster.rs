//! Row-major image buffers produced by the segmentation passes
//!
//! All buffers index pixels as `row * width + col`, row 0 at the top.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

fn check_len(width: u32, height: u32, len: usize, what: &str) -> Result<()> {
    let expected = width as usize * height as usize;
    if len != expected {
        return Err(Error::InvalidData(format!(
            "{what} buffer has {len} values, expected {expected} for {width}x{height}"
        )));
    }
    Ok(())
}

/// Per-pixel camera-space depth, 0 where no geometry was rasterized
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthMap {
    /// Wrap a row-major buffer
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        check_len(width, height, data.len(), "depth")?;
        Ok(Self { width, height, data })
    }

    /// Empty depth map (no geometry anywhere)
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Depth at `(col, row)`
    pub fn get(&self, col: u32, row: u32) -> f32 {
        self.data[row as usize * self.width as usize + col as usize]
    }

    /// True when at least one pixel carries geometry
    pub fn has_geometry(&self) -> bool {
        self.data.iter().any(|&d| d > 0.0)
    }
}

/// `[left, top, width, height]` box, serialized as a 4-element array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from(v: [u32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.left, b.top, b.width, b.height]
    }
}

/// Sub-rectangle of a larger canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PublishWindow {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Window covering a whole `width` x `height` canvas
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// True when the window lies inside a `width` x `height` canvas
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Binary per-pixel mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// Wrap a row-major buffer
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Result<Self> {
        check_len(width, height, data.len(), "mask")?;
        Ok(Self { width, height, data })
    }

    /// All-false mask
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Value at `(col, row)`
    pub fn get(&self, col: u32, row: u32) -> bool {
        self.data[row as usize * self.width as usize + col as usize]
    }

    /// Set the value at `(col, row)`
    pub fn set(&mut self, col: u32, row: u32, value: bool) {
        let idx = row as usize * self.width as usize + col as usize;
        self.data[idx] = value;
    }

    /// Number of true pixels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// True when every true pixel of `self` is also true in `other`
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.data.iter().zip(&other.data).all(|(&a, &b)| !a || b)
    }

    /// Tight box around the true pixels; width and height are `max - min`,
    /// so a single pixel yields a zero-size box. `None` for an empty mask.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let width = self.width as usize;
        let mut bounds: Option<(usize, usize, usize, usize)> = None;

        for (i, _) in self.data.iter().enumerate().filter(|&(_, &v)| v) {
            let (row, col) = (i / width, i % width);
            bounds = Some(match bounds {
                None => (col, row, col, row),
                Some((left, top, right, bottom)) => {
                    (left.min(col), top.min(row), right.max(col), bottom.max(row))
                }
            });
        }

        bounds.map(|(left, top, right, bottom)| {
            BoundingBox::new(
                left as u32,
                top as u32,
                (right - left) as u32,
                (bottom - top) as u32,
            )
        })
    }

    /// Bounding box, or the zero-area box for an empty mask
    pub fn bounding_box_or_zero(&self) -> BoundingBox {
        self.bounding_box().unwrap_or_default()
    }

    /// Copy out the pixels covered by `window`
    pub fn crop(&self, window: &PublishWindow) -> Result<Mask> {
        if !window.fits(self.width, self.height) {
            return Err(Error::InvalidData(format!(
                "publish window {:?} exceeds {}x{} mask",
                window, self.width, self.height
            )));
        }

        let width = self.width as usize;
        let mut data = Vec::with_capacity(window.width as usize * window.height as usize);
        for row in window.y as usize..(window.y + window.height) as usize {
            let start = row * width + window.x as usize;
            data.extend_from_slice(&self.data[start..start + window.width as usize]);
        }

        Ok(Mask {
            width: window.width,
            height: window.height,
            data,
        })
    }
}

/// Instance label per pixel: 0 is background, otherwise instance index + 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl SegmentationMap {
    /// All-background map
    pub fn background(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut [u32] {
        &mut self.labels
    }

    /// Label at `(col, row)`
    pub fn get(&self, col: u32, row: u32) -> u32 {
        self.labels[row as usize * self.width as usize + col as usize]
    }

    /// Pixels owned by instance `index`
    pub fn instance_mask(&self, index: usize) -> Mask {
        let label = index as u32 + 1;
        Mask {
            width: self.width,
            height: self.height,
            data: self.labels.iter().map(|&l| l == label).collect(),
        }
    }

    /// True when no pixel belongs to an instance
    pub fn is_background(&self) -> bool {
        self.labels.iter().all(|&l| l == 0)
    }
}

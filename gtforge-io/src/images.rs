//! Image reading and writing through the `image` crate

use gtforge_core::{Error, Mask, Result};
use image::{GrayImage, ImageError, Luma, RgbImage};
use std::fs;
use std::path::Path;

fn image_error(path: &Path, err: ImageError) -> Error {
    Error::Image(format!("{}: {}", path.display(), err))
}

/// Load an image as 8-bit RGB
pub fn read_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| image_error(path, e))
}

/// Load a depth image and report which pixels hold a nonzero reading
pub fn read_depth_validity<P: AsRef<Path>>(path: P) -> Result<Mask> {
    let path = path.as_ref();
    let depth = image::open(path)
        .map(|img| img.to_luma16())
        .map_err(|e| image_error(path, e))?;
    let data = depth.pixels().map(|p| p.0[0] != 0).collect();
    Mask::new(depth.width(), depth.height(), data)
}

/// Copy an input image byte-for-byte
pub fn copy_verbatim<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    fs::copy(from, to)?;
    Ok(())
}

/// Convert a mask into an 8-bit image, 255 for true pixels
pub fn mask_to_image(mask: &Mask) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get(x, y) { 255 } else { 0 }])
    })
}

/// Write a mask as an 8-bit PNG
pub fn write_mask<P: AsRef<Path>>(mask: &Mask, path: P) -> Result<()> {
    let path = path.as_ref();
    mask_to_image(mask)
        .save(path)
        .map_err(|e| image_error(path, e))
}

/// Copy of `rgb` with every pixel outside `mask` set to black
pub fn apply_mask(rgb: &RgbImage, mask: &Mask) -> Result<RgbImage> {
    if rgb.dimensions() != (mask.width(), mask.height()) {
        return Err(Error::InvalidData(format!(
            "image is {}x{} but mask is {}x{}",
            rgb.width(),
            rgb.height(),
            mask.width(),
            mask.height()
        )));
    }

    let mut out = rgb.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if !mask.get(x, y) {
            pixel.0 = [0, 0, 0];
        }
    }
    Ok(out)
}

/// Write `rgb` with pixels outside `mask` zeroed
pub fn write_masked_rgb<P: AsRef<Path>>(rgb: &RgbImage, mask: &Mask, path: P) -> Result<()> {
    let path = path.as_ref();
    apply_mask(rgb, mask)?
        .save(path)
        .map_err(|e| image_error(path, e))
}

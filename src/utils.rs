use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::prelude::*;

use crate::face::Face;

// maps a u8 sample to roughly [-1, 1]
#[inline]
pub fn normalize_pixel(value: u8) -> f32 {
    (value as f32 - 127.5) * 0.0078125
}

/// Converts an RGB image into a normalised `(3, height, width)` tensor.
pub fn to_chw_tensor(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array3::zeros((3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[c, y as usize, x as usize]] = normalize_pixel(pixel.0[c]);
        }
    }
    tensor
}

/// Resizes an image to `width x height` with bilinear filtering.
pub fn resize_bilinear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    imageops::resize(image, width, height, FilterType::Triangle)
}

// windows whose side exceeds this many times the image (or patch) side are
// not materialised with their padding
const MAX_PADDED_RATIO: i64 = 4;

fn span(from: i64, to: i64) -> i64 {
    to.saturating_sub(from).saturating_add(1).max(1)
}

/// Copies the pixel window `[x0, x1] x [y0, y1]` (inclusive corners) out of
/// `image`. Parts of the window outside the image are zero filled, so the
/// result always has the window's full size.
pub fn crop_padded(image: &RgbImage, x0: i64, y0: i64, x1: i64, y1: i64) -> RgbImage {
    let width = span(x0, x1).min(u32::MAX as i64) as u32;
    let height = span(y0, y1).min(u32::MAX as i64) as u32;
    let mut window = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    imageops::replace(&mut window, image, x0.saturating_neg(), y0.saturating_neg());
    window
}

/// Crops the window like [`crop_padded`] and resizes it to a `size` square.
///
/// Oversized windows only resample their visible part, placed where it lands
/// in the resized window, so the cost is bounded by the image size.
pub fn crop_resized(image: &RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let (window_width, window_height) = (span(x0, x1), span(y0, y1));
    let limit = MAX_PADDED_RATIO * i64::from(width.max(height).max(size));
    if window_width <= limit && window_height <= limit {
        return resize_bilinear(&crop_padded(image, x0, y0, x1, y1), size, size);
    }

    let mut patch = RgbImage::from_pixel(size, size, Rgb([0, 0, 0]));
    let (vx0, vy0) = (x0.max(0), y0.max(0));
    let vx1 = x1.min(i64::from(width) - 1);
    let vy1 = y1.min(i64::from(height) - 1);
    if vx0 > vx1 || vy0 > vy1 {
        return patch;
    }

    // visible pixel range mapped onto the patch grid
    let to_patch = |offset: i64, extent: i64| {
        (offset as f64 * f64::from(size) / extent as f64)
            .round()
            .clamp(0.0, f64::from(size)) as u32
    };
    let px0 = to_patch(vx0.saturating_sub(x0), window_width);
    let px1 = to_patch((vx1 + 1).saturating_sub(x0), window_width);
    let py0 = to_patch(vy0.saturating_sub(y0), window_height);
    let py1 = to_patch((vy1 + 1).saturating_sub(y0), window_height);
    if px1 <= px0 || py1 <= py0 {
        return patch;
    }

    let visible = imageops::crop_imm(
        image,
        vx0 as u32,
        vy0 as u32,
        (vx1 - vx0 + 1) as u32,
        (vy1 - vy0 + 1) as u32,
    )
    .to_image();
    let resized = resize_bilinear(&visible, px1 - px0, py1 - py0);
    imageops::replace(&mut patch, &resized, i64::from(px0), i64::from(py0));
    patch
}

/// Crops a face from an image on its bounding box with some margin, and
/// resizes the crop to an `image_size` square.
///
/// Half the margin is added on each side; the crop is clamped to the image.
pub fn align_face(image: &RgbImage, face: &Face, image_size: u32, margin: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let half = (margin / 2) as i32;

    let x0 = (face.bb_p1.x - half).clamp(0, width as i32 - 1) as u32;
    let y0 = (face.bb_p1.y - half).clamp(0, height as i32 - 1) as u32;
    let x1 = (face.bb_p2.x + half).clamp(0, width as i32) as u32;
    let y1 = (face.bb_p2.y + half).clamp(0, height as i32) as u32;

    let crop_width = x1.saturating_sub(x0).max(1);
    let crop_height = y1.saturating_sub(y0).max(1);
    let cropped = imageops::crop_imm(image, x0, y0, crop_width, crop_height).to_image();
    resize_bilinear(&cropped, image_size, image_size)
}

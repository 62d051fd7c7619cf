use image::{Rgba, RgbaImage};

use crate::raster::{RasterImage, CHANNELS};

/// Colour of a differing or out-of-bounds pixel in a diff image.
pub const SENTINEL: [u8; CHANNELS] = [255, 0, 0, 255];

/// Colour of every other pixel in a diff image.
pub const BACKGROUND: [u8; CHANNELS] = [0, 0, 0, 255];

/// Compares two images byte for byte.
///
/// Returns `None` when both have the same dimensions and identical data.
/// Otherwise returns a diff covering the union of both images: black, with
/// [`SENTINEL`] wherever the coordinate lies outside either image or any
/// channel differs. Matching pixels are not copied through.
pub fn compare(a: &RasterImage, b: &RasterImage) -> Option<RasterImage> {
    if a.dimensions() == b.dimensions() && a.data() == b.data() {
        return None;
    }
    Some(generate_diff(a, b))
}

fn generate_diff(a: &RasterImage, b: &RasterImage) -> RasterImage {
    let width = a.width().max(b.width());
    let height = a.height().max(b.height());

    RgbaImage::from_fn(width, height, |x, y| match (a.pixel(x, y), b.pixel(x, y)) {
        (Some(pa), Some(pb)) if pa == pb => Rgba(BACKGROUND),
        _ => Rgba(SENTINEL),
    })
    .into()
}

//! Raw image codec: PNG bytes to and from an uncompressed RGBA buffer.

use std::io::Cursor;

use image::{ColorType, ImageError, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

/// Every [`RasterImage`] is 8-bit RGBA.
pub const CHANNELS: usize = 4;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Not a valid compressed image: {0}")]
    Invalid(#[from] ImageError),
}

/// Decoded 8-bit RGBA pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Wraps a raw RGBA buffer, or returns `None` if its length does not
    /// match the dimensions exactly.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if buffer_len(width, height)? != data.len() {
            return None;
        }
        RgbaImage::from_raw(width, height, data).map(Self::from)
    }

    /// An image where every pixel is `pixel`.
    pub fn filled(width: u32, height: u32, pixel: [u8; CHANNELS]) -> Self {
        RgbaImage::from_pixel(width, height, Rgba(pixel)).into()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> usize {
        CHANNELS
    }

    pub fn data(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// The RGBA bytes at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        self.pixels.get_pixel_checked(x, y).map(|px| &px.0[..])
    }

    /// Overwrites the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: [u8; CHANNELS]) {
        if let Some(px) = self.pixels.get_pixel_mut_checked(x, y) {
            *px = Rgba(pixel);
        }
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

fn buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)
}

/// Decodes compressed image bytes, normalising any colour type to RGBA8.
pub fn decode(bytes: &[u8]) -> Result<RasterImage, DecodeError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.into_rgba8().into())
}

/// Encodes `image` as an RGBA PNG.
pub fn encode(image: &RasterImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut out,
        image.data(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
        ImageFormat::Png,
    )?;
    Ok(out.into_inner())
}

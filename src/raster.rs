//! Immutable raster images and rendered pages.
//!
//! Every stage hands images to the next one by value. [`RasterImage`] wraps
//! the pixel buffer in an `Arc` so handing it on is cheap and no stage can
//! mutate a buffer another stage is holding.

use crate::error::CardMakerError;
use image::{DynamicImage, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// A decoded RGBA bitmap. Immutable once produced.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage(Arc<RgbaImage>);

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self(Arc::new(pixels))
    }

    /// Decode encoded PNG/JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::from(image::load_from_memory(bytes)?))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    /// `true` when both handles point at the same pixel buffer.
    pub fn ptr_eq(&self, other: &RasterImage) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageRgba8(buf) => Self::new(buf),
            other => Self::new(other.to_rgba8()),
        }
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(buf: RgbaImage) -> Self {
        Self::new(buf)
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterImage({}x{})", self.width(), self.height())
    }
}

/// One rasterised document page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position in the document.
    pub index: usize,
    pub image: RasterImage,
    /// Human-readable label, e.g. "페이지 3" or the source file name.
    pub label: String,
}

impl Page {
    pub fn new(index: usize, image: RasterImage) -> Self {
        Self {
            index,
            image,
            label: page_label(index),
        }
    }
}

/// Default label for the page at 0-based `index`.
pub fn page_label(index: usize) -> String {
    format!("페이지 {}", index + 1)
}

/// Pixel size of a page at `scale`, rounded half away from zero.
///
/// Used by every decoder so page images always have
/// `round(native * scale)` dimensions.
pub fn scaled_size(native_w: f32, native_h: f32, scale: f32) -> Result<(u32, u32), CardMakerError> {
    let w = (native_w as f64 * scale as f64).round();
    let h = (native_h as f64 * scale as f64).round();
    if !(w >= 1.0 && h >= 1.0) || w > u32::MAX as f64 || h > u32::MAX as f64 {
        return Err(CardMakerError::InvalidConfig(format!(
            "scale {scale} gives an empty or oversized page ({native_w}x{native_h})"
        )));
    }
    Ok((w as u32, h as u32))
}

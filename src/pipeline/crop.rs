//! Map a display-space selection back to native pixels and cut it out.
//!
//! `scale = native_width / display_width`; every coordinate is multiplied by
//! it and rounded half away from zero. Rounding can push the rect one pixel
//! past the image edge, so the native rect is clamped before copying.

use crate::error::CardMakerError;
use crate::pipeline::selection::{DisplayTransform, SelectionRect, SelectionTracker};
use crate::raster::{Page, RasterImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rectangle in native pixels, already clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// A native-resolution crop and the page it was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct CropResult {
    pub source_page_index: usize,
    pub image: RasterImage,
}

/// Compute the clamped native rect for `rect` on an image of
/// `image_w × image_h` shown through `transform`.
pub fn native_rect(
    image_w: u32,
    image_h: u32,
    transform: &DisplayTransform,
    rect: &SelectionRect,
) -> Result<NativeRect, CardMakerError> {
    if !(transform.display_width > 0.0 && transform.display_width.is_finite()) {
        return Err(CardMakerError::InvalidCrop {
            reason: "image is not laid out (display width is 0)".into(),
        });
    }
    let scale = image_w as f64 / transform.display_width;
    let to_native = |v: f64| (v * scale).round().max(0.0);

    let x = to_native(rect.x).min(image_w as f64);
    let y = to_native(rect.y).min(image_h as f64);
    let w = to_native(rect.w).min(image_w as f64 - x);
    let h = to_native(rect.h).min(image_h as f64 - y);

    if !(w >= 1.0 && h >= 1.0) {
        return Err(CardMakerError::InvalidCrop {
            reason: format!("selection maps to {}x{} native pixels", w, h),
        });
    }
    Ok(NativeRect {
        x: x as u32,
        y: y as u32,
        w: w as u32,
        h: h as u32,
    })
}

/// Cut the region of `image` under display-space `rect`.
pub fn extract(
    image: &RasterImage,
    transform: &DisplayTransform,
    rect: &SelectionRect,
) -> Result<RasterImage, CardMakerError> {
    let r = native_rect(image.width(), image.height(), transform, rect)?;
    let cropped = image::imageops::crop_imm(image.pixels(), r.x, r.y, r.w, r.h).to_image();
    debug!(
        "Extracted crop x={} y={} w={} h={} from {:?}",
        r.x, r.y, r.w, r.h, image
    );
    Ok(RasterImage::new(cropped))
}

/// Extract the tracker's current selection from `page`.
///
/// Refuses selections that are not confirmable yet, so a 5×5 rect is never
/// turned into a crop.
pub fn extract_selection(page: &Page, tracker: &SelectionTracker) -> Result<CropResult, CardMakerError> {
    let rect = tracker.rect().ok_or_else(|| CardMakerError::InvalidCrop {
        reason: "nothing is selected".into(),
    })?;
    if !tracker.is_confirmable() {
        return Err(CardMakerError::InvalidCrop {
            reason: format!(
                "selection {:.0}x{:.0} is below the {} px minimum",
                rect.w,
                rect.h,
                tracker.min_selectable()
            ),
        });
    }
    let transform = tracker.transform().ok_or_else(|| CardMakerError::InvalidCrop {
        reason: "no image is displayed".into(),
    })?;
    let image = extract(&page.image, &transform, &rect)?;
    Ok(CropResult {
        source_page_index: page.index,
        image,
    })
}

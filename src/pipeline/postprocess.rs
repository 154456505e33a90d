//! Post-processing: deterministic cleanup of crops before they are shared.
//!
//! Two optional passes, both pure functions of their input:
//!
//! 1. [`trim_whitespace`] cuts the white margin around scanned content,
//!    keeping a little padding so glyphs do not touch the edge.
//! 2. [`fit_for_chat`] adds a thin white frame and shrinks the result to fit
//!    a chat bubble (400×533, i.e. 3:4).

use crate::raster::RasterImage;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::debug;

/// Default margin kept around trimmed content.
pub const TRIM_PADDING: u32 = 20;
/// Channel value above which a pixel counts as background.
pub const TRIM_THRESHOLD: u8 = 250;

/// White frame added by [`fit_for_chat`].
pub const CHAT_PADDING: u32 = 5;
pub const CHAT_MAX_WIDTH: u32 = 400;
pub const CHAT_MAX_HEIGHT: u32 = 533;

// ── Trim ─────────────────────────────────────────────────────────────────────

/// Crop to the bounding box of content pixels (any channel `<= threshold`),
/// grown by `padding` and clamped to the image.
///
/// An image with no content is returned unchanged (same buffer).
pub fn trim_whitespace(img: &RasterImage, padding: u32, threshold: u8) -> RasterImage {
    let px = img.pixels();
    let mut bbox: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in px.enumerate_pixels() {
        let [r, g, b, _] = p.0;
        if r <= threshold || g <= threshold || b <= threshold {
            bbox = Some(match bbox {
                None => (x, y, x + 1, y + 1),
                Some((l, t, rt, bt)) => (l.min(x), t.min(y), rt.max(x + 1), bt.max(y + 1)),
            });
        }
    }

    let Some((l, t, r, b)) = bbox else {
        debug!("trim_whitespace: no content in {:?}", img);
        return img.clone();
    };
    let left = l.saturating_sub(padding);
    let top = t.saturating_sub(padding);
    let right = (r + padding).min(img.width());
    let bottom = (b + padding).min(img.height());

    let out = image::imageops::crop_imm(px, left, top, right - left, bottom - top).to_image();
    debug!("Trimmed {:?} → {}x{}", img, out.width(), out.height());
    RasterImage::new(out)
}

// ── Chat fitting ─────────────────────────────────────────────────────────────

/// Frame `img` with [`CHAT_PADDING`] of white and scale the result down
/// uniformly (rounded) if it exceeds 400×533. The padding scales with it.
pub fn fit_for_chat(img: &RasterImage) -> RasterImage {
    let padded_w = img.width() + CHAT_PADDING * 2;
    let padded_h = img.height() + CHAT_PADDING * 2;

    let (final_w, final_h) = if padded_w > CHAT_MAX_WIDTH || padded_h > CHAT_MAX_HEIGHT {
        let scale = (CHAT_MAX_WIDTH as f64 / padded_w as f64)
            .min(CHAT_MAX_HEIGHT as f64 / padded_h as f64);
        (
            ((padded_w as f64 * scale).round() as u32).max(1),
            ((padded_h as f64 * scale).round() as u32).max(1),
        )
    } else {
        (padded_w, padded_h)
    };

    let pad = (CHAT_PADDING as f64 * (final_w as f64 / padded_w as f64)).round() as u32;
    let inner_w = final_w.saturating_sub(pad * 2).max(1);
    let inner_h = final_h.saturating_sub(pad * 2).max(1);

    let mut canvas = RgbaImage::from_pixel(final_w, final_h, Rgba([255, 255, 255, 255]));
    let content = if (inner_w, inner_h) == (img.width(), img.height()) {
        img.pixels().clone()
    } else {
        image::imageops::resize(img.pixels(), inner_w, inner_h, FilterType::Lanczos3)
    };
    image::imageops::overlay(&mut canvas, &content, pad as i64, pad as i64);

    debug!("Chat fit {:?} → {}x{}", img, final_w, final_h);
    RasterImage::new(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_box(w: u32, h: u32, bx: (u32, u32, u32, u32)) -> RasterImage {
        RasterImage::new(RgbaImage::from_fn(w, h, |x, y| {
            let inside = x >= bx.0 && x < bx.0 + bx.2 && y >= bx.1 && y < bx.1 + bx.3;
            if inside {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        }))
    }

    #[test]
    fn trim_keeps_padding_around_content() {
        let img = page_with_box(200, 200, (50, 60, 10, 20));
        let out = trim_whitespace(&img, TRIM_PADDING, TRIM_THRESHOLD);
        assert_eq!((out.width(), out.height()), (50, 60));
        assert_eq!(out.pixels().get_pixel(20, 20).0, [0, 0, 0, 255]);
    }

    #[test]
    fn trim_clamps_at_edges() {
        let img = page_with_box(100, 100, (0, 90, 5, 10));
        let out = trim_whitespace(&img, TRIM_PADDING, TRIM_THRESHOLD);
        assert_eq!((out.width(), out.height()), (25, 30));
    }

    #[test]
    fn near_white_counts_as_background() {
        let img = RasterImage::new(RgbaImage::from_pixel(30, 30, Rgba([251, 253, 255, 255])));
        let out = trim_whitespace(&img, TRIM_PADDING, TRIM_THRESHOLD);
        assert!(out.ptr_eq(&img));
    }

    #[test]
    fn small_crop_only_gets_padding() {
        let img = page_with_box(100, 50, (0, 0, 100, 50));
        let out = fit_for_chat(&img);
        assert_eq!((out.width(), out.height()), (110, 60));
        assert_eq!(out.pixels().get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(out.pixels().get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn large_crop_fits_chat_bounds() {
        let img = page_with_box(1190, 800, (0, 0, 1190, 800));
        let out = fit_for_chat(&img);
        assert_eq!(out.width(), 400);
        assert!(out.height() <= CHAT_MAX_HEIGHT);
        let tall = fit_for_chat(&page_with_box(300, 2000, (0, 0, 1, 1)));
        assert_eq!(tall.height(), 533);
        assert!(tall.width() <= CHAT_MAX_WIDTH);
    }
}

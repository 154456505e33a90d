//! Selection preview: the page as displayed, with the selection highlighted.
//!
//! Outside the selection is darkened, the selection gets a dashed accent
//! border with square corner handles, and a label under it shows the size the
//! crop will have in native pixels.

use crate::card::canvas::{Canvas2D, CardFont, Color, RectF, RgbaCanvas};
use crate::error::CardMakerError;
use crate::pipeline::selection::{DisplayTransform, SelectionRect};
use crate::raster::RasterImage;
use image::imageops::FilterType;

const SHADE: Color = Color::BLACK.with_alpha(128);
const ACCENT: Color = Color::hex(0x3B82F6);
const BORDER_W: f32 = 3.0;
const DASH: f32 = 8.0;
const DASH_GAP: f32 = 4.0;
const HANDLE: f32 = 12.0;
const LABEL_SIZE: f32 = 14.0;
/// Rects this small are not highlighted.
const MIN_VISIBLE: f64 = 5.0;

/// Resample `image` to the display size of `transform`.
pub fn display_image(image: &RasterImage, transform: &DisplayTransform) -> Result<RasterImage, CardMakerError> {
    if !transform.is_laid_out() {
        return Err(CardMakerError::InvalidCrop {
            reason: "image is not laid out".into(),
        });
    }
    let w = transform.display_width.round().max(1.0) as u32;
    let h = transform.display_height.round().max(1.0) as u32;
    if (w, h) == (image.width(), image.height()) {
        return Ok(image.clone());
    }
    Ok(RasterImage::new(image::imageops::resize(
        image.pixels(),
        w,
        h,
        FilterType::Triangle,
    )))
}

/// Draw the selection overlay onto a copy of `display`.
///
/// `native_size` is the label text source; pass `None` to omit the label.
pub fn render_selection_overlay(
    display: &RasterImage,
    rect: &SelectionRect,
    native_size: Option<(u32, u32)>,
    font: CardFont,
) -> RasterImage {
    if !(rect.w > MIN_VISIBLE && rect.h > MIN_VISIBLE) {
        return display.clone();
    }
    let mut canvas = RgbaCanvas::from_image(display, font);
    let (cw, ch) = (display.width() as f32, display.height() as f32);
    let r = RectF::new(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32);

    // Shade the four bands around the selection.
    canvas.fill_rect(RectF::new(0.0, 0.0, cw, r.y), SHADE.into());
    canvas.fill_rect(RectF::new(0.0, r.y, r.x, r.h), SHADE.into());
    canvas.fill_rect(RectF::new(r.right(), r.y, cw - r.right(), r.h), SHADE.into());
    canvas.fill_rect(RectF::new(0.0, r.bottom(), cw, ch - r.bottom()), SHADE.into());

    draw_dashed_border(&mut canvas, r);

    for (cx, cy) in [(r.x, r.y), (r.right(), r.y), (r.x, r.bottom()), (r.right(), r.bottom())] {
        canvas.fill_rect(
            RectF::new(cx - HANDLE / 2.0, cy - HANDLE / 2.0, HANDLE, HANDLE),
            ACCENT.into(),
        );
    }

    if let Some((nw, nh)) = native_size {
        let text = format!("{nw} × {nh}px");
        let tw = canvas.measure_text(&text, LABEL_SIZE);
        let lx = r.x + r.w / 2.0 - tw / 2.0 - 10.0;
        let ly = r.bottom() + 10.0;
        canvas.fill_rect(RectF::new(lx - 6.0, ly, tw + 20.0, 26.0), ACCENT.into());
        canvas.fill_text(&text, lx + 4.0, ly + 18.0, LABEL_SIZE, Color::WHITE);
    }

    canvas.into_image()
}

/// Stroke `r` with 8-on/4-off dashes, centred on the edge.
fn draw_dashed_border(canvas: &mut impl Canvas2D, r: RectF) {
    let half = BORDER_W / 2.0;
    let dashes = |len: f32| {
        let mut out = Vec::new();
        let mut s = 0.0;
        while s < len {
            out.push((s, DASH.min(len - s)));
            s += DASH + DASH_GAP;
        }
        out
    };
    for (s, l) in dashes(r.w) {
        canvas.fill_rect(RectF::new(r.x + s, r.y - half, l, BORDER_W), ACCENT.into());
        canvas.fill_rect(RectF::new(r.x + s, r.bottom() - half, l, BORDER_W), ACCENT.into());
    }
    for (s, l) in dashes(r.h) {
        canvas.fill_rect(RectF::new(r.x - half, r.y + s, BORDER_W, l), ACCENT.into());
        canvas.fill_rect(RectF::new(r.right() - half, r.y + s, BORDER_W, l), ACCENT.into());
    }
}

//! Minimal 2D drawing surface used by the card composer and the selection
//! overlay.
//!
//! [`Canvas2D`] is the capability the composer draws through; [`RgbaCanvas`]
//! implements it on an RGBA buffer. Shapes are rasterised from a signed
//! distance to a rounded rectangle, which gives anti-aliased edges and
//! rounded corners from one routine. Text goes through `imageproc` with an
//! `ab_glyph` font and is clipped like any shape.
//!
//! All arithmetic is deterministic, so drawing the same operations twice
//! yields byte-identical buffers.

use crate::error::CardMakerError;
use crate::raster::RasterImage;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// ── Primitives ───────────────────────────────────────────────────────────────

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `0xRRGGBB`.
    pub const fn hex(v: u32) -> Self {
        Self::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    fn lerp(self, other: Color, t: f32) -> Color {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

/// Rectangle in canvas pixels. Edges may be fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

/// Fill style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// Linear gradient from `from` at `(x0, y0)` to `to` at `(x1, y1)`.
    LinearGradient {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        from: Color,
        to: Color,
    },
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::Solid(c)
    }
}

impl Paint {
    fn color_at(&self, px: f32, py: f32) -> Color {
        match *self {
            Paint::Solid(c) => c,
            Paint::LinearGradient {
                x0,
                y0,
                x1,
                y1,
                from,
                to,
            } => {
                let (dx, dy) = (x1 - x0, y1 - y0);
                let len2 = dx * dx + dy * dy;
                if len2 <= f32::EPSILON {
                    return from;
                }
                let t = (((px - x0) * dx + (py - y0) * dy) / len2).clamp(0.0, 1.0);
                from.lerp(to, t)
            }
        }
    }
}

// ── Capability ───────────────────────────────────────────────────────────────

/// Drawing operations the composer needs. Coordinates are in canvas pixels;
/// text is positioned by its baseline.
pub trait Canvas2D {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn fill_rect(&mut self, rect: RectF, paint: Paint);
    fn fill_round_rect(&mut self, rect: RectF, radius: f32, paint: Paint);
    fn stroke_round_rect(&mut self, rect: RectF, radius: f32, color: Color, line_width: f32);

    /// Draw `src` scaled into `dst`, optionally clipped to a rounded rect of
    /// the same bounds.
    fn draw_image(
        &mut self,
        src: &RasterImage,
        dst: RectF,
        clip_radius: Option<f32>,
    ) -> Result<(), CardMakerError>;

    /// Advance width of `text` at `size` px.
    fn measure_text(&self, text: &str, size: f32) -> f32;
    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, size: f32, color: Color);

    /// Restrict subsequent drawing to a rounded rect until [`pop_clip`].
    ///
    /// [`pop_clip`]: Canvas2D::pop_clip
    fn push_clip(&mut self, rect: RectF, radius: f32);
    fn pop_clip(&mut self);
}

// ── Fonts ────────────────────────────────────────────────────────────────────

/// Hangul-capable fonts commonly present on Linux, macOS and Windows.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf",
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\malgunbd.ttf",
    "C:\\Windows\\Fonts\\malgun.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

static SYSTEM_FONT: Lazy<Option<Arc<FontVec>>> = Lazy::new(|| {
    let found = SYSTEM_FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .filter(|p| p.exists())
        .find_map(|p| load_font_file(p).ok());
    if found.is_none() {
        warn!("No system font found; card text will be laid out but not drawn");
    }
    found.map(Arc::new)
});

fn load_font_file(path: &Path) -> Result<FontVec, CardMakerError> {
    let bytes = std::fs::read(path).map_err(|e| {
        CardMakerError::InvalidConfig(format!("cannot read font {}: {}", path.display(), e))
    })?;
    let font = FontVec::try_from_vec_and_index(bytes, 0).map_err(|e| {
        CardMakerError::InvalidConfig(format!("invalid font {}: {}", path.display(), e))
    })?;
    debug!("Loaded font {}", path.display());
    Ok(font)
}

/// Font used for text, or a width estimate when none is available.
#[derive(Clone, Default)]
pub struct CardFont {
    font: Option<Arc<FontVec>>,
}

impl std::fmt::Debug for CardFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardFont")
            .field("loaded", &self.font.is_some())
            .finish()
    }
}

impl CardFont {
    /// Load `path`, or fall back to the first system font found.
    ///
    /// An explicit path that cannot be loaded is an error; a missing system
    /// font is not.
    pub fn resolve(path: Option<&PathBuf>) -> Result<Self, CardMakerError> {
        match path {
            Some(p) => Ok(Self {
                font: Some(Arc::new(load_font_file(p)?)),
            }),
            None => Ok(Self {
                font: SYSTEM_FONT.clone(),
            }),
        }
    }

    /// No font: text is measured by estimate and not drawn.
    pub fn none() -> Self {
        Self { font: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.font.is_some()
    }

    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let Some(font) = &self.font else {
            return estimate_width(text, size);
        };
        let scaled = font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut last = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = last {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            last = Some(id);
        }
        width
    }

    fn ascent(&self, size: f32) -> f32 {
        match &self.font {
            Some(font) => font.as_scaled(PxScale::from(size)).ascent(),
            None => size * 0.8,
        }
    }
}

/// Rough advance: full-width for Hangul/CJK/emoji, ~0.55em otherwise.
fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars()
        .map(|c| if (c as u32) >= 0x1100 { size } else { size * 0.55 })
        .sum()
}

// ── RGBA implementation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Clip {
    rect: RectF,
    radius: f32,
}

/// [`Canvas2D`] over an in-memory RGBA buffer, initially transparent.
pub struct RgbaCanvas {
    buf: RgbaImage,
    clips: Vec<Clip>,
    font: CardFont,
}

impl RgbaCanvas {
    pub fn new(width: u32, height: u32, font: CardFont) -> Self {
        Self {
            buf: RgbaImage::new(width, height),
            clips: Vec::new(),
            font,
        }
    }

    /// Canvas starting from a copy of `image`.
    pub fn from_image(image: &RasterImage, font: CardFont) -> Self {
        Self {
            buf: image.pixels().clone(),
            clips: Vec::new(),
            font,
        }
    }

    pub fn into_image(self) -> RasterImage {
        RasterImage::new(self.buf)
    }

    fn clip_coverage(&self, px: f32, py: f32) -> f32 {
        self.clips
            .iter()
            .map(|c| coverage(round_rect_sdf(px, py, c.rect, c.radius)))
            .fold(1.0, f32::min)
    }

    /// Visit every pixel whose centre may be touched by `rect` grown by
    /// `margin`, with the pixel-centre coordinates.
    fn for_each_pixel_in(&mut self, rect: RectF, margin: f32, mut f: impl FnMut(&mut Self, u32, u32, f32, f32)) {
        let x0 = (rect.x - margin).floor().max(0.0) as u32;
        let y0 = (rect.y - margin).floor().max(0.0) as u32;
        let x1 = ((rect.right() + margin).ceil().max(0.0) as u32).min(self.buf.width());
        let y1 = ((rect.bottom() + margin).ceil().max(0.0) as u32).min(self.buf.height());
        for y in y0..y1 {
            for x in x0..x1 {
                f(self, x, y, x as f32 + 0.5, y as f32 + 0.5);
            }
        }
    }

    fn blend_at(&mut self, x: u32, y: u32, color: Color, cov: f32) {
        let cov = cov * self.clip_coverage(x as f32 + 0.5, y as f32 + 0.5);
        blend(self.buf.get_pixel_mut(x, y), color, cov);
    }

    /// Paint `color` through the alpha channel of `layer` placed at `(ox, oy)`.
    fn blend_coverage(&mut self, layer: &RgbaImage, ox: i64, oy: i64, color: Color) {
        let (w, h) = (self.buf.width() as i64, self.buf.height() as i64);
        for (lx, ly, p) in layer.enumerate_pixels() {
            let (x, y) = (ox + lx as i64, oy + ly as i64);
            if p.0[3] == 0 || x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            self.blend_at(x as u32, y as u32, color, p.0[3] as f32 / 255.0);
        }
    }

    fn fill_shape(&mut self, rect: RectF, radius: f32, paint: Paint) {
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return;
        }
        self.for_each_pixel_in(rect, 1.0, |c, x, y, px, py| {
            let cov = coverage(round_rect_sdf(px, py, rect, radius));
            if cov > 0.0 {
                c.blend_at(x, y, paint.color_at(px, py), cov);
            }
        });
    }
}

impl Canvas2D for RgbaCanvas {
    fn width(&self) -> u32 {
        self.buf.width()
    }

    fn height(&self) -> u32 {
        self.buf.height()
    }

    fn fill_rect(&mut self, rect: RectF, paint: Paint) {
        self.fill_shape(rect, 0.0, paint);
    }

    fn fill_round_rect(&mut self, rect: RectF, radius: f32, paint: Paint) {
        self.fill_shape(rect, radius, paint);
    }

    fn stroke_round_rect(&mut self, rect: RectF, radius: f32, color: Color, line_width: f32) {
        let half = line_width / 2.0;
        self.for_each_pixel_in(rect, half + 1.0, |c, x, y, px, py| {
            let d = round_rect_sdf(px, py, rect, radius).abs();
            let cov = (half + 0.5 - d).clamp(0.0, 1.0);
            if cov > 0.0 {
                c.blend_at(x, y, color, cov);
            }
        });
    }

    fn draw_image(
        &mut self,
        src: &RasterImage,
        dst: RectF,
        clip_radius: Option<f32>,
    ) -> Result<(), CardMakerError> {
        let w = dst.w.round();
        let h = dst.h.round();
        if src.width() == 0 || src.height() == 0 || w < 1.0 || h < 1.0 {
            return Err(CardMakerError::CardRender {
                detail: format!("cannot draw {:?} into {}x{}", src, w, h),
            });
        }
        let (w, h) = (w as u32, h as u32);
        let scaled;
        let pixels = if (w, h) == (src.width(), src.height()) {
            src.pixels()
        } else {
            scaled = image::imageops::resize(src.pixels(), w, h, FilterType::CatmullRom);
            &scaled
        };

        let ox = dst.x.round() as i64;
        let oy = dst.y.round() as i64;
        let bounds = RectF::new(ox as f32, oy as f32, w as f32, h as f32);
        for (sx, sy, p) in pixels.enumerate_pixels() {
            let (x, y) = (ox + sx as i64, oy + sy as i64);
            if x < 0 || y < 0 || x >= self.buf.width() as i64 || y >= self.buf.height() as i64 {
                continue;
            }
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let cov = match clip_radius {
                Some(r) => coverage(round_rect_sdf(px, py, bounds, r)),
                None => 1.0,
            };
            if cov > 0.0 {
                let [r, g, b, a] = p.0;
                self.blend_at(x as u32, y as u32, Color::rgba(r, g, b, a), cov);
            }
        }
        Ok(())
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        self.font.measure(text, size)
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, size: f32, color: Color) {
        let Some(font) = self.font.font.clone() else {
            return;
        };
        // Glyphs go to a coverage layer first so the clip stack applies to
        // text like to every other primitive.
        let pad = size.ceil() as u32;
        let layer_w = self.font.measure(text, size).ceil() as u32 + 2 * pad;
        let layer_h = (size * 1.5).ceil() as u32 + 2 * pad;
        let mut layer = RgbaImage::new(layer_w, layer_h);
        draw_text_mut(
            &mut layer,
            Rgba([255, 255, 255, 255]),
            pad as i32,
            pad as i32,
            PxScale::from(size),
            &*font,
            text,
        );

        let ox = x.round() as i64 - pad as i64;
        let oy = (baseline - self.font.ascent(size)).round() as i64 - pad as i64;
        self.blend_coverage(&layer, ox, oy, color);
    }

    fn push_clip(&mut self, rect: RectF, radius: f32) {
        self.clips.push(Clip { rect, radius });
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
    }
}

/// Signed distance from `(px, py)` to a rounded rect; negative inside.
fn round_rect_sdf(px: f32, py: f32, rect: RectF, radius: f32) -> f32 {
    let hx = rect.w / 2.0;
    let hy = rect.h / 2.0;
    let r = radius.clamp(0.0, hx.min(hy));
    let qx = (px - (rect.x + hx)).abs() - (hx - r);
    let qy = (py - (rect.y + hy)).abs() - (hy - r);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - r
}

fn coverage(sdf: f32) -> f32 {
    (0.5 - sdf).clamp(0.0, 1.0)
}

/// Source-over with straight alpha.
fn blend(dst: &mut Rgba<u8>, src: Color, cov: f32) {
    let sa = src.a as f32 / 255.0 * cov;
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let oa = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / oa).round() as u8;
    dst.0 = [
        mix(src.r, dst.0[0]),
        mix(src.g, dst.0[1]),
        mix(src.b, dst.0[2]),
        (oa * 255.0).round() as u8,
    ];
}

#[cfg(test)]
pub(crate) mod recording {
    //! A canvas that records operations instead of drawing them.

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        FillRect(RectF, Paint),
        FillRoundRect(RectF, f32, Paint),
        StrokeRoundRect(RectF, f32, Color, f32),
        DrawImage(RectF, Option<f32>),
        Text(String, f32, f32, f32, Color),
        PushClip(RectF, f32),
        PopClip,
    }

    /// Measures every character as `size * 0.5`.
    pub struct RecordingCanvas {
        pub width: u32,
        pub height: u32,
        pub ops: Vec<Op>,
    }

    impl RecordingCanvas {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ops: vec![],
            }
        }

        pub fn texts(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text(t, ..) => Some(t.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas2D for RecordingCanvas {
        fn width(&self) -> u32 {
            self.width
        }
        fn height(&self) -> u32 {
            self.height
        }
        fn fill_rect(&mut self, rect: RectF, paint: Paint) {
            self.ops.push(Op::FillRect(rect, paint));
        }
        fn fill_round_rect(&mut self, rect: RectF, radius: f32, paint: Paint) {
            self.ops.push(Op::FillRoundRect(rect, radius, paint));
        }
        fn stroke_round_rect(&mut self, rect: RectF, radius: f32, color: Color, lw: f32) {
            self.ops.push(Op::StrokeRoundRect(rect, radius, color, lw));
        }
        fn draw_image(
            &mut self,
            _src: &RasterImage,
            dst: RectF,
            clip_radius: Option<f32>,
        ) -> Result<(), CardMakerError> {
            self.ops.push(Op::DrawImage(dst, clip_radius));
            Ok(())
        }
        fn measure_text(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * size * 0.5
        }
        fn fill_text(&mut self, text: &str, x: f32, baseline: f32, size: f32, color: Color) {
            self.ops.push(Op::Text(text.to_string(), x, baseline, size, color));
        }
        fn push_clip(&mut self, rect: RectF, radius: f32) {
            self.ops.push(Op::PushClip(rect, radius));
        }
        fn pop_clip(&mut self) {
            self.ops.push(Op::PopClip);
        }
    }
}

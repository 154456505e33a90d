//! Fixed card geometry.
//!
//! ```text
//!  ┌──────────────────────── 720 ────────────────────────┐
//!  │ header (gradient, title, badge, subtitle)        82 │
//!  ├─────────────────────────────────────────────────────┤
//!  │ 20 ┌ image, 672 wide, height by aspect ┐         20 │
//!  ├─────────────────────────────────────────────────────┤ 1 divider
//!  │ #tag  #tag  #tag                                 56 │
//!  │ ( hint prompt )                                  50 │
//!  │            source attribution (centred)          40 │
//!  └─────────────────────────────────────────────────────┘
//! ```
//!
//! Only the image panel height depends on input; everything else is
//! constant.

use crate::card::canvas::RectF;
use crate::error::CardMakerError;

pub const CARD_W: u32 = 720;
pub const PAD: f32 = 24.0;
pub const INNER_W: f32 = CARD_W as f32 - 2.0 * PAD;

pub const HEADER_H: u32 = 82;
pub const IMG_PADDING: u32 = 20;
pub const DIVIDER_H: u32 = 1;
pub const TAG_SECTION_H: u32 = 56;
pub const HINT_SECTION_H: u32 = 50;
pub const SOURCE_SECTION_H: u32 = 40;

pub const CARD_RADIUS: f32 = 20.0;
pub const IMAGE_RADIUS: f32 = 12.0;

pub const TITLE_SIZE: f32 = 18.0;
pub const SUBTITLE_SIZE: f32 = 13.0;
pub const BADGE_SIZE: f32 = 12.0;
pub const BADGE_H: f32 = 24.0;
/// Horizontal padding added to measured badge/tag text (11 px each side).
pub const LABEL_PAD: f32 = 22.0;

pub const TAG_SIZE: f32 = 12.0;
pub const TAG_H: f32 = 26.0;
pub const TAG_GAP: f32 = 8.0;
pub const TAG_TOP: f32 = 15.0;

pub const HINT_SIZE: f32 = 12.0;
pub const SOURCE_SIZE: f32 = 11.0;

/// Vertical placement of every section for one input image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardLayout {
    /// Height the problem image is drawn at.
    pub image_height: u32,
    pub header: RectF,
    pub image_section: RectF,
    /// Where the problem image itself goes.
    pub image: RectF,
    pub divider: RectF,
    pub tags: RectF,
    pub hint: RectF,
    pub source: RectF,
    pub total_height: u32,
}

impl CardLayout {
    /// Layout for a problem image of `width × height` native pixels.
    pub fn for_image(width: u32, height: u32) -> Result<Self, CardMakerError> {
        if width == 0 || height == 0 {
            return Err(CardMakerError::CardRender {
                detail: format!("problem image is empty ({width}x{height})"),
            });
        }
        let image_height = (height as f64 * INNER_W as f64 / width as f64).round();
        let fixed = HEADER_H
            + 2 * IMG_PADDING
            + DIVIDER_H
            + TAG_SECTION_H
            + HINT_SECTION_H
            + SOURCE_SECTION_H;
        // The card height is a u32 pixel count; there is no other limit on tall images.
        if image_height < 1.0 || image_height + fixed as f64 > u32::MAX as f64 {
            return Err(CardMakerError::CardRender {
                detail: format!("problem image aspect {width}x{height} cannot be laid out"),
            });
        }
        let image_height = image_height as u32;
        let image_section_h = 2 * IMG_PADDING + image_height;

        let w = CARD_W as f32;
        let mut y = 0u32;
        let mut band = |h: u32| {
            let r = RectF::new(0.0, y as f32, w, h as f32);
            y += h;
            r
        };
        let header = band(HEADER_H);
        let image_section = band(image_section_h);
        let divider = band(DIVIDER_H);
        let tags = band(TAG_SECTION_H);
        let hint = band(HINT_SECTION_H);
        let source = band(SOURCE_SECTION_H);

        Ok(Self {
            image_height,
            header,
            image_section,
            image: RectF::new(
                PAD,
                image_section.y + IMG_PADDING as f32,
                INNER_W,
                image_height as f32,
            ),
            divider,
            tags,
            hint,
            source,
            total_height: y,
        })
    }

    pub fn card_rect(&self) -> RectF {
        RectF::new(0.0, 0.0, CARD_W as f32, self.total_height as f32)
    }
}

/// Pack tag pills left to right from `x`, each as wide as its text plus
/// [`LABEL_PAD`], separated by [`TAG_GAP`].
pub fn pack_tags(widths: impl IntoIterator<Item = f32>, x: f32, y: f32) -> Vec<RectF> {
    let mut cursor = x;
    widths
        .into_iter()
        .map(|tw| {
            let r = RectF::new(cursor, y, tw + LABEL_PAD, TAG_H);
            cursor += r.w + TAG_GAP;
            r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sections_sum_with_image_panel() {
        let l = CardLayout::for_image(1344, 1000).unwrap();
        assert_eq!(l.image_height, 500);
        assert_eq!(l.total_height, 82 + 540 + 1 + 56 + 50 + 40);
        assert_eq!(l.image, RectF::new(24.0, 102.0, 672.0, 500.0));
        assert_eq!(l.source.bottom(), l.total_height as f32);
    }

    #[test]
    fn height_grows_with_aspect_ratio() {
        let mut last = 0;
        for h in [100, 300, 700, 1000, 2500, 4000] {
            let total = CardLayout::for_image(1000, h).unwrap().total_height;
            assert!(total > last, "{h}: {total} <= {last}");
            last = total;
        }
    }

    #[test]
    fn image_height_rounds_half_away_from_zero() {
        // 1 * 672 / 1344 = 0.5 → 1
        assert_eq!(CardLayout::for_image(1344, 1).unwrap().image_height, 1);
    }

    #[test]
    fn degenerate_images_are_render_errors() {
        assert!(matches!(
            CardLayout::for_image(0, 10),
            Err(CardMakerError::CardRender { .. })
        ));
        assert!(CardLayout::for_image(100_000, 1).is_err());
    }

    #[test]
    fn very_tall_images_are_laid_out() {
        // 10000 * 672 / 100 = 67200, far taller than a u16 could hold
        let l = CardLayout::for_image(100, 10_000).unwrap();
        assert_eq!(l.image_height, 67_200);
        assert_eq!(l.total_height, 82 + 67_240 + 1 + 56 + 50 + 40);

        // 6M * 672 = 4.032e9 still fits a u32 card; 7M * 672 does not
        assert_eq!(CardLayout::for_image(1, 6_000_000).unwrap().image_height, 4_032_000_000);
        assert!(matches!(
            CardLayout::for_image(1, 7_000_000),
            Err(CardMakerError::CardRender { .. })
        ));
    }

    #[test]
    fn tags_pack_with_gap() {
        let rects = pack_tags([30.0, 12.0, 50.0], PAD, 100.0);
        assert_eq!(rects[0], RectF::new(24.0, 100.0, 52.0, 26.0));
        assert_eq!(rects[1].x, 24.0 + 52.0 + 8.0);
        assert_eq!(rects[2].x, rects[1].right() + 8.0);
    }
}

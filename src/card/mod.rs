//! Card composition: problem image + metadata → fixed-layout card image.
//!
//! ## Why draw through a trait?
//!
//! [`draw_card`] only knows about [`Canvas2D`]. Production renders onto an
//! [`RgbaCanvas`]; tests record the operations instead and assert on the
//! layout (badge width, tag packing, centring) without comparing pixels.
//!
//! ## Regeneration
//!
//! A card is always drawn from scratch. Changing the image, any metadata
//! field or the theme means calling [`CardComposer::compose`] again; there is
//! no incremental update path.

pub mod canvas;
pub mod layout;
pub mod metadata;
pub mod theme;

use crate::config::PipelineConfig;
use crate::error::CardMakerError;
use crate::pipeline::encode::encode_png;
use crate::raster::RasterImage;
use canvas::{Canvas2D, CardFont, Color, Paint, RectF, RgbaCanvas};
use layout::*;
use metadata::{CardMetadata, HINT_TEXT};
use theme::Theme;
use tracing::{debug, info};

const IMAGE_PANEL_BG: Color = Color::hex(0xFAFBFC);
const IMAGE_BORDER: Color = Color::hex(0xE2E8F0);
const DIVIDER: Color = Color::hex(0xF1F5F9);
const HINT_BG: Color = Color::hex(0xF8FAFC);
const HINT_FG: Color = Color::hex(0x94A3B8);
const SOURCE_BG: Color = Color::hex(0xF8FAFC);
const SOURCE_FG: Color = Color::hex(0xA0AEC0);
const SUBTITLE_FG: Color = Color::WHITE.with_alpha(204);
const OUTER_BORDER: Color = Color::BLACK.with_alpha(15);

/// Renders cards. Holds the resolved font; cheap to clone.
#[derive(Debug, Clone)]
pub struct CardComposer {
    font: CardFont,
}

impl CardComposer {
    /// Composer using `config.font_path`, or a system font.
    pub fn new(config: &PipelineConfig) -> Result<Self, CardMakerError> {
        Ok(Self {
            font: CardFont::resolve(config.font_path.as_ref())?,
        })
    }

    pub fn with_font(font: CardFont) -> Self {
        Self { font }
    }

    /// Draw the card for `image` with `metadata` in `theme`.
    ///
    /// Width is always [`CARD_W`]; height follows the image aspect ratio.
    pub fn compose(
        &self,
        image: &RasterImage,
        metadata: &CardMetadata,
        theme: &Theme,
    ) -> Result<RasterImage, CardMakerError> {
        let layout = CardLayout::for_image(image.width(), image.height())?;
        let mut canvas = RgbaCanvas::new(CARD_W, layout.total_height, self.font.clone());
        draw_card(&mut canvas, &layout, image, metadata, theme)?;
        info!(
            "Composed card {}x{} (theme {}, problem {})",
            CARD_W, layout.total_height, theme.key, metadata.problem_number
        );
        Ok(canvas.into_image())
    }

    /// [`compose`](Self::compose) and encode as PNG.
    pub fn compose_png(
        &self,
        image: &RasterImage,
        metadata: &CardMetadata,
        theme: &Theme,
    ) -> Result<Vec<u8>, CardMakerError> {
        let card = self.compose(image, metadata, theme)?;
        encode_png(&card).map_err(|e| CardMakerError::CardRender {
            detail: e.to_string(),
        })
    }
}

/// Draw every section of the card onto `canvas`, top to bottom.
pub fn draw_card(
    canvas: &mut impl Canvas2D,
    layout: &CardLayout,
    image: &RasterImage,
    meta: &CardMetadata,
    theme: &Theme,
) -> Result<(), CardMakerError> {
    let card = layout.card_rect();
    let w = CARD_W as f32;

    canvas.push_clip(card, CARD_RADIUS);
    canvas.fill_rect(card, Color::WHITE.into());

    // ── Header ──
    let header = layout.header;
    canvas.fill_rect(
        header,
        Paint::LinearGradient {
            x0: 0.0,
            y0: header.y,
            x1: w,
            y1: header.bottom(),
            from: theme.gradient_start,
            to: theme.gradient_end,
        },
    );
    canvas.fill_text(&meta.title_text(), PAD, header.y + 34.0, TITLE_SIZE, Color::WHITE);

    let badge = meta.difficulty.label();
    let badge_w = canvas.measure_text(badge, BADGE_SIZE) + LABEL_PAD;
    let badge_x = w - PAD - badge_w;
    canvas.fill_round_rect(
        RectF::new(badge_x, header.y + 18.0, badge_w, BADGE_H),
        BADGE_H / 2.0,
        meta.difficulty.color().into(),
    );
    canvas.fill_text(badge, badge_x + 11.0, header.y + 34.0, BADGE_SIZE, Color::WHITE);
    canvas.fill_text(&meta.subtitle_text(), PAD, header.y + 62.0, SUBTITLE_SIZE, SUBTITLE_FG);

    // ── Problem image ──
    canvas.fill_rect(layout.image_section, IMAGE_PANEL_BG.into());
    canvas.fill_round_rect(layout.image, IMAGE_RADIUS, Color::WHITE.into());
    canvas.draw_image(image, layout.image, Some(IMAGE_RADIUS))?;
    canvas.stroke_round_rect(layout.image, IMAGE_RADIUS, IMAGE_BORDER, 1.0);

    // ── Divider ──
    canvas.fill_rect(layout.divider, DIVIDER.into());

    // ── Tags ──
    canvas.fill_rect(layout.tags, Color::WHITE.into());
    let texts = meta.tag_texts();
    let widths: Vec<f32> = texts.iter().map(|t| canvas.measure_text(t, TAG_SIZE)).collect();
    for (text, pill) in texts.iter().zip(pack_tags(widths, PAD, layout.tags.y + TAG_TOP)) {
        canvas.fill_round_rect(pill, TAG_H / 2.0, theme.tag_background.into());
        canvas.fill_text(text, pill.x + 11.0, pill.y + 17.0, TAG_SIZE, theme.tag_foreground);
    }

    // ── Hint ──
    let hint = layout.hint;
    canvas.fill_rect(hint, Color::WHITE.into());
    canvas.fill_round_rect(
        RectF::new(PAD, hint.y + 10.0, w - 2.0 * PAD, 30.0),
        8.0,
        HINT_BG.into(),
    );
    canvas.fill_text(HINT_TEXT, PAD + 12.0, hint.y + 30.0, HINT_SIZE, HINT_FG);

    // ── Source ──
    let source = layout.source;
    canvas.fill_rect(source, SOURCE_BG.into());
    let source_text = meta.source_text();
    let source_w = canvas.measure_text(&source_text, SOURCE_SIZE);
    canvas.fill_text(
        &source_text,
        (w - source_w) / 2.0,
        source.y + 24.0,
        SOURCE_SIZE,
        SOURCE_FG,
    );

    canvas.pop_clip();

    // Half-pixel inset so the 1 px stroke lands on whole pixels.
    canvas.stroke_round_rect(
        RectF::new(0.5, 0.5, w - 1.0, card.h - 1.0),
        CARD_RADIUS,
        OUTER_BORDER,
        1.0,
    );
    debug!("Card drawn: image panel {}px", layout.image_height);
    Ok(())
}

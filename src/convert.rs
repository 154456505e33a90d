//! Eager (whole-job) entry points.
//!
//! ## Why eager vs. interactive?
//!
//! A command-line run knows every selection up front: which pages, which
//! rectangles, which metadata. This module runs such a job start to finish
//! and returns the finished card. Use [`crate::session::Workbench`] instead
//! when selections arrive one pointer event at a time, or
//! [`crate::stream::rasterize_stream`] to show pages as they render.
//!
//! Selections are given in display space, the same space a person dragging
//! over the page would see: each page is shown through
//! [`DisplayTransform::fit`] bounded by `config.max_display_dim`.

use crate::card::metadata::{card_file_name, CardMetadata};
use crate::card::CardComposer;
use crate::config::{PageSelection, PipelineConfig};
use crate::error::CardMakerError;
use crate::pipeline::crop::{extract, CropResult};
use crate::pipeline::decoder::{decoder_for, DocumentDecoder, OpenDocument};
use crate::pipeline::encode::encode_png;
use crate::pipeline::input::{load_input, SourceDocument};
use crate::pipeline::merge::merge_crops;
use crate::pipeline::postprocess::{trim_whitespace, TRIM_PADDING, TRIM_THRESHOLD};
use crate::pipeline::render::{inspect_blocking, DocumentInfo, PageRasterizer};
use crate::pipeline::selection::{DisplayTransform, SelectionRect};
use crate::pipeline::thumbnail::{Thumbnail, ThumbnailGenerator};
use crate::raster::{Page, RasterImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

// ── Job description ──────────────────────────────────────────────────────

/// One display-space selection on a 1-indexed page, written
/// `page:x,y,w,h` (e.g. `3:40,120,600,380`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSpec {
    pub page: usize,
    pub rect: SelectionRect,
}

static CROP_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    let num = r"\s*(\d+(?:\.\d+)?)\s*";
    Regex::new(&format!(r"^\s*(\d+)\s*:{num},{num},{num},{num}$")).expect("valid regex")
});

impl FromStr for CropSpec {
    type Err = CardMakerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CROP_SPEC_RE
            .captures(s)
            .ok_or_else(|| CardMakerError::InvalidConfig(format!(
                "crop '{s}' must look like PAGE:X,Y,W,H"
            )))?;
        let page: usize = caps[1]
            .parse()
            .map_err(|_| CardMakerError::InvalidConfig(format!("bad page number in '{s}'")))?;
        if page == 0 {
            return Err(CardMakerError::InvalidConfig(format!(
                "crop '{s}': pages are numbered from 1"
            )));
        }
        let mut v = [0.0f64; 4];
        for (slot, i) in v.iter_mut().zip(2..) {
            *slot = caps[i]
                .parse()
                .map_err(|_| CardMakerError::InvalidConfig(format!("bad number in '{s}'")))?;
        }
        Ok(Self {
            page,
            rect: SelectionRect::new(v[0], v[1], v[2], v[3]),
        })
    }
}

impl fmt::Display for CropSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.rect;
        write!(f, "{}:{},{},{},{}", self.page, r.x, r.y, r.w, r.h)
    }
}

/// Everything needed to produce one card.
#[derive(Debug, Clone, Default)]
pub struct CardJob {
    /// Selections in confirmation order.
    pub crops: Vec<CropSpec>,
    pub metadata: CardMetadata,
    /// Trim white margins off the merged image before composing.
    pub trim: bool,
}

/// Result of a card job.
#[derive(Debug, Clone)]
pub struct CardOutput {
    pub card: RasterImage,
    pub merged: RasterImage,
    pub crops: Vec<CropResult>,
    /// Suggested download name, e.g. `수능_2025_1번_카드.png`.
    pub file_name: String,
    pub duration_ms: u64,
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Read page count and page sizes of a file without rendering.
pub async fn inspect(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<DocumentInfo, CardMakerError> {
    let source = load_input(input).await?;
    let decoder = decoder_for(&source, config)?;
    inspect_source(decoder, source).await
}

/// [`inspect`] for an already loaded document.
pub async fn inspect_source(
    decoder: Arc<dyn DocumentDecoder>,
    source: SourceDocument,
) -> Result<DocumentInfo, CardMakerError> {
    tokio::task::spawn_blocking(move || inspect_blocking(decoder.as_ref(), &source))
        .await
        .map_err(|e| CardMakerError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Render the pages selected by `config.pages` at `config.render_scale`.
pub async fn rasterize_document(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<Vec<Page>, CardMakerError> {
    let source = load_input(input).await?;
    let decoder = decoder_for(&source, config)?;
    PageRasterizer::new(decoder, config).rasterize(&source).await
}

/// Thumbnails of the pages selected by `config.pages`. Per-page failures
/// are reported inside the returned list.
pub async fn generate_thumbnails(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<Vec<Thumbnail>, CardMakerError> {
    let source = load_input(input).await?;
    let decoder = decoder_for(&source, config)?;
    ThumbnailGenerator::new(decoder, config).generate(&source).await
}

/// Run a card job against a file on disk.
pub async fn build_card(
    input: impl AsRef<Path>,
    job: &CardJob,
    config: &PipelineConfig,
) -> Result<CardOutput, CardMakerError> {
    let source = load_input(input).await?;
    let decoder = decoder_for(&source, config)?;
    build_card_from_source(decoder, &source, job, config).await
}

/// Run a card job against an already loaded document.
///
/// Only pages that some crop refers to are rendered.
pub async fn build_card_from_source(
    decoder: Arc<dyn DocumentDecoder>,
    source: &SourceDocument,
    job: &CardJob,
    config: &PipelineConfig,
) -> Result<CardOutput, CardMakerError> {
    let start = Instant::now();
    if job.crops.is_empty() {
        return Err(CardMakerError::InvalidCrop {
            reason: "no crops to compose".into(),
        });
    }
    info!("Building card from {} crop(s) of '{}'", job.crops.len(), source.name);

    // ── Step 1: Check page numbers, render referenced pages ──────────────
    let page_count = {
        let decoder = decoder.clone();
        let source = source.clone();
        tokio::task::spawn_blocking(move || {
            decoder
                .open(&source.name, &source.bytes)
                .map(|doc| doc.page_count())
        })
        .await
        .map_err(|e| CardMakerError::Internal(format!("Open task panicked: {}", e)))??
    };
    if let Some(spec) = job.crops.iter().find(|c| c.page > page_count) {
        return Err(CardMakerError::PageOutOfRange {
            page: spec.page,
            total: page_count,
        });
    }
    let wanted: Vec<usize> = job.crops.iter().map(|c| c.page).collect();
    let pages = PageRasterizer::new(decoder, config)
        .with_pages(PageSelection::Set(wanted))
        .rasterize(source)
        .await?;

    // ── Step 2: Cut crops in confirmation order ──────────────────────────
    let crops = job
        .crops
        .iter()
        .map(|spec| cut(&pages, page_count, spec, config))
        .collect::<Result<Vec<_>, _>>()?;

    // ── Step 3: Merge (and optionally trim) ──────────────────────────────
    let merged = merge_crops(&crops, config.merge_gap).ok_or_else(|| CardMakerError::Internal(
        "merge produced nothing from a non-empty crop list".into(),
    ))?;
    let merged = if job.trim {
        trim_whitespace(&merged, TRIM_PADDING, TRIM_THRESHOLD)
    } else {
        merged
    };

    // ── Step 4: Compose ──────────────────────────────────────────────────
    let composer = CardComposer::new(config)?;
    let metadata = job.metadata.clone();
    let image = merged.clone();
    let card = tokio::task::spawn_blocking(move || {
        composer.compose(&image, &metadata, &metadata.theme_key.theme())
    })
    .await
    .map_err(|e| CardMakerError::Internal(format!("Compose task panicked: {}", e)))??;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Card {}x{} composed in {}ms",
        card.width(),
        card.height(),
        duration_ms
    );

    Ok(CardOutput {
        card,
        merged,
        crops,
        file_name: card_file_name(&job.metadata),
        duration_ms,
    })
}

/// Run a card job and write the card PNG to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn build_card_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    job: &CardJob,
    config: &PipelineConfig,
) -> Result<CardOutput, CardMakerError> {
    let output = build_card(input, job, config).await?;
    write_png(output_path, &output.card).await?;
    Ok(output)
}

/// Synchronous wrapper around [`build_card`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_card_sync(
    input: impl AsRef<Path>,
    job: &CardJob,
    config: &PipelineConfig,
) -> Result<CardOutput, CardMakerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CardMakerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_card(input, job, config))
}

/// Encode `image` as PNG and write it atomically.
pub async fn write_png(path: impl AsRef<Path>, image: &RasterImage) -> Result<(), CardMakerError> {
    let bytes = encode_png(image)?;
    write_atomic(path.as_ref(), &bytes).await
}

/// Write `bytes` to a temp file next to `path`, then rename over it.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CardMakerError> {
    let fail = |e| CardMakerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Cut one selection from its rendered page.
fn cut(
    pages: &[Page],
    page_count: usize,
    spec: &CropSpec,
    config: &PipelineConfig,
) -> Result<CropResult, CardMakerError> {
    let page = pages
        .iter()
        .find(|p| p.index + 1 == spec.page)
        .ok_or_else(|| CardMakerError::PageOutOfRange {
            page: spec.page,
            total: page_count,
        })?;
    if !spec.rect.exceeds(config.min_selectable) {
        return Err(CardMakerError::InvalidCrop {
            reason: format!(
                "selection {} is below the {} px minimum",
                spec, config.min_selectable
            ),
        });
    }
    let max = config.max_display_dim;
    let transform = DisplayTransform::fit(page.image.width(), page.image.height(), max, max);
    let image = extract(&page.image, &transform, &spec.rect)?;
    debug!("Crop {} → {}x{}", spec, image.width(), image.height());
    Ok(CropResult {
        source_page_index: page.index,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::layout::CARD_W;
    use crate::pipeline::input::DocumentKind;
    use crate::pipeline::render::testing::FakeDecoder;

    fn fake_source() -> SourceDocument {
        SourceDocument {
            name: "exam.pdf".into(),
            kind: DocumentKind::Pdf,
            bytes: Arc::from(&b"%PDF-1.7"[..]),
        }
    }

    #[test]
    fn crop_spec_parses() {
        let spec: CropSpec = "3: 40, 120.5 ,600,380".parse().unwrap();
        assert_eq!(spec.page, 3);
        assert_eq!(spec.rect, SelectionRect::new(40.0, 120.5, 600.0, 380.0));
        assert_eq!(spec.to_string(), "3:40,120.5,600,380");
    }

    #[test]
    fn crop_spec_rejects_malformed() {
        for bad in ["", "3", "3:1,2,3", "0:1,2,3,4", "a:1,2,3,4", "1:1,2,3,-4"] {
            assert!(bad.parse::<CropSpec>().is_err(), "{bad:?} should not parse");
        }
    }

    #[tokio::test]
    async fn builds_card_from_two_pages() {
        let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
        let decoder: Arc<dyn DocumentDecoder> = Arc::new(FakeDecoder::uniform(3, 400.0, 300.0));
        let job = CardJob {
            crops: vec![
                "2:0,0,200,100".parse().unwrap(),
                "1:0,0,100,50".parse().unwrap(),
            ],
            ..CardJob::default()
        };
        let out = build_card_from_source(decoder, &fake_source(), &job, &config)
            .await
            .unwrap();
        let order: Vec<_> = out.crops.iter().map(|c| c.source_page_index).collect();
        assert_eq!(order, vec![1, 0]);
        assert_eq!((out.merged.width(), out.merged.height()), (200, 100 + 16 + 50));
        assert_eq!(out.card.width(), CARD_W);
        assert_eq!(out.file_name, "수능_2025_1번_카드.png");
    }

    #[tokio::test]
    async fn empty_job_is_refused() {
        let decoder: Arc<dyn DocumentDecoder> = Arc::new(FakeDecoder::uniform(1, 100.0, 100.0));
        let err = build_card_from_source(decoder, &fake_source(), &CardJob::default(), &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn tiny_selection_is_refused() {
        let decoder: Arc<dyn DocumentDecoder> = Arc::new(FakeDecoder::uniform(1, 100.0, 100.0));
        let job = CardJob {
            crops: vec!["1:10,10,5,5".parse().unwrap()],
            ..CardJob::default()
        };
        let err = build_card_from_source(decoder, &fake_source(), &job, &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CardMakerError::InvalidCrop { .. }));
    }

    #[tokio::test]
    async fn crop_on_missing_page_is_out_of_range() {
        let decoder: Arc<dyn DocumentDecoder> = Arc::new(FakeDecoder::uniform(2, 100.0, 100.0));
        let job = CardJob {
            crops: vec!["1:0,0,50,50".parse().unwrap(), "9:0,0,50,50".parse().unwrap()],
            ..CardJob::default()
        };
        let err = build_card_from_source(decoder, &fake_source(), &job, &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CardMakerError::PageOutOfRange { page: 9, total: 2 }));
        assert!(err.to_string().contains("2 pages"), "{err}");
    }

    #[tokio::test]
    async fn write_png_is_atomic_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/card.png");
        let img = RasterImage::new(image::RgbaImage::from_pixel(4, 3, image::Rgba([1, 2, 3, 255])));
        write_png(&path, &img).await.unwrap();
        assert!(!dir.path().join("nested/card.png.tmp").exists());
        let back = RasterImage::decode(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, img);
    }
}

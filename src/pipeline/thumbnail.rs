//! Thumbnail generation for quick page picking.
//!
//! Same traversal as [`PageRasterizer`] at a much smaller scale, but with the
//! opposite failure policy: a page that cannot be rendered or encoded becomes
//! a [`Thumbnail`] carrying a [`ThumbnailError`] ("load failed" marker) and
//! the remaining pages are still produced. Only a document that cannot be
//! opened at all is fatal.

use crate::config::PipelineConfig;
use crate::error::{CardMakerError, ThumbnailError};
use crate::pipeline::decoder::DocumentDecoder;
use crate::pipeline::encode::{data_url, encode_jpeg, THUMBNAIL_JPEG_QUALITY};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render::{label_for, resolve_indices, PageRasterizer};
use std::sync::Arc;
use tracing::{info, warn};

/// An encoded page preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailImage {
    pub width: u32,
    pub height: u32,
    /// JPEG bytes.
    pub jpeg: Vec<u8>,
}

impl ThumbnailImage {
    pub fn data_url(&self) -> String {
        data_url("image/jpeg", &self.jpeg)
    }
}

/// One entry per selected page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub index: usize,
    pub label: String,
    pub result: Result<ThumbnailImage, ThumbnailError>,
}

impl Thumbnail {
    pub fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

/// Renders low-resolution JPEG previews of every selected page.
#[derive(Clone)]
pub struct ThumbnailGenerator {
    rasterizer: PageRasterizer,
}

impl ThumbnailGenerator {
    /// Generator at `config.thumbnail_scale` over `config.pages`.
    pub fn new(decoder: Arc<dyn DocumentDecoder>, config: &PipelineConfig) -> Self {
        Self {
            rasterizer: PageRasterizer::new(decoder, config).with_scale(config.thumbnail_scale),
        }
    }

    pub async fn generate(&self, source: &SourceDocument) -> Result<Vec<Thumbnail>, CardMakerError> {
        let this = self.clone();
        let source = source.clone();
        tokio::task::spawn_blocking(move || this.generate_blocking(&source))
            .await
            .map_err(|e| CardMakerError::Internal(format!("Thumbnail task panicked: {}", e)))?
    }

    pub fn generate_blocking(&self, source: &SourceDocument) -> Result<Vec<Thumbnail>, CardMakerError> {
        let scale = self.rasterizer.scale();
        let document = self.rasterizer.decoder().open(&source.name, &source.bytes)?;
        let total_pages = document.page_count();
        let indices = resolve_indices(self.rasterizer.selection(), total_pages)?;

        let mut thumbnails = Vec::with_capacity(indices.len());
        for &idx in &indices {
            let result = document
                .render_page(idx, scale)
                .map_err(|e| ThumbnailError::RenderFailed {
                    page: idx,
                    detail: e.to_string(),
                })
                .and_then(|img| {
                    encode_jpeg(&img, THUMBNAIL_JPEG_QUALITY)
                        .map(|jpeg| ThumbnailImage {
                            width: img.width(),
                            height: img.height(),
                            jpeg,
                        })
                        .map_err(|e| ThumbnailError::EncodeFailed {
                            page: idx,
                            detail: e.to_string(),
                        })
                });

            if let Err(e) = &result {
                warn!("{}", e);
            }
            thumbnails.push(Thumbnail {
                index: idx,
                label: label_for(source, idx, total_pages),
                result,
            });
        }

        let failed = thumbnails.iter().filter(|t| t.is_failed()).count();
        info!(
            "Generated {} thumbnails for '{}' ({} failed)",
            thumbnails.len(),
            source.name,
            failed
        );
        Ok(thumbnails)
    }
}

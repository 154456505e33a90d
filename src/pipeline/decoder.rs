//! Document decoding capability.
//!
//! Rasterisation is written against [`DocumentDecoder`] rather than pdfium
//! directly, so a single raster image, a PDF, or an in-memory test document
//! all flow through the same page pipeline.
//!
//! ```text
//! DocumentDecoder::open(bytes) ──▶ OpenDocument
//!                                   ├─ page_count()
//!                                   ├─ page_size(i)        native units
//!                                   └─ render_page(i, s)   RasterImage
//! ```

use crate::config::PipelineConfig;
use crate::error::CardMakerError;
use crate::pipeline::input::{DocumentKind, SourceDocument};
use crate::pipeline::pdfium::PdfiumDecoder;
use crate::raster::{scaled_size, RasterImage};
use image::imageops::FilterType;
use std::sync::Arc;

/// Opens encoded documents. Implementations must be shareable with the
/// blocking render workers.
pub trait DocumentDecoder: Send + Sync {
    /// Parse `bytes`. `name` is only used for error messages.
    fn open<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
    ) -> Result<Box<dyn OpenDocument + 'a>, CardMakerError>;
}

/// A parsed document that can render its pages.
pub trait OpenDocument {
    fn page_count(&self) -> usize;

    /// Native page size at scale 1 (points for PDF, pixels for images).
    fn page_size(&self, index: usize) -> Result<(f32, f32), CardMakerError>;

    /// Render page `index` at `scale`. The result must be
    /// `round(native * scale)` in both dimensions.
    fn render_page(&self, index: usize, scale: f32) -> Result<RasterImage, CardMakerError>;
}

/// Decoder for a single PNG/JPEG: one page whose native size is its pixel size.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

struct ImageDocument {
    image: RasterImage,
}

impl DocumentDecoder for ImageDecoder {
    fn open<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
    ) -> Result<Box<dyn OpenDocument + 'a>, CardMakerError> {
        let image = RasterImage::decode(bytes).map_err(|e| CardMakerError::CorruptDocument {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Box::new(ImageDocument { image }))
    }
}

impl OpenDocument for ImageDocument {
    fn page_count(&self) -> usize {
        1
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), CardMakerError> {
        check_index(index, 1)?;
        Ok((self.image.width() as f32, self.image.height() as f32))
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RasterImage, CardMakerError> {
        check_index(index, 1)?;
        let (w, h) = scaled_size(self.image.width() as f32, self.image.height() as f32, scale)
            .map_err(|e| CardMakerError::Decode {
                page: index,
                detail: e.to_string(),
            })?;
        if w == self.image.width() && h == self.image.height() {
            return Ok(self.image.clone());
        }
        let resized = image::imageops::resize(self.image.pixels(), w, h, FilterType::Triangle);
        Ok(RasterImage::new(resized))
    }
}

pub(crate) fn check_index(index: usize, total: usize) -> Result<(), CardMakerError> {
    if index >= total {
        return Err(CardMakerError::PageOutOfRange {
            page: index + 1,
            total,
        });
    }
    Ok(())
}

/// Pick the decoder for a document kind. PDFs bind pdfium on demand.
pub fn decoder_for(
    source: &SourceDocument,
    config: &PipelineConfig,
) -> Result<Arc<dyn DocumentDecoder>, CardMakerError> {
    match source.kind {
        DocumentKind::Pdf => Ok(Arc::new(PdfiumDecoder::bind(
            config.pdfium_lib_path.as_deref(),
            config.password.clone(),
        )?)),
        DocumentKind::Png | DocumentKind::Jpeg => Ok(Arc::new(ImageDecoder)),
    }
}

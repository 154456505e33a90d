//! Page rasterisation: render selected pages to [`Page`]s via a
//! [`DocumentDecoder`].
//!
//! ## Why spawn_blocking?
//!
//! Decoding is CPU-bound and pdfium keeps thread-local state, so it must not
//! run on a Tokio worker thread. `tokio::task::spawn_blocking` moves the
//! work onto the blocking pool, keeping the async side responsive while a
//! 40-page exam renders.
//!
//! ## Failure policy
//!
//! Pages are the source data crops are cut from. A page that fails to render
//! aborts the whole operation with [`CardMakerError::Decode`] naming that
//! page; no partial page list is returned. Thumbnails use the opposite policy
//! (see [`crate::pipeline::thumbnail`]).

use crate::config::{PageSelection, PipelineConfig};
use crate::error::CardMakerError;
use crate::pipeline::decoder::DocumentDecoder;
use crate::pipeline::input::{DocumentKind, SourceDocument};
use crate::progress::ProgressCallback;
use crate::raster::{page_label, Page};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Structural facts about a document, gathered without rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub kind: DocumentKind,
    pub page_count: usize,
    /// Native `(width, height)` of each page at scale 1.
    pub page_sizes: Vec<(f32, f32)>,
}

/// Renders document pages at a fixed scale.
///
/// Cheap to clone; clones share the decoder.
#[derive(Clone)]
pub struct PageRasterizer {
    decoder: Arc<dyn DocumentDecoder>,
    scale: f32,
    pages: PageSelection,
    progress: Option<ProgressCallback>,
}

impl PageRasterizer {
    /// Rasteriser at `config.render_scale` over `config.pages`.
    pub fn new(decoder: Arc<dyn DocumentDecoder>, config: &PipelineConfig) -> Self {
        Self {
            decoder,
            scale: config.render_scale,
            pages: config.pages.clone(),
            progress: config.progress_callback.clone(),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub(crate) fn decoder(&self) -> &Arc<dyn DocumentDecoder> {
        &self.decoder
    }

    pub(crate) fn selection(&self) -> &PageSelection {
        &self.pages
    }

    /// Render every selected page, in document order.
    pub async fn rasterize(&self, source: &SourceDocument) -> Result<Vec<Page>, CardMakerError> {
        let this = self.clone();
        let source = source.clone();
        tokio::task::spawn_blocking(move || this.rasterize_blocking(&source))
            .await
            .map_err(|e| CardMakerError::Internal(format!("Render task panicked: {}", e)))?
    }

    /// Blocking form of [`PageRasterizer::rasterize`].
    pub fn rasterize_blocking(&self, source: &SourceDocument) -> Result<Vec<Page>, CardMakerError> {
        let mut pages = Vec::new();
        self.rasterize_each(source, |page| {
            pages.push(page);
            true
        })?;
        Ok(pages)
    }

    /// Render selected pages one by one, handing each to `sink` as soon as it
    /// is ready. Stops early when `sink` returns `false`.
    ///
    /// Returns the number of pages delivered.
    pub fn rasterize_each(
        &self,
        source: &SourceDocument,
        mut sink: impl FnMut(Page) -> bool,
    ) -> Result<usize, CardMakerError> {
        let document = self.decoder.open(&source.name, &source.bytes)?;
        let total_pages = document.page_count();
        let indices = resolve_indices(&self.pages, total_pages)?;
        let total = indices.len();
        info!(
            "Rasterising {} of {} pages of '{}' at scale {}",
            total, total_pages, source.name, self.scale
        );

        if let Some(cb) = &self.progress {
            cb.on_render_start(total);
        }

        let mut delivered = 0;
        for &idx in &indices {
            let image = match document.render_page(idx, self.scale) {
                Ok(image) => image,
                Err(e) => {
                    let err = into_decode_error(idx, e);
                    warn!("Aborting '{}': {}", source.name, err);
                    if let Some(cb) = &self.progress {
                        cb.on_page_failed(idx, total, &err.to_string());
                        cb.on_render_complete(total, delivered);
                    }
                    return Err(err);
                }
            };

            debug!(
                "Page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            if let Some(cb) = &self.progress {
                cb.on_page_rendered(idx, total, image.width(), image.height());
            }

            let label = label_for(source, idx, total_pages);
            delivered += 1;
            if !sink(Page { index: idx, image, label }) {
                debug!("Page consumer went away after {} pages", delivered);
                break;
            }
        }

        if let Some(cb) = &self.progress {
            cb.on_render_complete(total, delivered);
        }
        Ok(delivered)
    }
}

/// Read page count and page sizes without rendering.
pub fn inspect_blocking(
    decoder: &dyn DocumentDecoder,
    source: &SourceDocument,
) -> Result<DocumentInfo, CardMakerError> {
    let document = decoder.open(&source.name, &source.bytes)?;
    let page_count = document.page_count();
    let page_sizes = (0..page_count)
        .map(|i| document.page_size(i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DocumentInfo {
        name: source.name.clone(),
        kind: source.kind,
        page_count,
        page_sizes,
    })
}

/// Expand `selection` against a document, failing when nothing remains.
pub(crate) fn resolve_indices(
    selection: &PageSelection,
    total_pages: usize,
) -> Result<Vec<usize>, CardMakerError> {
    let indices = selection.to_indices(total_pages);
    if indices.is_empty() {
        let page = match selection {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().max().unwrap_or(1),
        };
        return Err(CardMakerError::PageOutOfRange {
            page,
            total: total_pages,
        });
    }
    Ok(indices)
}

/// A lone raster image is labelled with its file name; PDF pages by number.
pub(crate) fn label_for(source: &SourceDocument, index: usize, total_pages: usize) -> String {
    if !source.kind.is_pdf() && total_pages == 1 {
        source.name.clone()
    } else {
        page_label(index)
    }
}

/// Page failures always surface as `Decode` naming the page.
fn into_decode_error(index: usize, e: CardMakerError) -> CardMakerError {
    match e {
        CardMakerError::Decode { .. } => e,
        other => CardMakerError::Decode {
            page: index,
            detail: other.to_string(),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeDecoder;
    use super::*;
    use crate::progress::RenderProgressCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pdf_source() -> SourceDocument {
        SourceDocument::from_bytes("exam.pdf", b"%PDF-1.7\n".to_vec()).unwrap()
    }

    fn rasterizer(decoder: FakeDecoder, config: &PipelineConfig) -> PageRasterizer {
        PageRasterizer::new(Arc::new(decoder), config)
    }

    #[test]
    fn pages_are_rounded_native_times_scale_in_order() {
        let decoder = FakeDecoder {
            sizes: vec![(595.0, 842.0), (100.25, 50.0), (10.0, 10.0)],
            broken: vec![],
        };
        let r = rasterizer(decoder, &PipelineConfig::default());
        let pages = r.rasterize_blocking(&pdf_source()).unwrap();
        let dims: Vec<_> = pages
            .iter()
            .map(|p| (p.index, p.image.width(), p.image.height()))
            .collect();
        assert_eq!(dims, vec![(0, 1190, 1684), (1, 201, 100), (2, 20, 20)]);
        assert_eq!(pages[1].label, "페이지 2");
    }

    #[test]
    fn one_broken_page_aborts_with_its_index() {
        let decoder = FakeDecoder {
            sizes: vec![(10.0, 10.0); 4],
            broken: vec![2],
        };
        let r = rasterizer(decoder, &PipelineConfig::default());
        let err = r.rasterize_blocking(&pdf_source()).unwrap_err();
        assert!(matches!(err, CardMakerError::Decode { page: 2, .. }));
    }

    #[test]
    fn page_selection_limits_output() {
        let config = PipelineConfig::builder()
            .pages(PageSelection::Set(vec![3, 1]))
            .build()
            .unwrap();
        let r = rasterizer(FakeDecoder::uniform(5, 10.0, 10.0), &config);
        let idx: Vec<_> = r
            .rasterize_blocking(&pdf_source())
            .unwrap()
            .into_iter()
            .map(|p| p.index)
            .collect();
        assert_eq!(idx, vec![0, 2]);
    }

    #[test]
    fn empty_selection_is_out_of_range() {
        let r = rasterizer(FakeDecoder::uniform(2, 10.0, 10.0), &PipelineConfig::default())
            .with_pages(PageSelection::Single(7));
        let err = r.rasterize_blocking(&pdf_source()).unwrap_err();
        assert!(matches!(err, CardMakerError::PageOutOfRange { page: 7, total: 2 }));
    }

    #[test]
    fn sink_can_stop_early() {
        let r = rasterizer(FakeDecoder::uniform(5, 10.0, 10.0), &PipelineConfig::default());
        let mut seen = 0;
        let delivered = r
            .rasterize_each(&pdf_source(), |_| {
                seen += 1;
                seen < 2
            })
            .unwrap();
        assert_eq!(delivered, 2);
    }

    #[derive(Default)]
    struct Counts {
        rendered: AtomicUsize,
        failed: AtomicUsize,
        complete_success: AtomicUsize,
    }

    impl RenderProgressCallback for Counts {
        fn on_page_rendered(&self, _: usize, _: usize, _: u32, _: u32) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_failed(&self, _: usize, _: usize, _: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_render_complete(&self, _: usize, success: usize) {
            self.complete_success.store(success, Ordering::SeqCst);
        }
    }

    #[test]
    fn progress_reports_abort() {
        let counts = Arc::new(Counts::default());
        let config = PipelineConfig::builder()
            .progress_callback(counts.clone())
            .build()
            .unwrap();
        let decoder = FakeDecoder {
            sizes: vec![(10.0, 10.0); 3],
            broken: vec![1],
        };
        let _ = rasterizer(decoder, &config).rasterize_blocking(&pdf_source());
        assert_eq!(counts.rendered.load(Ordering::SeqCst), 1);
        assert_eq!(counts.failed.load(Ordering::SeqCst), 1);
        assert_eq!(counts.complete_success.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_rasterize_matches_blocking() {
        let r = rasterizer(FakeDecoder::uniform(2, 30.0, 40.0), &PipelineConfig::default());
        let pages = r.rasterize(&pdf_source()).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!((pages[0].image.width(), pages[0].image.height()), (60, 80));
    }

    #[test]
    fn inspect_reports_sizes() {
        let decoder = FakeDecoder {
            sizes: vec![(595.0, 842.0), (842.0, 595.0)],
            broken: vec![],
        };
        let info = inspect_blocking(&decoder, &pdf_source()).unwrap();
        assert_eq!(info.page_count, 2);
        assert_eq!(info.page_sizes[1], (842.0, 595.0));
        assert_eq!(info.kind, DocumentKind::Pdf);
    }
}

//! Streaming page rendering: emit pages as they are rasterised.
//!
//! ## Why stream?
//!
//! A 40-page exam at scale 2 takes a while to render. A stream lets the
//! caller show the first page (and let the user start selecting) while the
//! rest are still in flight, instead of waiting for the whole document.
//!
//! Pages arrive in document order. Rendering happens on a single blocking
//! worker that pushes into a bounded channel; the stream ends after the
//! first `Decode` error, which is yielded as its last item. Dropping the
//! stream stops the worker after the page it is currently rendering.

use crate::config::PipelineConfig;
use crate::error::CardMakerError;
use crate::pipeline::decoder::{decoder_for, DocumentDecoder};
use crate::pipeline::input::{load_input, SourceDocument};
use crate::pipeline::render::PageRasterizer;
use crate::raster::Page;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of rendered pages.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<Page, CardMakerError>> + Send>>;

/// Pages rendered ahead of the consumer.
const CHANNEL_DEPTH: usize = 2;

/// Render the pages selected by `config.pages`, streaming each as it is ready.
///
/// # Returns
/// - `Ok(PageStream)` — a stream of `Result<Page, CardMakerError>`
/// - `Err(CardMakerError)` — fatal error before any page (file not found,
///   unsupported input, pdfium not available)
pub async fn rasterize_stream(
    input: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PageStream, CardMakerError> {
    let source = load_input(input).await?;
    let decoder = decoder_for(&source, config)?;
    Ok(rasterize_source_stream(decoder, source, config))
}

/// [`rasterize_stream`] for an already loaded document.
///
/// Opening errors (corrupt file, wrong password) arrive as the first item.
pub fn rasterize_source_stream(
    decoder: Arc<dyn DocumentDecoder>,
    source: SourceDocument,
    config: &PipelineConfig,
) -> PageStream {
    let rasterizer = PageRasterizer::new(decoder, config);
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    info!("Streaming pages of '{}'", source.name);

    tokio::task::spawn_blocking(move || {
        let result = rasterizer.rasterize_each(&source, |page| tx.blocking_send(Ok(page)).is_ok());
        match result {
            Ok(n) => debug!("Page stream for '{}' finished after {} pages", source.name, n),
            Err(e) => {
                // Receiver may already be gone; nothing else to do then.
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::testing::FakeDecoder;
    use futures::StreamExt;

    fn source() -> SourceDocument {
        SourceDocument::from_bytes("exam.pdf", b"%PDF-1.7\n".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn yields_pages_in_order() {
        let config = PipelineConfig::builder().render_scale(1.0).build().unwrap();
        let stream = rasterize_source_stream(
            Arc::new(FakeDecoder::uniform(4, 30.0, 40.0)),
            source(),
            &config,
        );
        let pages: Vec<_> = stream.collect().await;
        let idx: Vec<_> = pages.into_iter().map(|p| p.unwrap().index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn ends_after_first_decode_error() {
        let decoder = FakeDecoder {
            sizes: vec![(30.0, 40.0); 5],
            broken: vec![2],
        };
        let stream = rasterize_source_stream(Arc::new(decoder), source(), &PipelineConfig::default());
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok() && items[1].is_ok());
        assert!(matches!(items[2], Err(CardMakerError::Decode { page: 2, .. })));
    }

    #[tokio::test]
    async fn dropping_the_stream_stops_rendering() {
        let mut stream = rasterize_source_stream(
            Arc::new(FakeDecoder::uniform(50, 10.0, 10.0)),
            source(),
            &PipelineConfig::default(),
        );
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.index, 0);
        drop(stream);
    }
}

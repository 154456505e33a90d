//! Progress-callback trait for per-page rendering events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events while pages or thumbnails are rasterised.
//!
//! # Example
//!
//! ```rust
//! use pdf2card::{PipelineConfig, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl RenderProgressCallback for Counter {
//!     fn on_page_rendered(&self, _page: usize, _total: usize, _w: u32, _h: u32) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the rasteriser and the thumbnail generator as pages are drawn.
///
/// Rendering runs on a blocking worker thread, so implementations must be
/// `Send + Sync`. All methods default to no-ops.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be rendered
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been rasterised.
    ///
    /// # Arguments
    /// * `page`  — 0-based page index
    /// * `total` — number of pages being rendered
    /// * `width`, `height` — pixel size of the produced image
    fn on_page_rendered(&self, page: usize, total: usize, width: u32, height: u32) {
        let _ = (page, total, width, height);
    }

    /// Called when a page fails. For full pages this is the last event
    /// before the operation aborts; for thumbnails rendering continues.
    fn on_page_failed(&self, page: usize, total: usize, error: &str) {
        let _ = (page, total, error);
    }

    /// Called once after all selected pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`   — pages attempted
    /// * `success_count` — pages rendered without error
    fn on_render_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        rendered: AtomicUsize,
        failed: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl RenderProgressCallback for TrackingCallback {
        fn on_render_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_rendered(&self, _page: usize, _total: usize, _w: u32, _h: u32) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_failed(&self, _page: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_render_complete(&self, _total_pages: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_render_start(3);
        cb.on_page_rendered(0, 3, 10, 10);
        cb.on_page_failed(1, 3, "broken");
        cb.on_render_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();

        cb.on_render_start(3);
        cb.on_page_rendered(0, 3, 100, 140);
        cb.on_page_rendered(1, 3, 100, 140);
        cb.on_page_failed(2, 3, "decode");
        cb.on_render_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.rendered.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failed.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }
}

//! Interactive workbench: the state behind a crop-and-compose session.
//!
//! [`Workbench`] owns every piece of interactive state as a plain field and
//! recomputes derived values explicitly:
//!
//! | change                      | consequence                               |
//! |-----------------------------|-------------------------------------------|
//! | pages added                 | selection cleared                         |
//! | pages replaced              | selection, crops and card dropped         |
//! | active page changed         | selection cleared, preview re-requested   |
//! | display resized             | selection rescaled                        |
//! | crop confirmed / removed    | merged image rebuilt from scratch         |
//! | merged image or metadata    | card marked stale                         |
//!
//! ## Latest wins
//!
//! Card composition and page previews run off the caller's thread. Each
//! request takes a [`Ticket`]; when a result comes back with a ticket that is
//! no longer the newest, it is dropped. A failed newest request records the
//! error and keeps the previous result.

use crate::card::metadata::CardMetadata;
use crate::card::CardComposer;
use crate::config::PipelineConfig;
use crate::error::CardMakerError;
use crate::pipeline::crop::{extract_selection, CropResult};
use crate::pipeline::merge::merge_crops;
use crate::pipeline::overlay::display_image;
use crate::pipeline::selection::{DisplayTransform, Point, SelectionTracker};
use crate::raster::{Page, RasterImage};
use tracing::{debug, info, warn};

// ── Tickets ──────────────────────────────────────────────────────────────────

/// Generation number of an asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result is now current.
    Applied,
    /// The request failed; the previous result is kept.
    Failed,
    /// A newer request was issued meanwhile; the result was dropped.
    Stale,
}

/// A value produced by the newest of possibly many overlapping requests.
#[derive(Debug, Clone)]
pub struct LatestWins<T> {
    issued: u64,
    value: Option<T>,
    error: Option<String>,
}

impl<T> Default for LatestWins<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            value: None,
            error: None,
        }
    }
}

impl<T> LatestWins<T> {
    /// Start a request; any request issued earlier becomes stale.
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }

    pub fn complete(&mut self, ticket: Ticket, result: Result<T, CardMakerError>) -> Completion {
        if !self.is_current(ticket) {
            debug!(
                "Discarding stale completion (generation {} < {})",
                ticket.0, self.issued
            );
            return Completion::Stale;
        }
        match result {
            Ok(v) => {
                self.value = Some(v);
                self.error = None;
                Completion::Applied
            }
            Err(e) => {
                warn!("Request {} failed: {}", ticket.0, e);
                self.error = Some(e.to_string());
                Completion::Failed
            }
        }
    }

    /// Drop the value and invalidate in-flight requests.
    pub fn reset(&mut self) {
        self.issued += 1;
        self.value = None;
        self.error = None;
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

/// Inputs for one card composition, detached from the workbench.
#[derive(Debug, Clone)]
pub struct CardRequest {
    pub ticket: Ticket,
    pub image: RasterImage,
    pub metadata: CardMetadata,
}

impl CardRequest {
    /// Run the composition (blocking).
    pub fn run(&self, composer: &CardComposer) -> Result<RasterImage, CardMakerError> {
        composer.compose(&self.image, &self.metadata, &self.metadata.theme_key.theme())
    }
}

/// Inputs for resampling the active page to its display size.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub ticket: Ticket,
    pub page: RasterImage,
    pub transform: DisplayTransform,
}

impl PreviewRequest {
    pub fn run(&self) -> Result<RasterImage, CardMakerError> {
        display_image(&self.page, &self.transform)
    }
}

// ── Workbench ────────────────────────────────────────────────────────────────

/// All state of an interactive session.
pub struct Workbench {
    config: PipelineConfig,
    composer: CardComposer,
    pages: Vec<Page>,
    active: Option<usize>,
    tracker: SelectionTracker,
    crops: Vec<CropResult>,
    merged: Option<RasterImage>,
    metadata: CardMetadata,
    card: LatestWins<RasterImage>,
    card_stale: bool,
    preview: LatestWins<RasterImage>,
}

impl Workbench {
    pub fn new(config: PipelineConfig) -> Result<Self, CardMakerError> {
        let composer = CardComposer::new(&config)?;
        Ok(Self::with_composer(config, composer))
    }

    pub fn with_composer(config: PipelineConfig, composer: CardComposer) -> Self {
        let tracker = SelectionTracker::new(config.min_selectable);
        Self {
            config,
            composer,
            pages: Vec::new(),
            active: None,
            tracker,
            crops: Vec::new(),
            merged: None,
            metadata: CardMetadata::default(),
            card: LatestWins::default(),
            card_stale: false,
            preview: LatestWins::default(),
        }
    }

    // ── Pages ──

    /// Append pages from another upload. Pages are renumbered by position so
    /// crops always name a page of this workbench.
    pub fn add_pages(&mut self, pages: impl IntoIterator<Item = Page>) {
        let start = self.pages.len();
        self.pages.extend(pages);
        for (pos, page) in self.pages.iter_mut().enumerate().skip(start) {
            page.index = pos;
        }
        info!("Workbench holds {} pages", self.pages.len());
        if self.active.is_none() && !self.pages.is_empty() {
            self.activate(0);
        } else {
            self.tracker.clear();
        }
    }

    /// Replace all pages. Crops and the card made from the old pages are
    /// dropped too, and card requests still in flight become stale.
    pub fn replace_pages(&mut self, pages: impl IntoIterator<Item = Page>) {
        self.pages.clear();
        self.active = None;
        self.preview.reset();
        self.crops.clear();
        self.rebuild_merged();
        self.card.reset();
        self.card_stale = false;
        self.add_pages(pages);
        if self.pages.is_empty() {
            self.tracker.set_source(None);
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.active.and_then(|i| self.pages.get(i))
    }

    /// Make page `position` active with a display size fitted to the
    /// configured maximum. Returns the preview request to run.
    pub fn select_page(&mut self, position: usize) -> Result<PreviewRequest, CardMakerError> {
        if position >= self.pages.len() {
            return Err(CardMakerError::PageOutOfRange {
                page: position + 1,
                total: self.pages.len(),
            });
        }
        self.activate(position);
        self.preview_request()
    }

    fn activate(&mut self, position: usize) {
        self.active = Some(position);
        let img = &self.pages[position].image;
        let max = self.config.max_display_dim;
        let transform = DisplayTransform::fit(img.width(), img.height(), max, max);
        self.tracker.set_source(Some(transform));
        debug!("Active page {} at display {:?}", position + 1, transform);
    }

    /// The host laid the active page out at a new size.
    pub fn resize_display(&mut self, width: f64, height: f64) -> Result<PreviewRequest, CardMakerError> {
        self.tracker.resize(width, height);
        self.preview_request()
    }

    fn preview_request(&mut self) -> Result<PreviewRequest, CardMakerError> {
        let page = self
            .active_page()
            .ok_or_else(|| CardMakerError::InvalidCrop {
                reason: "no page is active".into(),
            })?
            .image
            .clone();
        let transform = self.tracker.transform().ok_or_else(|| CardMakerError::InvalidCrop {
            reason: "no page is active".into(),
        })?;
        Ok(PreviewRequest {
            ticket: self.preview.issue(),
            page,
            transform,
        })
    }

    pub fn finish_preview(
        &mut self,
        ticket: Ticket,
        result: Result<RasterImage, CardMakerError>,
    ) -> Completion {
        self.preview.complete(ticket, result)
    }

    /// Display-size image of the active page, once a preview was applied.
    pub fn preview(&self) -> Option<&RasterImage> {
        self.preview.value()
    }

    // ── Selection ──

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn pointer_down(&mut self, p: Point) -> bool {
        self.tracker.pointer_down(p)
    }

    pub fn pointer_move(&mut self, p: Point) {
        self.tracker.pointer_move(p);
    }

    pub fn pointer_up(&mut self) {
        self.tracker.pointer_up();
    }

    pub fn pointer_leave(&mut self) {
        self.tracker.pointer_leave();
    }

    // ── Crops ──

    /// Cut the current selection from the active page and append it.
    pub fn confirm_crop(&mut self) -> Result<&CropResult, CardMakerError> {
        let page = self.active_page().ok_or_else(|| CardMakerError::InvalidCrop {
            reason: "no page is active".into(),
        })?;
        let crop = extract_selection(page, &self.tracker)?;
        info!(
            "Crop {} from page {}: {}x{}",
            self.crops.len() + 1,
            crop.source_page_index + 1,
            crop.image.width(),
            crop.image.height()
        );
        self.crops.push(crop);
        self.tracker.clear();
        self.rebuild_merged();
        Ok(&self.crops[self.crops.len() - 1])
    }

    pub fn remove_crop(&mut self, index: usize) -> Option<CropResult> {
        if index >= self.crops.len() {
            return None;
        }
        let removed = self.crops.remove(index);
        self.rebuild_merged();
        Some(removed)
    }

    pub fn clear_crops(&mut self) {
        self.crops.clear();
        self.rebuild_merged();
    }

    pub fn crops(&self) -> &[CropResult] {
        &self.crops
    }

    pub fn merged(&self) -> Option<&RasterImage> {
        self.merged.as_ref()
    }

    fn rebuild_merged(&mut self) {
        self.merged = merge_crops(&self.crops, self.config.merge_gap);
        self.card_stale = true;
    }

    // ── Card ──

    pub fn metadata(&self) -> &CardMetadata {
        &self.metadata
    }

    /// Replace the metadata record.
    pub fn set_metadata(&mut self, metadata: CardMetadata) {
        if metadata != self.metadata {
            self.metadata = metadata;
            self.card_stale = true;
        }
    }

    /// `true` when the shown card no longer matches the inputs.
    pub fn card_is_stale(&self) -> bool {
        self.card_stale
    }

    /// Snapshot the inputs for a new card. Fails when there is nothing to
    /// compose; any earlier in-flight request becomes stale.
    pub fn begin_card(&mut self) -> Result<CardRequest, CardMakerError> {
        let image = self.merged.clone().ok_or_else(|| CardMakerError::InvalidCrop {
            reason: "no crops to compose".into(),
        })?;
        let ticket = self.card.issue();
        self.card_stale = false;
        Ok(CardRequest {
            ticket,
            image,
            metadata: self.metadata.clone(),
        })
    }

    pub fn finish_card(
        &mut self,
        ticket: Ticket,
        result: Result<RasterImage, CardMakerError>,
    ) -> Completion {
        let outcome = self.card.complete(ticket, result);
        if outcome == Completion::Failed {
            self.card_stale = true;
        }
        outcome
    }

    /// Compose the card on the blocking pool and apply it if still current.
    pub async fn regenerate_card(&mut self) -> Result<Completion, CardMakerError> {
        let request = self.begin_card()?;
        let composer = self.composer.clone();
        let ticket = request.ticket;
        let result = tokio::task::spawn_blocking(move || request.run(&composer))
            .await
            .map_err(|e| CardMakerError::Internal(format!("Card task panicked: {}", e)))?;
        Ok(self.finish_card(ticket, result))
    }

    /// Last successfully composed card.
    pub fn card(&self) -> Option<&RasterImage> {
        self.card.value()
    }

    /// Message of the most recent card failure, cleared on success.
    pub fn card_error(&self) -> Option<&str> {
        self.card.error()
    }

    pub fn composer(&self) -> &CardComposer {
        &self.composer
    }
}

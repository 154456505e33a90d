//! # pdf2card
//!
//! Turn exam-paper PDFs into problem cards: cut a problem out of one or more
//! pages, stack the pieces, and frame the result in a styled, fixed-width
//! card image ready to post in a chat.
//!
//! ## Why this crate?
//!
//! Exam problems are typeset with formulae and figures that text extraction
//! mangles, and a single problem often runs across a page break. Working on
//! raster pages sidesteps both: a problem is whatever rectangle a person
//! drags over the page, cut at full render resolution, and a two-page
//! problem is just two crops stacked in the order they were confirmed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input      classify by magic bytes
//!  ├─ 2. Render     rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Select     pointer drags → display-space rectangle
//!  ├─ 4. Crop       display rect → native-resolution pixels
//!  ├─ 5. Merge      stack crops vertically, centred, 16 px apart
//!  └─ 6. Compose    header, image panel, tags, hint, source → 720 px card
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2card::{build_card, CardJob, CardMetadata, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let job = CardJob {
//!         crops: vec!["7:60,900,1100,700".parse()?, "8:60,80,1100,500".parse()?],
//!         metadata: CardMetadata { problem_number: 22, ..CardMetadata::default() },
//!         trim: false,
//!     };
//!     let out = build_card("exam.pdf", &job, &config).await?;
//!     pdf2card::write_png(&out.file_name, &out.card).await?;
//!     Ok(())
//! }
//! ```
//!
//! Interactive front ends drive a [`Workbench`] instead, feeding it pointer
//! events and applying card results through generation tickets.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2card` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2card = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! PDF input needs the pdfium shared library at runtime (system install,
//! `PDFIUM_LIB_PATH`, or [`PipelineConfig::pdfium_lib_path`]). PNG/JPEG
//! input does not. Card text needs a font with Hangul glyphs; without one
//! the card is still laid out, but text is left undrawn.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod card;
pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod raster;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use card::canvas::CardFont;
pub use card::metadata::{card_file_name, CardMetadata};
pub use card::theme::{Category, Difficulty, Theme, ThemeKey};
pub use card::CardComposer;
pub use config::{PageSelection, PipelineConfig, PipelineConfigBuilder};
pub use convert::{
    build_card, build_card_from_source, build_card_sync, build_card_to_file, generate_thumbnails,
    inspect, inspect_source, rasterize_document, write_atomic, write_png, CardJob, CardOutput,
    CropSpec,
};
pub use error::{CardMakerError, ThumbnailError};
pub use pipeline::crop::CropResult;
pub use pipeline::decoder::{DocumentDecoder, OpenDocument};
pub use pipeline::input::{DocumentKind, SourceDocument};
pub use pipeline::render::{DocumentInfo, PageRasterizer};
pub use pipeline::selection::{DisplayTransform, Point, SelectionRect, SelectionTracker};
pub use pipeline::thumbnail::{Thumbnail, ThumbnailGenerator};
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
pub use raster::{Page, RasterImage};
pub use session::{Completion, Ticket, Workbench};
pub use stream::{rasterize_source_stream, rasterize_stream, PageStream};

//! Pipeline stages for turning exam pages into problem images.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering backend can change without touching
//! the geometry.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ selection ──▶ crop ──▶ merge ──▶ card::compose
//! (sniff)   (decoder)  (display px)  (native)  (stack)
//!             └──▶ thumbnail (advisory, per-page failures tolerated)
//! ```
//!
//! 1. [`input`]     — read the file and classify it (PDF, PNG, JPEG)
//! 2. [`decoder`]   — the document-decoding capability; [`pdfium`] backs it
//!    for PDFs, a raster image is a one-page document
//! 3. [`render`]    — rasterise selected pages; runs in `spawn_blocking`
//! 4. [`thumbnail`] — small JPEG previews of every page
//! 5. [`selection`] — pointer drags → display-space rectangle
//! 6. [`crop`]      — display rectangle → native-resolution crop
//! 7. [`merge`]     — stack crops vertically in confirmation order
//! 8. [`postprocess`], [`overlay`], [`encode`] — optional cleanup, selection
//!    preview, and PNG/JPEG/data-URL output

pub mod crop;
pub mod decoder;
pub mod encode;
pub mod input;
pub mod merge;
pub mod overlay;
pub mod pdfium;
pub mod postprocess;
pub mod render;
pub mod selection;
pub mod thumbnail;

//! Error types for the pdf2card library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CardMakerError`] — **Fatal** for the operation that returned it: the
//!   document cannot be opened, a page failed to rasterise, a selection does
//!   not describe a usable crop, or the card could not be drawn.
//!
//! * [`ThumbnailError`] — **Non-fatal**: a single thumbnail failed to render.
//!   Stored inside [`crate::pipeline::thumbnail::Thumbnail`] so the remaining
//!   thumbnails are still shown.
//!
//! Page rasterisation and thumbnail generation deliberately use different
//! policies: pages are source data for crops, so one broken page aborts the
//! document; thumbnails are only a navigation aid, so a broken one becomes a
//! "load failed" marker.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2card library.
#[derive(Debug, Error)]
pub enum CardMakerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes are neither a PDF nor a supported raster image.
    #[error("Unsupported input '{name}': not a PDF or PNG/JPEG image (first bytes: {magic:?})")]
    UnsupportedInput { name: String, magic: Vec<u8> },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document header/trailer/xref is corrupt and cannot be parsed.
    #[error("Document '{name}' is corrupt: {detail}")]
    CorruptDocument { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("Document '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for document '{name}'")]
    WrongPassword { name: String },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// A page failed to rasterise. `page` is 0-based.
    #[error("Rasterisation failed for page {}: {detail}", page + 1)]
    Decode { page: usize, detail: String },

    // ── Crop / compose errors ─────────────────────────────────────────────
    /// The selection degenerates to a non-positive (or below-threshold) area.
    ///
    /// Recoverable: it only means "not a valid crop yet".
    #[error("Invalid crop: {reason}")]
    InvalidCrop { reason: String },

    /// Card composition failed. The previous card (if any) stays valid.
    #[error("Card rendering failed: {detail}")]
    CardRender { detail: String },

    /// Encoding an image to PNG/JPEG failed.
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF input needs the pdfium shared library at runtime. You can:\n\
  • Install libpdfium system-wide so it can be found by the dynamic loader.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n\
  • Pass --pdfium-lib /path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardMakerError {
    /// `true` for errors that only mean "the user has not finished selecting".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CardMakerError::InvalidCrop { .. })
    }
}

/// A non-fatal error for a single thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ThumbnailError {
    /// The page could not be rendered at thumbnail scale.
    #[error("Page {}: thumbnail failed: {detail}", page + 1)]
    RenderFailed { page: usize, detail: String },

    /// The thumbnail rendered but could not be encoded.
    #[error("Page {}: thumbnail encoding failed: {detail}", page + 1)]
    EncodeFailed { page: usize, detail: String },
}

impl ThumbnailError {
    /// 0-based index of the page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            ThumbnailError::RenderFailed { page, .. } | ThumbnailError::EncodeFailed { page, .. } => {
                *page
            }
        }
    }
}

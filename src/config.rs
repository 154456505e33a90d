//! Configuration types for the crop-and-compose pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Card layout constants are not configurable;
//! they live in [`crate::card::layout`] because the card format is fixed.

use crate::error::CardMakerError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for rasterising, selecting, cropping and merging.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2card::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .render_scale(3.0)
///     .merge_gap(24)
///     .build()
///     .unwrap();
/// assert_eq!(config.merge_gap, 24);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Scale factor applied to each page's native size when rasterising.
    /// Range: 0.5–8.0. Default: 2.0.
    ///
    /// Crops are cut from these rasters, so this is the resolution of the
    /// final problem image.
    pub render_scale: f32,

    /// Scale factor for page thumbnails. Range: 0.05–1.0. Default: 0.3.
    pub thumbnail_scale: f32,

    /// Minimum selection width/height in display pixels. Default: 20.
    ///
    /// A selection is confirmable only when both sides are strictly greater.
    pub min_selectable: f64,

    /// Vertical gap in pixels between stacked crops. Default: 16.
    pub merge_gap: u32,

    /// Largest display width/height used when the caller lets the pipeline
    /// choose a display size. Default: 2000.
    pub max_display_dim: u32,

    /// Page selection for rasterisation and thumbnails. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// TrueType/OpenType font used for card text. If None, common system
    /// font locations are searched.
    pub font_path: Option<PathBuf>,

    /// Explicit pdfium shared library (file or directory). If None,
    /// `PDFIUM_LIB_PATH` and then the system library are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional progress callback for page rendering events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            thumbnail_scale: 0.3,
            min_selectable: 20.0,
            merge_gap: 16,
            max_display_dim: 2000,
            pages: PageSelection::default(),
            password: None,
            font_path: None,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("render_scale", &self.render_scale)
            .field("thumbnail_scale", &self.thumbnail_scale)
            .field("min_selectable", &self.min_selectable)
            .field("merge_gap", &self.merge_gap)
            .field("max_display_dim", &self.max_display_dim)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("font_path", &self.font_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 8.0);
        self
    }

    pub fn thumbnail_scale(mut self, scale: f32) -> Self {
        self.config.thumbnail_scale = scale.clamp(0.05, 1.0);
        self
    }

    pub fn min_selectable(mut self, px: f64) -> Self {
        self.config.min_selectable = px.max(0.0);
        self
    }

    pub fn merge_gap(mut self, px: u32) -> Self {
        self.config.merge_gap = px;
        self
    }

    pub fn max_display_dim(mut self, px: u32) -> Self {
        self.config.max_display_dim = px.max(100);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, CardMakerError> {
        let c = &self.config;
        if !(c.render_scale.is_finite() && c.render_scale > 0.0) {
            return Err(CardMakerError::InvalidConfig(format!(
                "render scale must be positive, got {}",
                c.render_scale
            )));
        }
        if c.thumbnail_scale >= c.render_scale {
            return Err(CardMakerError::InvalidConfig(format!(
                "thumbnail scale ({}) must be smaller than render scale ({})",
                c.thumbnail_scale, c.render_scale
            )));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(CardMakerError::InvalidConfig(format!(
                    "invalid page range {start}-{end}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the document to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Render all pages (default).
    #[default]
    All,
    /// Render a single page (1-indexed).
    Single(usize),
    /// Render a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Render specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

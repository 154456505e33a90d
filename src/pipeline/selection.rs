//! Pointer-driven rectangle selection over a displayed page image.
//!
//! The host shows a page at some display size (often smaller than the
//! rendered raster) and forwards pointer events in display pixels. The
//! tracker turns them into a [`SelectionRect`], still in display pixels;
//! [`crate::pipeline::crop`] maps it back to native pixels.
//!
//! ```text
//!          pointer_down            pointer_move (updates rect)
//!   Idle ───────────────▶ Dragging ◀──────┐
//!    ▲                       │  └─────────┘
//!    └───────────────────────┘
//!      pointer_up / pointer_leave (rect kept)
//! ```
//!
//! The rect survives the end of a drag and is only dropped by [`clear`] or by
//! pointing the tracker at a different image via [`set_source`]. A display
//! resize of the same image rescales it instead.
//!
//! [`clear`]: SelectionTracker::clear
//! [`set_source`]: SelectionTracker::set_source

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relation between an image's native pixels and its on-screen size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    pub native_width: u32,
    pub native_height: u32,
    pub display_width: f64,
    pub display_height: f64,
}

impl DisplayTransform {
    pub fn new(native_width: u32, native_height: u32, display_width: f64, display_height: f64) -> Self {
        Self {
            native_width,
            native_height,
            display_width,
            display_height,
        }
    }

    /// Native image shown at its own size.
    pub fn identity(native_width: u32, native_height: u32) -> Self {
        Self::new(
            native_width,
            native_height,
            native_width as f64,
            native_height as f64,
        )
    }

    /// Display size for an image shown no larger than `max_w × max_h`,
    /// scaled down uniformly (never up) and rounded.
    pub fn fit(native_width: u32, native_height: u32, max_w: u32, max_h: u32) -> Self {
        if native_width <= max_w && native_height <= max_h {
            return Self::identity(native_width, native_height);
        }
        let ratio = (max_w as f64 / native_width as f64).min(max_h as f64 / native_height as f64);
        let dw = (native_width as f64 * ratio).round().max(1.0);
        let dh = (native_height as f64 * ratio).round().max(1.0);
        Self::new(native_width, native_height, dw, dh)
    }

    /// `native / display`, or `None` while the image is not laid out yet.
    pub fn scale(&self) -> Option<f64> {
        if self.display_width > 0.0 && self.display_width.is_finite() {
            Some(self.native_width as f64 / self.display_width)
        } else {
            None
        }
    }

    pub fn is_laid_out(&self) -> bool {
        self.scale().is_some() && self.display_height > 0.0
    }

    fn clamp(&self, p: Point) -> Point {
        Point {
            x: p.x.clamp(0.0, self.display_width.max(0.0)),
            y: p.y.clamp(0.0, self.display_height.max(0.0)),
        }
    }

    fn contains(&self, p: Point) -> bool {
        (0.0..=self.display_width).contains(&p.x) && (0.0..=self.display_height).contains(&p.y)
    }
}

/// A pointer position in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl SelectionRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Bounding box of two points, independent of drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    /// Whole display surface.
    pub fn full(transform: &DisplayTransform) -> Self {
        Self::new(0.0, 0.0, transform.display_width, transform.display_height)
    }

    /// Both sides strictly above `min`.
    pub fn exceeds(&self, min: f64) -> bool {
        self.w > min && self.h > min
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { start: Point },
}

/// Interactive selection state for one displayed image.
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    transform: Option<DisplayTransform>,
    state: DragState,
    rect: Option<SelectionRect>,
    min_selectable: f64,
}

impl SelectionTracker {
    pub fn new(min_selectable: f64) -> Self {
        Self {
            transform: None,
            state: DragState::Idle,
            rect: None,
            min_selectable,
        }
    }

    /// Point the tracker at a (new) image. Always drops the current selection.
    pub fn set_source(&mut self, transform: Option<DisplayTransform>) {
        self.transform = transform;
        self.clear();
    }

    /// The same image was laid out again at a new display size. The current
    /// selection (and an active drag) is rescaled to stay over the same
    /// native region.
    pub fn resize(&mut self, display_width: f64, display_height: f64) {
        let Some(old) = self.transform else {
            return;
        };
        let new = DisplayTransform {
            display_width,
            display_height,
            ..old
        };
        self.transform = Some(new);

        if !(old.is_laid_out() && new.is_laid_out()) {
            self.clear();
            return;
        }
        let sx = display_width / old.display_width;
        let sy = display_height / old.display_height;
        if let Some(r) = self.rect {
            let a = new.clamp(Point::new(r.x * sx, r.y * sy));
            let b = new.clamp(Point::new((r.x + r.w) * sx, (r.y + r.h) * sy));
            self.rect = Some(SelectionRect::from_corners(a, b));
        }
        if let DragState::Dragging { start } = self.state {
            self.state = DragState::Dragging {
                start: new.clamp(Point::new(start.x * sx, start.y * sy)),
            };
        }
        debug!("Selection rescaled to display {}x{}", display_width, display_height);
    }

    /// Drop the selection and return to idle.
    pub fn clear(&mut self) {
        self.state = DragState::Idle;
        self.rect = None;
    }

    /// Start a drag. Ignored (returns `false`) when the image is not laid out
    /// or the point is outside the display surface.
    pub fn pointer_down(&mut self, p: Point) -> bool {
        let Some(t) = self.transform.filter(DisplayTransform::is_laid_out) else {
            return false;
        };
        if !t.contains(p) {
            return false;
        }
        let start = t.clamp(p);
        self.state = DragState::Dragging { start };
        self.rect = Some(SelectionRect::new(start.x, start.y, 0.0, 0.0));
        true
    }

    /// Update the rect while dragging; ignored when idle.
    pub fn pointer_move(&mut self, p: Point) {
        let (DragState::Dragging { start }, Some(t)) = (self.state, self.transform) else {
            return;
        };
        self.rect = Some(SelectionRect::from_corners(start, t.clamp(p)));
    }

    /// End the drag; the last rect stays as the current selection.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    /// Same as [`pointer_up`](Self::pointer_up).
    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn rect(&self) -> Option<SelectionRect> {
        self.rect
    }

    pub fn transform(&self) -> Option<DisplayTransform> {
        self.transform
    }

    pub fn min_selectable(&self) -> f64 {
        self.min_selectable
    }

    /// `true` once both sides exceed the minimum, whether or not a drag is
    /// still in progress.
    pub fn is_confirmable(&self) -> bool {
        self.rect.is_some_and(|r| r.exceeds(self.min_selectable))
    }

    /// Selection size in native pixels, for the size label.
    pub fn native_size(&self) -> Option<(u32, u32)> {
        let r = self.rect?;
        let scale = self.transform?.scale()?;
        Some((
            (r.w * scale).round().max(0.0) as u32,
            (r.h * scale).round().max(0.0) as u32,
        ))
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new(20.0)
    }
}

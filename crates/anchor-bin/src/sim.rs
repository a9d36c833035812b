//! Simulated document and scroll surface for the demo binary.
//!
//! Models a document as a vertical stack of character rows, one content unit
//! per character, so anchor geometry is exact and perturbations (reflow
//! drift, container resizes) can be injected deterministically from the
//! event loop.

use core_geometry::{AnchorTarget, LayoutEngine, Point, Rect, Size};
use core_highlight::{Color, StyleAttrs, StyleTarget};
use core_navigate::{SelectionSink, TextBuffer};
use core_viewport::{ReentrancyFlag, ScrollSurface, ViewportController};
use std::time::Duration;

pub const CONTENT_WIDTH: f64 = 100.0;

/// Document with deterministic pseudo-varied line lengths.
pub struct SimDocument {
    lines: Vec<usize>,
    char_len: usize,
    /// Vertical drift injected to mimic reflow from unrelated animations.
    pub y_offset: f64,
    pub attached: bool,
}

impl SimDocument {
    pub fn new(target_chars: usize) -> Self {
        let mut lines = Vec::new();
        let mut total = 0usize;
        let mut n = 0usize;
        while total < target_chars {
            // Varied but reproducible line lengths in [20, 75].
            let len = 20 + (n * 37 + 11) % 56;
            let len = len.min(target_chars - total);
            lines.push(len);
            total += len;
            if total < target_chars {
                total += 1; // separator
            }
            n += 1;
        }
        Self {
            lines,
            char_len: total,
            y_offset: 0.0,
            attached: true,
        }
    }
}

impl LayoutEngine for SimDocument {
    fn ensure_layout(&mut self) {}

    fn rect_for_range(&self, target: AnchorTarget) -> Option<Rect> {
        if !self.attached || self.char_len == 0 {
            return None;
        }
        Some(Rect::new(
            0.0,
            target.start as f64 + self.y_offset,
            CONTENT_WIDTH,
            target.len as f64,
        ))
    }

    fn content_size(&self) -> Size {
        Size::new(CONTENT_WIDTH, self.char_len as f64)
    }

    fn buffer_len(&self) -> usize {
        self.char_len
    }
}

impl TextBuffer for SimDocument {
    fn char_len(&self) -> usize {
        self.char_len
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_char_len(&self, index: usize) -> Option<usize> {
        self.lines.get(index).copied()
    }
}

/// Scroll surface that records motion and logs it for the demo transcript.
#[derive(Default)]
pub struct LoggingSurface {
    pub origin: Point,
    pub viewport: Size,
    pub content: Size,
    pub pending_animation: Option<Point>,
    pub scroll_count: usize,
    pub flag: Option<ReentrancyFlag>,
}

impl ScrollSurface for LoggingSurface {
    fn visible_rect(&self) -> Rect {
        Rect::from_parts(self.origin, self.viewport)
    }

    fn content_size(&self) -> Size {
        self.content
    }

    fn set_scroll_origin(&mut self, origin: Point) {
        let self_initiated = self
            .flag
            .as_ref()
            .map(|f| f.is_self_initiated())
            .unwrap_or(false);
        tracing::debug!(
            target: "nav.viewport",
            y = origin.y,
            self_initiated,
            "surface_scroll"
        );
        self.origin = origin;
        self.scroll_count += 1;
    }

    fn begin_scroll_animation(&mut self, to: Point, duration: Duration) {
        tracing::debug!(
            target: "nav.viewport",
            y = to.y,
            duration_ms = duration.as_millis() as u64,
            "surface_scroll_animated"
        );
        self.pending_animation = Some(to);
    }

    fn set_scrollbar_visible(&mut self, visible: bool) {
        tracing::debug!(target: "nav.viewport", visible, "scrollbar_visibility");
    }
}

/// Style store over the simulated document's characters.
pub struct SimStyles {
    chars: Vec<StyleAttrs>,
}

impl SimStyles {
    pub fn new(len: usize) -> Self {
        Self {
            chars: vec![StyleAttrs::default(); len],
        }
    }
}

impl StyleTarget for SimStyles {
    fn attributes_at(&self, offset: usize) -> StyleAttrs {
        self.chars[offset].clone()
    }

    fn apply_attributes(&mut self, start: usize, len: usize, attrs: &StyleAttrs) {
        for c in &mut self.chars[start..start + len] {
            *c = attrs.clone();
        }
    }

    fn apply_highlight(&mut self, start: usize, len: usize, color: Color, opacity: f64) {
        tracing::debug!(target: "nav.highlight", start, len, opacity, "highlight_applied");
        for c in &mut self.chars[start..start + len] {
            c.background = Some(color.with_opacity(opacity));
        }
    }
}

#[derive(Default)]
pub struct SimCaret {
    pub position: Option<usize>,
}

impl SelectionSink for SimCaret {
    fn set_caret(&mut self, offset: usize) {
        tracing::debug!(target: "nav.navigator", offset, "caret_set");
        self.position = Some(offset);
    }
}

/// The full simulated world the navigator runs against.
pub struct SimWorld {
    pub document: SimDocument,
    pub viewport: ViewportController<LoggingSurface>,
    pub styles: SimStyles,
    pub caret: SimCaret,
}

impl SimWorld {
    pub fn new(buffer_chars: usize, viewport_height: f64) -> Self {
        let document = SimDocument::new(buffer_chars);
        let surface = LoggingSurface {
            viewport: Size::new(CONTENT_WIDTH, viewport_height),
            content: document.content_size(),
            ..LoggingSurface::default()
        };
        let mut viewport = ViewportController::new(surface);
        let flag = viewport.flag();
        viewport.surface_mut().flag = Some(flag);
        Self {
            document,
            viewport,
            styles: SimStyles::new(buffer_chars),
            caret: SimCaret::default(),
        }
    }

    /// Land any pending animated scroll and notify the controller.
    pub fn complete_pending_animation(&mut self) {
        if let Some(to) = self.viewport.surface_mut().pending_animation.take() {
            self.viewport.surface_mut().origin = to;
            self.viewport.animation_completed();
        }
    }

    /// Shrink the hosting container, as a sidebar or inspector opening would.
    pub fn shrink_viewport(&mut self, by: f64) {
        let surface = self.viewport.surface_mut();
        let h = (surface.viewport.height - by).max(1.0);
        tracing::info!(target: "nav.viewport", new_height = h, "container_resized");
        surface.viewport = Size::new(surface.viewport.width, h);
    }
}

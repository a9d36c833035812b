//! Shared simulation harness for navigator integration tests.
//!
//! Models a document as a fixed grid: each character occupies one
//! 1.0-unit-tall, full-width row, so a 500-char buffer is 500 content units
//! tall. The surface records every scroll, scrollbar toggle, and the
//! reentrancy flag state observed from inside each scroll callback.

use core_geometry::{AnchorTarget, LayoutEngine, Point, Rect, Size};
use core_highlight::{Color, StyleAttrs, StyleTarget};
use core_navigate::{
    AnchorNavigator, ManualClock, NavHost, NavTuning, NavigationOutcome, SelectionSink,
    TextBuffer,
};
use core_viewport::{ReentrancyFlag, ScrollSurface, ViewportController};
use std::time::Duration;

pub const CONTENT_WIDTH: f64 = 100.0;

pub struct SimEngine {
    pub buffer_len: usize,
    pub attached: bool,
    /// Vertical shift applied to all geometry; tests perturb this to mimic
    /// reflow from unrelated animations.
    pub y_offset: f64,
    pub layout_passes: usize,
}

impl SimEngine {
    pub fn new(buffer_len: usize) -> Self {
        Self {
            buffer_len,
            attached: true,
            y_offset: 0.0,
            layout_passes: 0,
        }
    }
}

impl LayoutEngine for SimEngine {
    fn ensure_layout(&mut self) {
        self.layout_passes += 1;
    }
    fn rect_for_range(&self, target: AnchorTarget) -> Option<Rect> {
        if !self.attached || self.buffer_len == 0 {
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
        Size::new(CONTENT_WIDTH, self.buffer_len as f64)
    }
    fn buffer_len(&self) -> usize {
        self.buffer_len
    }
}

#[derive(Default)]
pub struct SimSurface {
    pub origin: Point,
    pub viewport: Size,
    pub content: Size,
    pub immediate_scrolls: Vec<Point>,
    pub animated_scrolls: Vec<Point>,
    pub pending_animation: Option<Point>,
    pub scrollbar_events: Vec<bool>,
    pub flag: Option<ReentrancyFlag>,
    pub flag_seen_during_scroll: Vec<bool>,
}

impl ScrollSurface for SimSurface {
    fn visible_rect(&self) -> Rect {
        Rect::from_parts(self.origin, self.viewport)
    }
    fn content_size(&self) -> Size {
        self.content
    }
    fn set_scroll_origin(&mut self, origin: Point) {
        self.origin = origin;
        self.immediate_scrolls.push(origin);
        if let Some(flag) = &self.flag {
            self.flag_seen_during_scroll.push(flag.is_self_initiated());
        }
    }
    fn begin_scroll_animation(&mut self, to: Point, _duration: Duration) {
        self.pending_animation = Some(to);
        self.animated_scrolls.push(to);
    }
    fn set_scrollbar_visible(&mut self, visible: bool) {
        self.scrollbar_events.push(visible);
    }
}

pub struct SimStyles {
    pub chars: Vec<StyleAttrs>,
}

impl SimStyles {
    pub fn new(len: usize) -> Self {
        let mut chars = vec![StyleAttrs::default(); len];
        for (i, attrs) in chars.iter_mut().enumerate() {
            attrs.italic = i % 7 == 0;
            attrs.foreground = Some(Color::rgb(40, 40, 40));
        }
        Self { chars }
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
        for c in &mut self.chars[start..start + len] {
            c.background = Some(color.with_opacity(opacity));
        }
    }
}

#[derive(Default)]
pub struct SimCaret {
    pub positions: Vec<usize>,
}

impl SelectionSink for SimCaret {
    fn set_caret(&mut self, offset: usize) {
        self.positions.push(offset);
    }
}

/// Line-length view for line-number navigation tests.
pub struct SimText(pub Vec<usize>);

impl TextBuffer for SimText {
    fn char_len(&self) -> usize {
        let seps = self.0.len().saturating_sub(1);
        self.0.iter().sum::<usize>() + seps
    }
    fn line_count(&self) -> usize {
        self.0.len()
    }
    fn line_char_len(&self, index: usize) -> Option<usize> {
        self.0.get(index).copied()
    }
}

pub struct Harness {
    pub engine: SimEngine,
    pub viewport: ViewportController<SimSurface>,
    pub styles: SimStyles,
    pub caret: SimCaret,
    pub clock: ManualClock,
    pub nav: AnchorNavigator,
}

impl Harness {
    pub fn new(buffer_len: usize, viewport_height: f64) -> Self {
        let engine = SimEngine::new(buffer_len);
        let surface = SimSurface {
            viewport: Size::new(CONTENT_WIDTH, viewport_height),
            content: engine.content_size(),
            ..SimSurface::default()
        };
        let mut viewport = ViewportController::new(surface);
        let flag = viewport.flag();
        viewport.surface_mut().flag = Some(flag);
        let clock = ManualClock::starting_now();
        let nav = AnchorNavigator::with_clock(NavTuning::default(), Box::new(clock.clone()));
        Self {
            engine,
            viewport,
            styles: SimStyles::new(buffer_len),
            caret: SimCaret::default(),
            clock,
            nav,
        }
    }

    pub fn navigate_chars(&mut self, position: i64, length: i64) -> NavigationOutcome {
        self.navigate_chars_with_header(position, length, false)
    }

    pub fn navigate_chars_with_header(
        &mut self,
        position: i64,
        length: i64,
        header_expanded: bool,
    ) -> NavigationOutcome {
        let mut host = NavHost {
            engine: &mut self.engine,
            viewport: &mut self.viewport,
            styles: &mut self.styles,
            caret: &mut self.caret,
        };
        self.nav
            .navigate_chars(&mut host, position, length, header_expanded)
    }

    pub fn navigate_line(&mut self, text: &SimText, line_number: usize) -> NavigationOutcome {
        let mut host = NavHost {
            engine: &mut self.engine,
            viewport: &mut self.viewport,
            styles: &mut self.styles,
            caret: &mut self.caret,
        };
        self.nav.navigate_line(&mut host, text, line_number, false)
    }

    /// Drive one navigator tick without advancing the clock.
    pub fn tick(&mut self) -> bool {
        let mut host = NavHost {
            engine: &mut self.engine,
            viewport: &mut self.viewport,
            styles: &mut self.styles,
            caret: &mut self.caret,
        };
        self.nav.tick(&mut host)
    }

    /// Advance simulated time by the navigator's advertised interval, then
    /// tick. Returns `true` while the navigator stays busy.
    pub fn advance_and_tick(&mut self) -> bool {
        let interval = self
            .nav
            .next_interval()
            .unwrap_or(Duration::from_millis(50));
        self.clock.advance(interval.max(Duration::from_millis(1)));
        self.tick()
    }

    /// Run until the navigator is idle, with a hard iteration cap so broken
    /// termination fails loudly instead of hanging the test.
    pub fn run_to_idle(&mut self, cap: usize) -> usize {
        let mut iterations = 0;
        while !self.nav.is_idle() {
            assert!(iterations < cap, "navigator failed to go idle within {cap} ticks");
            self.advance_and_tick();
            iterations += 1;
        }
        iterations
    }

    /// Land the pending animated scroll and notify the controller.
    pub fn complete_animation(&mut self) {
        if let Some(to) = self.viewport.surface_mut().pending_animation.take() {
            self.viewport.surface_mut().origin = to;
        }
        self.viewport.animation_completed();
    }

    pub fn teardown(&mut self) {
        let mut host = NavHost {
            engine: &mut self.engine,
            viewport: &mut self.viewport,
            styles: &mut self.styles,
            caret: &mut self.caret,
        };
        self.nav.teardown(&mut host);
    }
}

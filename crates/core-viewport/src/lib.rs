//! Viewport controller: the one gate for programmatic scrolls.
//!
//! Wraps the host's scrollable container behind the [`ScrollSurface`] trait
//! and tags every scroll it performs with a reentrancy signal so external
//! scroll observers can distinguish subsystem-initiated position changes from
//! user ones. Any scroll that bypasses this controller while a navigation
//! session is active will be misread as user drift and fought by the
//! convergence scheduler.
//!
//! Two scroll paths, both flagged:
//! * immediate — synchronous `set_scroll_origin`, flag cleared on return;
//! * animated — fixed-duration easing started on the surface, flag cleared
//!   when the host reports completion via [`ViewportController::animation_completed`].
//!
//! The immediate-then-animated split is deliberate: the navigator performs
//! one immediate correction first (the anchor is never transiently
//! off-screen while an animation sets up) and layers a short animated nudge
//! on top for perceptual smoothness.

use core_geometry::{Point, Rect, Size};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Fixed duration of the animated micro-scroll path.
pub const ANIMATED_SCROLL_DURATION: Duration = Duration::from_millis(100);

/// Seam to the host's scrollable container.
///
/// `begin_scroll_animation` is fire-and-forget; the host must call
/// [`ViewportController::animation_completed`] when the animation lands so
/// the reentrancy signal can be released.
pub trait ScrollSurface {
    /// Current visible window in content coordinates.
    fn visible_rect(&self) -> Rect;
    /// Total scrollable content size.
    fn content_size(&self) -> Size;
    /// Jump the scroll origin synchronously (immediate repaint).
    fn set_scroll_origin(&mut self, origin: Point);
    /// Start a short eased scroll toward `to`.
    fn begin_scroll_animation(&mut self, to: Point, duration: Duration);
    /// Show or hide the scrollbar / scroll indicators.
    fn set_scrollbar_visible(&mut self, visible: bool);
}

#[derive(Debug, Default)]
struct FlagInner {
    in_flight: AtomicU64,
    generation: AtomicU64,
}

/// Shared signal marking scroll-position changes as subsystem-initiated.
///
/// Externally a boolean (`is_self_initiated`), internally a generation
/// counter plus an in-flight count so overlapping flagged scrolls (an
/// animated nudge superseded by an immediate correction) cannot race each
/// other's clear. Handles are cheap clones; hand one to every external
/// scroll observer.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyFlag {
    inner: Arc<FlagInner>,
}

impl ReentrancyFlag {
    /// True while at least one subsystem-initiated scroll is in flight.
    /// External scroll handlers must consult this before treating a position
    /// change as user intent.
    pub fn is_self_initiated(&self) -> bool {
        self.inner.in_flight.load(Ordering::Relaxed) > 0
    }

    /// Monotonic count of programmatic scrolls issued so far. Observers that
    /// may run concurrently with the clear can compare generations instead
    /// of the plain boolean.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Relaxed)
    }

    fn begin(&self) -> u64 {
        self.inner.in_flight.fetch_add(1, Ordering::Relaxed);
        self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn end(&self) {
        let prev = self.inner.in_flight.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "reentrancy flag cleared without a begin");
    }
}

/// Controller wrapping one scrollable container instance.
pub struct ViewportController<S: ScrollSurface> {
    surface: S,
    flag: ReentrancyFlag,
    /// Generation of the animated scroll still awaiting completion, if any.
    pending_animation: Option<u64>,
}

impl<S: ScrollSurface> ViewportController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            flag: ReentrancyFlag::default(),
            pending_animation: None,
        }
    }

    /// Handle for external scroll observers.
    pub fn flag(&self) -> ReentrancyFlag {
        self.flag.clone()
    }

    pub fn visible_rect(&self) -> Rect {
        self.surface.visible_rect()
    }

    pub fn content_size(&self) -> Size {
        self.surface.content_size()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Scroll to `point` (clamped into the valid scroll range) through the
    /// reentrancy-flagged path.
    ///
    /// Immediate scrolls clear the flag before returning. Animated scrolls
    /// hold it until [`Self::animation_completed`]; starting a new scroll
    /// while an animation is pending releases the superseded animation's
    /// hold first.
    pub fn scroll_to(&mut self, point: Point, animated: bool) {
        let clamped = self.clamp_scroll_origin(point);
        if let Some(_superseded) = self.pending_animation.take() {
            // The old animation's completion callback may still fire; its
            // generation no longer matches so it will be ignored.
            self.flag.end();
        }
        let generation = self.flag.begin();
        tracing::trace!(
            target: "nav.viewport",
            x = clamped.x,
            y = clamped.y,
            animated,
            generation,
            "scroll_to"
        );
        if animated {
            self.pending_animation = Some(generation);
            self.surface
                .begin_scroll_animation(clamped, ANIMATED_SCROLL_DURATION);
        } else {
            self.surface.set_scroll_origin(clamped);
            self.flag.end();
        }
    }

    /// Host callback: the most recent animated scroll finished. Releases the
    /// reentrancy hold taken when the animation started. Stale completions
    /// (animation already superseded) are no-ops.
    pub fn animation_completed(&mut self) {
        if self.pending_animation.take().is_some() {
            self.flag.end();
        }
    }

    pub fn set_scrollbar_visible(&mut self, visible: bool) {
        tracing::debug!(target: "nav.viewport", visible, "scrollbar_visibility");
        self.surface.set_scrollbar_visible(visible);
    }

    /// Clamp a desired scroll origin into `[0, content - visible]` on both
    /// axes. A content extent smaller than the viewport clamps to zero.
    fn clamp_scroll_origin(&self, point: Point) -> Point {
        let visible = self.surface.visible_rect();
        let content = self.surface.content_size();
        let max_x = (content.width - visible.size.width).max(0.0);
        let max_y = (content.height - visible.size.height).max(0.0);
        Point::new(point.x.clamp(0.0, max_x), point.y.clamp(0.0, max_y))
    }
}

/// Ease-out progress curve for the animated nudge.
///
/// Cubic ease-out: fast start, visible deceleration toward the target.
/// Surfaces that run their own animation loop can sample this to match the
/// controller's fixed duration.
pub fn ease_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

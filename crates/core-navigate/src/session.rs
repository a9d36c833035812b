//! Navigation session state, tuning, and OptimalZone membership.
//!
//! A `NavigationSession` is the explicit owned state of one in-flight
//! navigation: created when a request starts, mutated only by the
//! convergence scheduler's tick, destroyed on completion, preemption, or
//! teardown. Exactly one session is live at a time (last-writer-wins); the
//! navigator enforces that, this module just carries the state.

use core_geometry::{AnchorTarget, Rect, Size};
use core_highlight::FadePlan;
use std::time::{Duration, Instant};

/// Tunable constants for the whole subsystem. Defaults are the shipped
/// behavior; a config layer may override and should pass the result through
/// [`NavTuning::clamped`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavTuning {
    /// Desired fractional distance of the anchor's top from the viewport
    /// top after a corrective scroll.
    pub top_margin_fraction: f64,
    /// Fraction of the viewport height forming the OptimalZone.
    pub optimal_zone_fraction: f64,
    /// Delay applied when a header-collapse animation must finish first.
    pub header_defer: Duration,
    /// Base polling interval of the convergence scheduler.
    pub base_interval: Duration,
    /// Ticks spent at the base interval before escalating.
    pub base_ticks: u32,
    /// Escalated polling interval for late-settling layout animations.
    pub escalated_interval: Duration,
    /// Ticks spent at the escalated interval before unconditional
    /// termination.
    pub escalated_ticks: u32,
    /// Container-extent delta (content units) treated as a major layout
    /// change forcing a reposition regardless of zone membership.
    pub reposition_threshold: f64,
    /// Highlight hold/fade timing.
    pub fade: FadePlan,
}

impl Default for NavTuning {
    fn default() -> Self {
        Self {
            top_margin_fraction: 0.15,
            optimal_zone_fraction: 0.30,
            header_defer: Duration::from_millis(500),
            base_interval: Duration::from_millis(50),
            base_ticks: 40,
            escalated_interval: Duration::from_millis(20),
            escalated_ticks: 50,
            reposition_threshold: 10.0,
            fade: FadePlan::default(),
        }
    }
}

impl NavTuning {
    /// Clamp raw (possibly user-supplied) values into workable ranges.
    /// Fractions land in `[0, 1]`, budgets and fade steps stay non-zero.
    pub fn clamped(mut self) -> Self {
        self.top_margin_fraction = self.top_margin_fraction.clamp(0.0, 1.0);
        self.optimal_zone_fraction = self.optimal_zone_fraction.clamp(0.0, 1.0);
        self.reposition_threshold = self.reposition_threshold.max(0.0);
        self.base_ticks = self.base_ticks.max(1);
        self.escalated_ticks = self.escalated_ticks.max(1);
        self.fade.steps = self.fade.steps.max(1);
        self
    }
}

/// Live state of one in-flight navigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationSession {
    /// Immutable for the session's lifetime.
    pub target: AnchorTarget,
    pub top_margin_fraction: f64,
    pub active: bool,
    /// Scheduler ticks consumed so far.
    pub tick_count: u32,
    pub started_at: Instant,
    /// Container extent recorded at session start (and re-baselined after
    /// each forced reposition) for major-layout-change detection.
    pub baseline_extent: Size,
}

impl NavigationSession {
    pub fn new(
        target: AnchorTarget,
        top_margin_fraction: f64,
        started_at: Instant,
        baseline_extent: Size,
    ) -> Self {
        Self {
            target,
            top_margin_fraction,
            active: true,
            tick_count: 0,
            started_at,
            baseline_extent,
        }
    }
}

/// The top fractional region of the visible rect considered an acceptable
/// resting place for an anchor. Recomputed every tick from current geometry.
pub fn optimal_zone(visible: &Rect, fraction: f64) -> Rect {
    Rect::new(
        visible.left(),
        visible.top(),
        visible.size.width,
        visible.size.height * fraction.clamp(0.0, 1.0),
    )
}

/// Zone membership: fully contained, or overlapping the zone with the
/// anchor's top edge at/after the zone's top edge. An anchor hanging above
/// the viewport top is never acceptable; one merely reaching into the lower
/// viewport is not either.
pub fn anchor_acceptable(anchor: &Rect, zone: &Rect) -> bool {
    zone.contains_rect(anchor) || (zone.intersects(anchor) && anchor.top() >= zone.top())
}

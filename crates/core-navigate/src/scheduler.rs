//! Convergence scheduler: bounded, escalating-frequency anchor re-checks.
//!
//! The anchor's geometry keeps moving for a window of time after the initial
//! scroll (header collapse, window resize, reflow), and those producers share
//! no completion event. Rather than subscribing to every possible producer,
//! the scheduler polls: a base-interval phase catches the common case, a
//! shorter escalated phase catches late-settling animations, and the total
//! tick budget guarantees termination no matter how erratic the layout
//! churn is. The CPU cost of polling is confined to that short budget.
//!
//! Each tick is a discrete, non-blocking invocation; cadence is owned by the
//! caller's timer (see `current_interval`), so tests drive ticks directly.

use crate::session::{NavigationSession, NavTuning, anchor_acceptable, optimal_zone};
use crate::{NavHost, NavMetrics};
use core_geometry::{GeometryResolver, Point};
use core_viewport::ScrollSurface;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Budget remains; caller should re-arm at `current_interval`.
    Continue,
    /// Budget exhausted (or session no longer live); caller must tear the
    /// session down and stop ticking.
    Finished,
}

/// Two-phase bounded tick machine for one navigation session.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceScheduler {
    base_interval: Duration,
    base_ticks: u32,
    escalated_interval: Duration,
    escalated_ticks: u32,
    reposition_threshold: f64,
    zone_fraction: f64,
    ticks: u32,
}

impl ConvergenceScheduler {
    pub fn new(tuning: &NavTuning) -> Self {
        Self {
            base_interval: tuning.base_interval,
            base_ticks: tuning.base_ticks,
            escalated_interval: tuning.escalated_interval,
            escalated_ticks: tuning.escalated_ticks,
            reposition_threshold: tuning.reposition_threshold,
            zone_fraction: tuning.optimal_zone_fraction,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Hard upper bound on ticks across both phases.
    pub fn total_budget(&self) -> u32 {
        self.base_ticks + self.escalated_ticks
    }

    /// Interval at which the caller should schedule the next tick.
    pub fn current_interval(&self) -> Duration {
        if self.ticks < self.base_ticks {
            self.base_interval
        } else {
            self.escalated_interval
        }
    }

    /// One scheduler tick: liveness check, re-resolve, drift/major-change
    /// detection, corrective scroll if needed, budget accounting.
    pub fn tick<S: ScrollSurface>(
        &mut self,
        session: &mut NavigationSession,
        host: &mut NavHost<'_, S>,
        metrics: &NavMetrics,
    ) -> TickOutcome {
        // Orphaned tick: session superseded or torn down between the timer
        // firing and this call. Never surfaced, just stop.
        if !session.active {
            tracing::trace!(target: "nav.scheduler", "orphaned_tick");
            return TickOutcome::Finished;
        }

        self.ticks += 1;
        session.tick_count = self.ticks;

        let visible = host.viewport.visible_rect();
        // Unrelated animations resize the hosting container; past the
        // threshold we reposition even if the anchor still reads as in-zone,
        // because the zone itself was computed against dead geometry.
        let forced =
            visible.size.max_abs_delta(session.baseline_extent) > self.reposition_threshold;

        match GeometryResolver::resolve(host.engine, session.target) {
            Ok(anchor) => {
                let zone = optimal_zone(&visible, self.zone_fraction);
                if forced || !anchor_acceptable(&anchor, &zone) {
                    let y =
                        anchor.top() - visible.size.height * session.top_margin_fraction;
                    host.viewport
                        .scroll_to(Point::new(visible.origin.x, y), false);
                    // Re-baseline so the same extent change is not charged
                    // as drift again on the next tick.
                    session.baseline_extent = host.viewport.visible_rect().size;
                    metrics.incr_corrective_scroll();
                    if forced {
                        metrics.incr_forced_reposition();
                    }
                    tracing::trace!(
                        target: "nav.scheduler",
                        tick = self.ticks,
                        forced,
                        y,
                        "corrective_scroll"
                    );
                }
            }
            Err(err) => {
                // Geometry may be transiently unavailable mid-reflow; the
                // budget still advances so termination stays bounded.
                tracing::trace!(target: "nav.scheduler", tick = self.ticks, %err, "tick_skipped");
            }
        }

        if self.ticks >= self.total_budget() {
            tracing::debug!(
                target: "nav.scheduler",
                ticks = self.ticks,
                "budget_exhausted"
            );
            TickOutcome::Finished
        } else {
            TickOutcome::Continue
        }
    }
}

//! Anchor navigator: per-request orchestration of scroll, caret, highlight,
//! and convergence.
//!
//! One navigation request flows: resolve geometry → decide the initial
//! scroll (none when the anchor already rests in the OptimalZone) → move the
//! caret → flash the highlight → install a bounded convergence scheduler →
//! suppress the scrollbar until the session ends. Requests are strictly
//! last-writer-wins: starting a new navigation cancels the previous
//! session's scheduler before any new state is installed, so two schedulers
//! can never issue conflicting corrective scrolls.
//!
//! Failure policy: invalid targets and unavailable geometry degrade to "no
//! navigation occurred" — no scroll, no crash, nothing user-facing. The
//! returned [`NavigationOutcome`] carries the status for callers that want
//! to surface it.

mod clock;
mod scheduler;
mod session;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use scheduler::{ConvergenceScheduler, TickOutcome};
pub use session::{NavTuning, NavigationSession, anchor_acceptable, optimal_zone};

use core_geometry::{AnchorTarget, GeometryResolver, LayoutEngine, NavError, Point};
use core_highlight::{Color, HighlightAnimator, StyleTarget};
use core_viewport::{ScrollSurface, ViewportController};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Character-count view of the text buffer, used to resolve line-number
/// navigation requests. Line lengths exclude the separator; lines are
/// assumed to be joined by single-character separators.
pub trait TextBuffer {
    fn char_len(&self) -> usize;
    fn line_count(&self) -> usize;
    /// Character length of 0-based line `index`, excluding the separator.
    fn line_char_len(&self, index: usize) -> Option<usize>;
}

/// Caret/selection seam on the editing surface.
pub trait SelectionSink {
    /// Collapse the selection to a zero-length caret at `offset`, so
    /// interaction after a navigation continues from the anchor.
    fn set_caret(&mut self, offset: usize);
}

/// Resolve a 1-based line number to the character range covering that line,
/// by summing preceding line lengths plus separators.
pub fn line_target(
    buffer: &dyn TextBuffer,
    line_number: usize,
) -> Result<AnchorTarget, NavError> {
    if line_number == 0 || line_number > buffer.line_count() {
        return Err(NavError::InvalidTarget);
    }
    let mut start = 0usize;
    for index in 0..line_number - 1 {
        let len = buffer.line_char_len(index).ok_or(NavError::InvalidTarget)?;
        start += len + 1; // separator
    }
    let len = buffer
        .line_char_len(line_number - 1)
        .ok_or(NavError::InvalidTarget)?;
    Ok(AnchorTarget::new(start, len))
}

/// Borrowed collaborators for one navigator call. The navigator owns no
/// buffer, layout, or scroll state itself; everything external arrives
/// through this host.
pub struct NavHost<'a, S: ScrollSurface> {
    pub engine: &'a mut dyn LayoutEngine,
    pub viewport: &'a mut ViewportController<S>,
    pub styles: &'a mut dyn StyleTarget,
    pub caret: &'a mut dyn SelectionSink,
}

/// Status of a navigation request. Failures are silent no-ops at the
/// subsystem level; callers may inspect and surface them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// A session started. `scrolled` is `false` when the anchor was already
    /// inside the OptimalZone and no scroll was needed.
    Started { scrolled: bool },
    /// A header-collapse animation is in progress; the whole procedure
    /// (highlight included) runs after the defer delay.
    Deferred,
    /// Navigation aborted with no scroll performed.
    Rejected(NavError),
}

/// Lifetime counters for the subsystem, snapshot-inspectable like the rest
/// of the runtime's telemetry.
#[derive(Debug, Default)]
pub struct NavMetrics {
    sessions_started: AtomicU64,
    sessions_completed: AtomicU64,
    sessions_preempted: AtomicU64,
    deferred_navigations: AtomicU64,
    corrective_scrolls: AtomicU64,
    forced_repositions: AtomicU64,
    rejected_targets: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavMetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_preempted: u64,
    pub deferred_navigations: u64,
    pub corrective_scrolls: u64,
    pub forced_repositions: u64,
    pub rejected_targets: u64,
}

impl NavMetrics {
    pub fn snapshot(&self) -> NavMetricsSnapshot {
        use Ordering::Relaxed;
        NavMetricsSnapshot {
            sessions_started: self.sessions_started.load(Relaxed),
            sessions_completed: self.sessions_completed.load(Relaxed),
            sessions_preempted: self.sessions_preempted.load(Relaxed),
            deferred_navigations: self.deferred_navigations.load(Relaxed),
            corrective_scrolls: self.corrective_scrolls.load(Relaxed),
            forced_repositions: self.forced_repositions.load(Relaxed),
            rejected_targets: self.rejected_targets.load(Relaxed),
        }
    }

    pub(crate) fn incr_corrective_scroll(&self) {
        self.corrective_scrolls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_forced_reposition(&self) {
        self.forced_repositions.fetch_add(1, Ordering::Relaxed);
    }

    fn incr(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Default highlight emphasis: warm yellow, fully opaque at flash start.
pub const DEFAULT_HIGHLIGHT: Color = Color::rgb(255, 223, 96);

#[derive(Debug, Clone, Copy)]
struct DeferredNavigation {
    position: i64,
    length: i64,
    top_margin_fraction: f64,
    due: Instant,
}

/// Entry point for anchor navigation. Owns the session, the scheduler, and
/// the highlight animator; borrows everything else per call via [`NavHost`].
pub struct AnchorNavigator {
    tuning: NavTuning,
    clock: Box<dyn Clock>,
    highlight: HighlightAnimator,
    highlight_color: Color,
    session: Option<NavigationSession>,
    scheduler: Option<ConvergenceScheduler>,
    deferred: Option<DeferredNavigation>,
    metrics: NavMetrics,
}

impl AnchorNavigator {
    pub fn new(tuning: NavTuning) -> Self {
        Self::with_clock(tuning, Box::new(MonotonicClock))
    }

    /// Construct with an injected clock (tests pass a [`ManualClock`]).
    pub fn with_clock(tuning: NavTuning, clock: Box<dyn Clock>) -> Self {
        let tuning = tuning.clamped();
        Self {
            highlight: HighlightAnimator::new(tuning.fade),
            highlight_color: DEFAULT_HIGHLIGHT,
            tuning,
            clock,
            session: None,
            scheduler: None,
            deferred: None,
            metrics: NavMetrics::default(),
        }
    }

    pub fn metrics(&self) -> NavMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    /// True when no session, deferred request, or highlight remains.
    pub fn is_idle(&self) -> bool {
        self.session.is_none() && self.deferred.is_none() && !self.highlight.is_active()
    }

    /// Interval at which the driver should schedule the next [`Self::tick`],
    /// or `None` when idle.
    pub fn next_interval(&self) -> Option<Duration> {
        if let Some(scheduler) = &self.scheduler {
            return Some(scheduler.current_interval());
        }
        let now = self.clock.now();
        if let Some(deferred) = &self.deferred {
            return Some(deferred.due.saturating_duration_since(now));
        }
        self.highlight
            .next_due()
            .map(|due| due.saturating_duration_since(now))
    }

    /// Navigate to an already-validated character range using the default
    /// top margin.
    pub fn navigate<S: ScrollSurface>(
        &mut self,
        host: &mut NavHost<'_, S>,
        target: AnchorTarget,
        header_expanded: bool,
    ) -> NavigationOutcome {
        self.navigate_chars(host, target.start as i64, target.len as i64, header_expanded)
    }

    /// Navigate to a raw `(position, length)` request; validation and length
    /// clamping happen against the engine's current buffer length.
    pub fn navigate_chars<S: ScrollSurface>(
        &mut self,
        host: &mut NavHost<'_, S>,
        position: i64,
        length: i64,
        header_expanded: bool,
    ) -> NavigationOutcome {
        let margin = self.tuning.top_margin_fraction;
        self.begin(host, position, length, margin, header_expanded)
    }

    /// Navigate to a 1-based line number, anchoring the whole line.
    pub fn navigate_line<S: ScrollSurface>(
        &mut self,
        host: &mut NavHost<'_, S>,
        buffer: &dyn TextBuffer,
        line_number: usize,
        header_expanded: bool,
    ) -> NavigationOutcome {
        match line_target(buffer, line_number) {
            Ok(target) => self.navigate(host, target, header_expanded),
            Err(err) => {
                tracing::warn!(target: "nav.navigator", line_number, %err, "line_rejected");
                self.metrics.incr(&self.metrics.rejected_targets);
                NavigationOutcome::Rejected(err)
            }
        }
    }

    /// Navigate with an explicit top margin fraction.
    pub fn navigate_with_margin<S: ScrollSurface>(
        &mut self,
        host: &mut NavHost<'_, S>,
        target: AnchorTarget,
        top_margin_fraction: f64,
        header_expanded: bool,
    ) -> NavigationOutcome {
        let margin = top_margin_fraction.clamp(0.0, 1.0);
        self.begin(host, target.start as i64, target.len as i64, margin, header_expanded)
    }

    fn begin<S: ScrollSurface>(
        &mut self,
        host: &mut NavHost<'_, S>,
        position: i64,
        length: i64,
        top_margin_fraction: f64,
        header_expanded: bool,
    ) -> NavigationOutcome {
        let now = self.clock.now();
        // Last-writer-wins: drop any previous session and pending deferral
        // before new state is installed.
        self.cancel_session(host.viewport, true);
        self.deferred = None;

        // A header collapsing at the top of the viewport would make us
        // compute geometry against a pre-collapse layout and then reposition
        // twice; wait out the collapse instead.
        if header_expanded && host.viewport.visible_rect().top() <= 0.0 {
            self.deferred = Some(DeferredNavigation {
                position,
                length,
                top_margin_fraction,
                due: now + self.tuning.header_defer,
            });
            self.metrics.incr(&self.metrics.deferred_navigations);
            tracing::debug!(
                target: "nav.navigator",
                position,
                length,
                defer_ms = self.tuning.header_defer.as_millis() as u64,
                "navigation_deferred"
            );
            return NavigationOutcome::Deferred;
        }

        self.start_session(host, position, length, top_margin_fraction, now)
    }

    fn start_session<S: ScrollSurface>(
        &mut self,
        host: &mut NavHost<'_, S>,
        position: i64,
        length: i64,
        top_margin_fraction: f64,
        now: Instant,
    ) -> NavigationOutcome {
        let target =
            match AnchorTarget::clamp_to_buffer(position, length, host.engine.buffer_len()) {
                Ok(target) => target,
                Err(err) => {
                    tracing::warn!(target: "nav.navigator", position, length, %err, "target_rejected");
                    self.metrics.incr(&self.metrics.rejected_targets);
                    return NavigationOutcome::Rejected(err);
                }
            };
        let anchor = match GeometryResolver::resolve(host.engine, target) {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!(target: "nav.navigator", %err, "geometry_rejected");
                self.metrics.incr(&self.metrics.rejected_targets);
                return NavigationOutcome::Rejected(err);
            }
        };

        let visible = host.viewport.visible_rect();
        let zone = optimal_zone(&visible, self.tuning.optimal_zone_fraction);
        let scrolled = if anchor_acceptable(&anchor, &zone) {
            // Already well-placed; scrolling anyway would only add jitter.
            false
        } else {
            let y = anchor.top() - visible.size.height * top_margin_fraction;
            let point = Point::new(visible.origin.x, y);
            // Immediate correction first so the anchor is never transiently
            // off-screen, then an animated micro-scroll to the same point as
            // visible confirmation that something moved.
            host.viewport.scroll_to(point, false);
            host.viewport.scroll_to(point, true);
            true
        };

        host.caret.set_caret(target.start);
        self.highlight
            .flash(host.styles, target.start, target.len, self.highlight_color, now);

        let baseline = host.viewport.visible_rect().size;
        self.session = Some(NavigationSession::new(
            target,
            top_margin_fraction,
            now,
            baseline,
        ));
        self.scheduler = Some(ConvergenceScheduler::new(&self.tuning));
        host.viewport.set_scrollbar_visible(false);
        self.metrics.incr(&self.metrics.sessions_started);
        tracing::info!(
            target: "nav.navigator",
            start = target.start,
            len = target.len,
            scrolled,
            "session_started"
        );
        NavigationOutcome::Started { scrolled }
    }

    /// One driver tick: run a due deferred navigation, advance the highlight
    /// fade, and advance the convergence scheduler. Returns `true` while
    /// more ticks are needed.
    pub fn tick<S: ScrollSurface>(&mut self, host: &mut NavHost<'_, S>) -> bool {
        let now = self.clock.now();

        match self.deferred {
            Some(deferred) if now >= deferred.due => {
                self.deferred = None;
                let _ = self.start_session(
                    host,
                    deferred.position,
                    deferred.length,
                    deferred.top_margin_fraction,
                    now,
                );
            }
            _ => {}
        }

        self.highlight.advance(host.styles, now);

        let mut finished = false;
        if let (Some(session), Some(scheduler)) =
            (self.session.as_mut(), self.scheduler.as_mut())
        {
            finished = matches!(
                scheduler.tick(session, host, &self.metrics),
                TickOutcome::Finished
            );
        }
        if finished {
            self.end_session(host.viewport);
        }
        !self.is_idle()
    }

    /// Explicit teardown (hosting view going away): cancel the scheduler,
    /// restore the previous styling and scrollbar immediately.
    pub fn teardown<S: ScrollSurface>(&mut self, host: &mut NavHost<'_, S>) {
        self.deferred = None;
        self.cancel_session(host.viewport, false);
        self.highlight.cancel(host.styles);
    }

    fn end_session<S: ScrollSurface>(&mut self, viewport: &mut ViewportController<S>) {
        if let Some(mut session) = self.session.take() {
            session.active = false;
            self.scheduler = None;
            viewport.set_scrollbar_visible(true);
            self.metrics.incr(&self.metrics.sessions_completed);
            tracing::info!(
                target: "nav.navigator",
                ticks = session.tick_count,
                "session_finished"
            );
        }
    }

    fn cancel_session<S: ScrollSurface>(
        &mut self,
        viewport: &mut ViewportController<S>,
        preempted: bool,
    ) {
        if let Some(mut session) = self.session.take() {
            session.active = false;
            self.scheduler = None;
            viewport.set_scrollbar_visible(true);
            if preempted {
                self.metrics.incr(&self.metrics.sessions_preempted);
                tracing::debug!(target: "nav.navigator", "session_preempted");
            }
        }
    }
}

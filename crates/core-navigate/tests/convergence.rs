//! Convergence scheduler behavior under layout churn, preemption, and
//! teardown.

mod common;

use common::Harness;
use core_geometry::{AnchorTarget, Point, Size};
use core_navigate::{
    ConvergenceScheduler, NavHost, NavMetrics, NavTuning, NavigationOutcome, NavigationSession,
    TickOutcome,
};
use std::time::Instant;

#[test]
fn drift_is_corrected_on_next_tick() {
    let mut h = Harness::new(500, 100.0);
    h.navigate_chars(300, 10);
    h.complete_animation();

    // Unrelated reflow shifts all content down by 40 units; the anchor is
    // now outside the OptimalZone.
    h.engine.y_offset = 40.0;
    h.advance_and_tick();

    // Corrective scroll re-anchors against the shifted geometry: the anchor
    // top (340) lands 15 units below the new visible top.
    assert_eq!(
        h.viewport.surface().immediate_scrolls,
        vec![Point::new(0.0, 285.0), Point::new(0.0, 325.0)]
    );
    assert_eq!(h.nav.metrics().corrective_scrolls, 1);

    // Geometry now stable; the rest of the budget adds no scrolls.
    h.run_to_idle(120);
    assert_eq!(h.viewport.surface().immediate_scrolls.len(), 2);
    assert_eq!(h.nav.metrics().sessions_completed, 1);
}

#[test]
fn scheduler_terminates_within_budget_despite_constant_churn() {
    let mut h = Harness::new(500, 100.0);
    h.navigate_chars(300, 10);
    h.complete_animation();

    // Perturb geometry before every single tick; the session must still die
    // at the fixed tick budget.
    let mut session_ticks = 0usize;
    let mut sign = 1.0;
    while h.nav.session().is_some() {
        assert!(session_ticks < 95, "scheduler exceeded its tick budget");
        h.engine.y_offset += 25.0 * sign;
        sign = -sign;
        h.advance_and_tick();
        session_ticks += 1;
    }
    assert_eq!(session_ticks, 90, "terminates exactly at the two-phase budget");
    assert_eq!(h.nav.metrics().sessions_completed, 1);
    // Highlight may outlive nothing here (3s of ticks > 1.2s fade); idle.
    h.run_to_idle(10);
}

#[test]
fn container_resize_forces_reposition_even_inside_zone() {
    let mut h = Harness::new(500, 100.0);
    h.navigate_chars(300, 10);
    h.complete_animation();
    h.advance_and_tick();
    let scrolls_before = h.viewport.surface().immediate_scrolls.len();

    // Shrink the viewport by 20 units (> threshold). The anchor still reads
    // as acceptable against the new zone, but the zone was computed against
    // dead geometry, so a reposition is forced.
    h.viewport.surface_mut().viewport = Size::new(common::CONTENT_WIDTH, 80.0);
    h.advance_and_tick();
    assert_eq!(h.nav.metrics().forced_repositions, 1);
    assert_eq!(h.viewport.surface().immediate_scrolls.len(), scrolls_before + 1);
    // Anchor top (300) now rests 80 * 0.15 = 12 units below the visible top.
    assert_eq!(
        h.viewport.surface().immediate_scrolls.last(),
        Some(&Point::new(0.0, 288.0))
    );

    // Baseline was reset to the new extent: the same size is not charged as
    // drift again.
    h.advance_and_tick();
    assert_eq!(h.nav.metrics().forced_repositions, 1);
    assert_eq!(h.viewport.surface().immediate_scrolls.len(), scrolls_before + 1);
}

#[test]
fn small_extent_change_below_threshold_is_ignored() {
    let mut h = Harness::new(500, 100.0);
    h.navigate_chars(300, 10);
    h.complete_animation();
    h.advance_and_tick();
    let scrolls_before = h.viewport.surface().immediate_scrolls.len();

    h.viewport.surface_mut().viewport = Size::new(common::CONTENT_WIDTH, 95.0);
    h.advance_and_tick();
    assert_eq!(h.nav.metrics().forced_repositions, 0);
    assert_eq!(h.viewport.surface().immediate_scrolls.len(), scrolls_before);
}

#[test]
fn new_navigation_preempts_active_session() {
    let mut h = Harness::new(500, 100.0);
    h.navigate_chars(300, 10);
    h.advance_and_tick();
    h.advance_and_tick();

    let outcome = h.navigate_chars(50, 5);
    assert!(matches!(outcome, NavigationOutcome::Started { .. }));
    assert_eq!(h.nav.metrics().sessions_preempted, 1);
    assert_eq!(h.nav.session().map(|s| s.target), Some(AnchorTarget::new(50, 5)));
    // Scrollbar: suppressed by A, restored on preemption, suppressed by B.
    assert_eq!(h.viewport.surface().scrollbar_events, vec![false, true, false]);

    h.complete_animation();
    h.run_to_idle(200);
    assert!(!h.viewport.flag().is_self_initiated(), "no leaked flag holds");
    let m = h.nav.metrics();
    assert_eq!(m.sessions_started, 2);
    assert_eq!(m.sessions_completed, 1, "preempted session never completes");
}

#[test]
fn orphaned_tick_is_a_silent_noop() {
    let mut h = Harness::new(100, 50.0);
    let mut session = NavigationSession::new(
        AnchorTarget::new(10, 5),
        0.15,
        Instant::now(),
        Size::new(100.0, 50.0),
    );
    session.active = false;
    let mut scheduler = ConvergenceScheduler::new(&NavTuning::default());
    let metrics = NavMetrics::default();
    let mut host = NavHost {
        engine: &mut h.engine,
        viewport: &mut h.viewport,
        styles: &mut h.styles,
        caret: &mut h.caret,
    };
    assert_eq!(
        scheduler.tick(&mut session, &mut host, &metrics),
        TickOutcome::Finished
    );
    assert_eq!(scheduler.ticks(), 0, "orphaned tick consumes no budget");
    assert!(h.viewport.surface().immediate_scrolls.is_empty());
}

#[test]
fn teardown_cancels_session_and_restores_state() {
    let mut h = Harness::new(500, 100.0);
    let before = h.styles.chars[300].clone();
    h.navigate_chars(300, 10);
    h.complete_animation();
    h.advance_and_tick();

    h.teardown();
    assert!(h.nav.is_idle());
    assert_eq!(h.viewport.surface().scrollbar_events, vec![false, true]);
    assert_eq!(h.styles.chars[300], before, "highlight restored on teardown");
    // Further ticks are inert.
    assert!(!h.tick());
}

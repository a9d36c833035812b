//! Transient highlight flash with exact style restoration.
//!
//! Applies a background emphasis to a character range, holds it, then steps
//! the emphasis down over a short fade window. The final fade step does not
//! interpolate: it restores the snapshot taken before the flash began, over
//! the whole range, so no attribute channel can leak past the animation.
//!
//! The animator is timer-free: it is a step plan advanced by
//! [`HighlightAnimator::advance`] with caller-supplied instants. Hosts drive
//! it from their tick source; tests fast-forward simulated time.
//!
//! Known limitation (carried from the design): the snapshot is taken at the
//! range start and the stored range is restored verbatim even if the
//! underlying content changed mid-fade.

use std::time::{Duration, Instant};

/// RGBA color. Alpha carries the emphasis opacity during fade steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Scale alpha by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

/// Full attribute set for one character position. Restoration compares and
/// reapplies every field, not just the background.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleAttrs {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// Seam to the styled text store owned by the editing surface.
pub trait StyleTarget {
    /// Attributes currently in effect at `offset`.
    fn attributes_at(&self, offset: usize) -> StyleAttrs;
    /// Apply `attrs` uniformly over `[start, start + len)`.
    fn apply_attributes(&mut self, start: usize, len: usize, attrs: &StyleAttrs);
    /// Apply the highlight background at the given opacity over the range,
    /// leaving non-background channels alone.
    fn apply_highlight(&mut self, start: usize, len: usize, color: Color, opacity: f64);
}

/// Timing shape of one flash: constant hold, then `steps` discrete fade
/// steps spread evenly across `fade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadePlan {
    pub hold: Duration,
    pub fade: Duration,
    pub steps: u32,
}

impl Default for FadePlan {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(800),
            fade: Duration::from_millis(400),
            steps: 5,
        }
    }
}

impl FadePlan {
    pub fn total(&self) -> Duration {
        self.hold + self.fade
    }

    fn step_interval(&self) -> Duration {
        self.fade / self.steps.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashPhase {
    Hold,
    /// `completed` fade steps already applied (0-based; the plan's final
    /// step restores the snapshot instead of stepping opacity).
    Fade { completed: u32 },
}

#[derive(Debug)]
struct Flash {
    start: usize,
    len: usize,
    color: Color,
    snapshot: StyleAttrs,
    phase: FlashPhase,
    next_due: Instant,
}

/// Drives one highlight flash at a time. A new flash preempts the previous
/// one by restoring its snapshot first, so ranges never accumulate stale
/// emphasis.
#[derive(Debug, Default)]
pub struct HighlightAnimator {
    plan: FadePlan,
    active: Option<Flash>,
}

impl HighlightAnimator {
    pub fn new(plan: FadePlan) -> Self {
        Self { plan, active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Instant of the next pending step, if a flash is active.
    pub fn next_due(&self) -> Option<Instant> {
        self.active.as_ref().map(|f| f.next_due)
    }

    /// Begin a flash over `[start, start + len)`.
    ///
    /// Snapshots the attributes at the range start, applies the full-opacity
    /// highlight, and schedules the hold expiry relative to `now`. An empty
    /// range has no character to snapshot or emphasize, so it only cancels
    /// any previous flash.
    pub fn flash(
        &mut self,
        target: &mut dyn StyleTarget,
        start: usize,
        len: usize,
        color: Color,
        now: Instant,
    ) {
        self.cancel(target);
        if len == 0 {
            return;
        }
        let snapshot = target.attributes_at(start);
        target.apply_highlight(start, len, color, 1.0);
        tracing::debug!(
            target: "nav.highlight",
            start,
            len,
            hold_ms = self.plan.hold.as_millis() as u64,
            fade_ms = self.plan.fade.as_millis() as u64,
            "flash_begin"
        );
        self.active = Some(Flash {
            start,
            len,
            color,
            snapshot,
            phase: FlashPhase::Hold,
            next_due: now + self.plan.hold,
        });
    }

    /// Advance the flash to `now`, applying every step that has come due.
    /// Returns `true` while a flash remains active.
    pub fn advance(&mut self, target: &mut dyn StyleTarget, now: Instant) -> bool {
        while let Some(flash) = self.active.as_mut() {
            if now < flash.next_due {
                return true;
            }
            match flash.phase {
                FlashPhase::Hold => {
                    flash.phase = FlashPhase::Fade { completed: 0 };
                    flash.next_due += self.plan.step_interval();
                }
                FlashPhase::Fade { completed } => {
                    let step = completed + 1;
                    if step >= self.plan.steps {
                        // Final step: restore the snapshot across the whole
                        // range rather than interpolating to zero.
                        let start = flash.start;
                        let len = flash.len;
                        let snapshot = flash.snapshot.clone();
                        self.active = None;
                        target.apply_attributes(start, len, &snapshot);
                        tracing::debug!(
                            target: "nav.highlight",
                            start,
                            len,
                            "flash_restored"
                        );
                        return false;
                    }
                    let opacity = 1.0 - step as f64 / self.plan.steps as f64;
                    target.apply_highlight(flash.start, flash.len, flash.color, opacity);
                    flash.phase = FlashPhase::Fade { completed: step };
                    flash.next_due += self.plan.step_interval();
                }
            }
        }
        false
    }

    /// Abort any in-flight flash, restoring its snapshot immediately.
    pub fn cancel(&mut self, target: &mut dyn StyleTarget) {
        if let Some(flash) = self.active.take() {
            target.apply_attributes(flash.start, flash.len, &flash.snapshot);
            tracing::debug!(
                target: "nav.highlight",
                start = flash.start,
                len = flash.len,
                "flash_cancelled"
            );
        }
    }
}

//! Geometry resolution against the external layout engine.
//!
//! The resolver is stateless: every call re-validates the target against the
//! engine's current buffer length (the buffer may have grown or shrunk since
//! the target was issued) and forces any pending layout pass to completion
//! before measuring. Measuring against stale geometry is the one failure mode
//! this module exists to prevent.

use crate::{AnchorTarget, NavError, Rect, Size};

/// Seam to the external text layout collaborator.
///
/// Implementations own the line-breaking / glyph-shaping machinery; this
/// subsystem only asks for the bounding rectangle of a character range and
/// the total content extent. `ensure_layout` must be synchronous and bounded
/// (a single target range is measured per call).
pub trait LayoutEngine {
    /// Force any pending layout pass to completion so subsequent geometry
    /// queries observe current positions.
    fn ensure_layout(&mut self);

    /// Bounding rectangle for `target` in content coordinates, or `None`
    /// when no rectangle can be produced (empty buffer, detached container).
    fn rect_for_range(&self, target: AnchorTarget) -> Option<Rect>;

    /// Total content size in content coordinates.
    fn content_size(&self) -> Size;

    /// Current character length of the backing buffer.
    fn buffer_len(&self) -> usize;
}

/// Stateless mapping from a character range to a content-space rectangle.
pub struct GeometryResolver;

impl GeometryResolver {
    /// Resolve `target` to its bounding rectangle.
    ///
    /// Re-clamps the target against the engine's current buffer length (see
    /// [`AnchorTarget::clamp_to_buffer`]), forces a layout pass, then
    /// measures. Errors map 1:1 onto the subsystem taxonomy: out-of-bounds
    /// start is `InvalidTarget`, a missing rectangle is
    /// `GeometryUnavailable`.
    pub fn resolve(
        engine: &mut dyn LayoutEngine,
        target: AnchorTarget,
    ) -> Result<Rect, NavError> {
        let clamped = AnchorTarget::clamp_to_buffer(
            target.start as i64,
            target.len as i64,
            engine.buffer_len(),
        )?;
        engine.ensure_layout();
        match engine.rect_for_range(clamped) {
            Some(rect) => {
                tracing::trace!(
                    target: "nav.resolver",
                    start = clamped.start,
                    len = clamped.len,
                    top = rect.top(),
                    height = rect.size.height,
                    "anchor_resolved"
                );
                Ok(rect)
            }
            None => {
                tracing::debug!(
                    target: "nav.resolver",
                    start = clamped.start,
                    len = clamped.len,
                    "geometry_unavailable"
                );
                Err(NavError::GeometryUnavailable)
            }
        }
    }
}

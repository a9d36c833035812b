//! Geometry primitives and anchor targets.
//!
//! Leaf crate: value types shared by the viewport and navigation layers plus
//! the `LayoutEngine` seam to the external text layout collaborator. All
//! coordinates are content-space `f64` units; rectangles are origin + size
//! with `y` growing downward (top of content is `y = 0`).
//!
//! Invariants:
//! * `AnchorTarget` is immutable once constructed; construction via
//!   [`AnchorTarget::clamp_to_buffer`] guarantees `start + len <= buffer_len`
//!   and, for non-empty targets, `start < buffer_len`.
//! * `Rect` never carries negative sizes; constructors clamp to zero.

mod resolver;
pub use resolver::{GeometryResolver, LayoutEngine};

use thiserror::Error;

/// A point in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Largest per-dimension absolute difference between two sizes. Used by
    /// the convergence scheduler to detect major layout changes against a
    /// baseline extent.
    pub fn max_abs_delta(self, other: Size) -> f64 {
        let dw = (self.width - other.width).abs();
        let dh = (self.height - other.height).abs();
        dw.max(dh)
    }
}

/// Axis-aligned rectangle in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width.max(0.0), height.max(0.0)),
        }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn top(&self) -> f64 {
        self.origin.y
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn left(&self) -> f64 {
        self.origin.x
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    /// True when `other` lies entirely inside `self` (closed comparison on
    /// all edges).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// True when the two rectangles share any area (half-open on the
    /// trailing edges so mere edge adjacency does not count).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }
}

/// Character range an in-flight navigation must bring into view.
///
/// Offsets index the buffer's character sequence. The range is immutable for
/// the lifetime of a navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorTarget {
    pub start: usize,
    pub len: usize,
}

impl AnchorTarget {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Validate a raw `(position, length)` pair against the current buffer
    /// length.
    ///
    /// Rules (only the start must be in-bounds):
    /// * negative `position` or `length` is rejected outright;
    /// * a non-empty request must start before `buffer_len`; there is no
    ///   character at the end offset to anchor on;
    /// * an empty request may sit anywhere up to and including `buffer_len`;
    /// * an overlong `length` is clamped to `buffer_len - position`.
    pub fn clamp_to_buffer(
        position: i64,
        length: i64,
        buffer_len: usize,
    ) -> Result<Self, NavError> {
        if position < 0 || length < 0 {
            return Err(NavError::InvalidTarget);
        }
        let start = position as usize;
        if start > buffer_len || (length > 0 && start == buffer_len) {
            return Err(NavError::InvalidTarget);
        }
        let len = (length as usize).min(buffer_len - start);
        Ok(Self { start, len })
    }
}

/// Error taxonomy for the navigation subsystem.
///
/// No variant is fatal to a host: every failure degrades to "no navigation
/// occurred" with the scroll position untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavError {
    /// Position negative, or position beyond the buffer's character length.
    #[error("navigation target out of bounds for buffer")]
    InvalidTarget,
    /// The layout engine could not produce a rectangle (empty buffer,
    /// detached container). Callers are expected to retry once attached.
    #[error("layout engine could not produce a rectangle for the target")]
    GeometryUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges_and_containment() {
        let outer = Rect::new(0.0, 0.0, 100.0, 50.0);
        let inner = Rect::new(10.0, 5.0, 20.0, 10.0);
        assert_eq!(outer.bottom(), 50.0);
        assert_eq!(inner.right(), 30.0);
        assert!(outer.contains_rect(&inner));
        assert!(!inner.contains_rect(&outer));
        assert!(outer.intersects(&inner));
    }

    #[test]
    fn rect_edge_adjacency_does_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn rect_negative_size_clamps_to_zero() {
        let r = Rect::new(0.0, 0.0, -5.0, -1.0);
        assert_eq!(r.size.width, 0.0);
        assert_eq!(r.size.height, 0.0);
    }

    #[test]
    fn size_max_abs_delta_picks_larger_dimension() {
        let a = Size::new(100.0, 40.0);
        let b = Size::new(103.0, 52.0);
        assert_eq!(a.max_abs_delta(b), 12.0);
        assert_eq!(b.max_abs_delta(a), 12.0);
    }

    #[test]
    fn negative_position_rejected() {
        assert_eq!(
            AnchorTarget::clamp_to_buffer(-5, 3, 100),
            Err(NavError::InvalidTarget)
        );
    }

    #[test]
    fn negative_length_rejected() {
        assert_eq!(
            AnchorTarget::clamp_to_buffer(10, -1, 100),
            Err(NavError::InvalidTarget)
        );
    }

    #[test]
    fn start_beyond_buffer_rejected() {
        assert_eq!(
            AnchorTarget::clamp_to_buffer(101, 0, 100),
            Err(NavError::InvalidTarget)
        );
    }

    #[test]
    fn nonempty_target_at_buffer_end_rejected() {
        // There is no character at offset buffer_len to anchor on.
        assert_eq!(
            AnchorTarget::clamp_to_buffer(100, 5, 100),
            Err(NavError::InvalidTarget)
        );
    }

    #[test]
    fn empty_target_at_buffer_end_allowed() {
        let t = AnchorTarget::clamp_to_buffer(100, 0, 100).unwrap();
        assert_eq!(t, AnchorTarget::new(100, 0));
    }

    #[test]
    fn overlong_length_clamps_to_remainder() {
        let t = AnchorTarget::clamp_to_buffer(95, 50, 100).unwrap();
        assert_eq!(t.start, 95);
        assert_eq!(t.len, 5, "length clamps to buffer_len - start");
    }

    #[test]
    fn in_bounds_target_passes_through() {
        let t = AnchorTarget::clamp_to_buffer(300, 10, 500).unwrap();
        assert_eq!(t, AnchorTarget::new(300, 10));
        assert_eq!(t.end(), 310);
    }
}

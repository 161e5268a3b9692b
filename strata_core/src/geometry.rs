// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle helpers.
//!
//! [`kurbo::Rect::union`] treats a zero-sized rectangle at the origin as a
//! real point, which would drag every accumulated damage rect towards
//! `(0, 0)`. The functions here treat any rectangle without positive area as
//! empty: it is the identity of [`union`] and the absorbing element of
//! [`intersect`].

use kurbo::{Rect, Size};

/// Returns `true` if `r` has no positive area (including NaN extents).
#[inline]
#[must_use]
pub fn is_empty(r: Rect) -> bool {
    !(r.width() > 0.0 && r.height() > 0.0)
}

/// Union of two rectangles, ignoring empty operands.
#[inline]
#[must_use]
pub fn union(a: Rect, b: Rect) -> Rect {
    match (is_empty(a), is_empty(b)) {
        (true, true) => Rect::ZERO,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.union(b),
    }
}

/// Intersection of two rectangles; [`Rect::ZERO`] if they do not overlap.
#[inline]
#[must_use]
pub fn intersect(a: Rect, b: Rect) -> Rect {
    let r = a.intersect(b);
    if is_empty(r) { Rect::ZERO } else { r }
}

/// Returns `true` if the two rectangles share positive area.
#[inline]
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    !is_empty(a.intersect(b))
}

/// Returns `true` if `outer` fully covers `inner`. An empty `inner` is
/// contained by anything.
#[inline]
#[must_use]
pub fn contains(outer: Rect, inner: Rect) -> bool {
    if is_empty(inner) {
        return true;
    }
    !is_empty(outer)
        && outer.x0 <= inner.x0
        && outer.y0 <= inner.y0
        && outer.x1 >= inner.x1
        && outer.y1 >= inner.y1
}

/// Smallest integer-aligned rectangle covering `r`.
#[inline]
#[must_use]
pub fn enclosing(r: Rect) -> Rect {
    if is_empty(r) { Rect::ZERO } else { r.expand() }
}

/// Largest integer-aligned rectangle inside `r`.
#[inline]
#[must_use]
pub fn enclosed(r: Rect) -> Rect {
    if is_empty(r) {
        return Rect::ZERO;
    }
    let t = r.trunc();
    if is_empty(t) { Rect::ZERO } else { t }
}

/// A rectangle at the origin with the given size.
#[inline]
#[must_use]
pub fn rect_of_size(size: Size) -> Rect {
    Rect::from_origin_size((0.0, 0.0), size)
}

/// Pixel outsets on each edge of a rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Outsets {
    /// Outset above the top edge.
    pub top: f64,
    /// Outset beyond the right edge.
    pub right: f64,
    /// Outset below the bottom edge.
    pub bottom: f64,
    /// Outset beyond the left edge.
    pub left: f64,
}

impl Outsets {
    /// No outset on any edge.
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    /// Returns `true` if every edge is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    /// Grows `r` by these outsets. Empty rectangles stay empty.
    #[must_use]
    pub fn expand(&self, r: Rect) -> Rect {
        if is_empty(r) {
            return Rect::ZERO;
        }
        Rect::new(
            r.x0 - self.left,
            r.y0 - self.top,
            r.x1 + self.right,
            r.y1 + self.bottom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_empty() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(union(Rect::ZERO, r), r);
        assert_eq!(union(r, Rect::ZERO), r);
        assert_eq!(union(Rect::ZERO, Rect::ZERO), Rect::ZERO);
        assert_eq!(
            union(r, Rect::new(30.0, 0.0, 40.0, 5.0)),
            Rect::new(10.0, 0.0, 40.0, 20.0)
        );
    }

    #[test]
    fn disjoint_intersection_is_zero() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(intersect(a, b), Rect::ZERO);
        assert!(!intersects(a, b));
        assert!(intersects(a, Rect::new(5.0, 5.0, 15.0, 15.0)));
    }

    #[test]
    fn containment() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(contains(outer, Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(contains(outer, outer));
        assert!(!contains(outer, Rect::new(90.0, 90.0, 110.0, 100.0)));
        assert!(contains(Rect::ZERO, Rect::ZERO));
    }

    #[test]
    fn enclosing_and_enclosed_round_outward_and_inward() {
        let r = Rect::new(0.5, 0.5, 9.5, 9.5);
        assert_eq!(enclosing(r), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(enclosed(r), Rect::new(1.0, 1.0, 9.0, 9.0));
        assert_eq!(enclosed(Rect::new(0.2, 0.2, 0.8, 0.8)), Rect::ZERO);
    }

    #[test]
    fn outsets_expand() {
        let o = Outsets {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0,
        };
        assert_eq!(
            o.expand(Rect::new(10.0, 10.0, 20.0, 20.0)),
            Rect::new(6.0, 9.0, 22.0, 23.0)
        );
        assert_eq!(o.expand(Rect::ZERO), Rect::ZERO);
        assert!(Outsets::ZERO.is_zero());
    }
}

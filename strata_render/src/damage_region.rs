// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Output-level damage handed to the presenter.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Rect;
use strata_core::geometry;

/// A region of the output that needs re-rendering.
///
/// Presenters can use this to only redraw and swap the areas that changed
/// since the last frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DamageRegion {
    /// The entire output needs redrawing.
    #[default]
    Full,
    /// Axis-aligned rectangles, in output pixels.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame can be reused.
    None,
}

impl DamageRegion {
    /// Classifies the root surface's damage against the viewport.
    #[must_use]
    pub fn from_root_damage(damage: Rect, viewport: Rect) -> Self {
        let damage = geometry::intersect(damage, viewport);
        if geometry::is_empty(damage) {
            Self::None
        } else if geometry::contains(damage, viewport) {
            Self::Full
        } else {
            Self::Rects(vec![damage])
        }
    }

    /// Returns `true` if no region needs redrawing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Bounding rect of the damage, using `viewport` for [`Full`](Self::Full).
    #[must_use]
    pub fn bounds(&self, viewport: Rect) -> Rect {
        match self {
            Self::Full => viewport,
            Self::Rects(rects) => rects
                .iter()
                .fold(Rect::ZERO, |acc, r| geometry::union(acc, *r)),
            Self::None => Rect::ZERO,
        }
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (_, Self::None) => {}
            (Self::Rects(a), Self::Rects(b)) => {
                let mut merged = a.clone();
                merged.extend_from_slice(b);
                *self = Self::Rects(merged);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);

    #[test]
    fn classification() {
        assert_eq!(DamageRegion::from_root_damage(Rect::ZERO, VIEWPORT), DamageRegion::None);
        assert_eq!(
            DamageRegion::from_root_damage(Rect::new(-5.0, -5.0, 120.0, 120.0), VIEWPORT),
            DamageRegion::Full
        );
        assert_eq!(
            DamageRegion::from_root_damage(Rect::new(90.0, 90.0, 120.0, 120.0), VIEWPORT),
            DamageRegion::Rects(vec![Rect::new(90.0, 90.0, 100.0, 100.0)]),
            "clipped to the viewport"
        );
    }

    #[test]
    fn merge_prefers_full() {
        let mut d = DamageRegion::None;
        d.merge(&DamageRegion::Rects(vec![Rect::new(0.0, 0.0, 1.0, 1.0)]));
        d.merge(&DamageRegion::Rects(vec![Rect::new(5.0, 5.0, 6.0, 6.0)]));
        assert_eq!(d.bounds(VIEWPORT), Rect::new(0.0, 0.0, 6.0, 6.0));
        d.merge(&DamageRegion::Full);
        assert_eq!(d, DamageRegion::Full);
        assert!(!d.is_empty());
    }
}

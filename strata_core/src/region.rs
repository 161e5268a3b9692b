// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A set of pixels represented as disjoint rectangles.
//!
//! Occlusion tracking needs real set algebra: two opaque layers side by side
//! cover their union, not its bounding box. [`Region`] stores pairwise
//! disjoint rectangles so that containment and subtraction are exact.
//! Complexity is capped with [`Region::limit_complexity`], which only ever
//! removes area, so a capped region under-approximates the original.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::geometry;
use crate::transform::Transform3d;

/// Parts of `a` not covered by `b`, as up to four disjoint bands.
fn subtract_rect_pieces(a: Rect, b: Rect) -> [Option<Rect>; 4] {
    let i = geometry::intersect(a, b);
    if geometry::is_empty(i) {
        return [Some(a), None, None, None];
    }
    let keep = |r: Rect| (!geometry::is_empty(r)).then_some(r);
    [
        keep(Rect::new(a.x0, a.y0, a.x1, i.y0)),
        keep(Rect::new(a.x0, i.y1, a.x1, a.y1)),
        keep(Rect::new(a.x0, i.y0, i.x0, i.y1)),
        keep(Rect::new(i.x1, i.y0, a.x1, i.y1)),
    ]
}

/// A union of pairwise disjoint rectangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// The empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// A region covering exactly `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    /// Returns `true` if the region covers no area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The disjoint rectangles making up the region, in no particular order.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Smallest rectangle covering the region.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::ZERO, |acc, r| geometry::union(acc, *r))
    }

    /// Total covered area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Adds `rect` to the region.
    pub fn union_rect(&mut self, rect: Rect) {
        if geometry::is_empty(rect) {
            return;
        }
        let mut pieces = Vec::from([rect]);
        for existing in &self.rects {
            if pieces.is_empty() {
                return;
            }
            pieces = pieces
                .into_iter()
                .flat_map(|p| subtract_rect_pieces(p, *existing))
                .flatten()
                .collect();
        }
        self.rects.extend(pieces);
    }

    /// Adds every rectangle of `other`.
    pub fn union_region(&mut self, other: &Self) {
        for r in &other.rects {
            self.union_rect(*r);
        }
    }

    /// Removes `rect` from the region.
    pub fn subtract_rect(&mut self, rect: Rect) {
        if geometry::is_empty(rect) || self.rects.is_empty() {
            return;
        }
        self.rects = self
            .rects
            .iter()
            .flat_map(|r| subtract_rect_pieces(*r, rect))
            .flatten()
            .collect();
    }

    /// Removes every rectangle of `other`.
    pub fn subtract_region(&mut self, other: &Self) {
        for r in &other.rects {
            self.subtract_rect(*r);
        }
    }

    /// Keeps only the part of the region inside `rect`.
    pub fn intersect_rect(&mut self, rect: Rect) {
        self.rects = self
            .rects
            .iter()
            .map(|r| geometry::intersect(*r, rect))
            .filter(|r| !geometry::is_empty(*r))
            .collect();
    }

    /// Returns `true` if every point of `rect` is inside the region.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        if geometry::is_empty(rect) {
            return true;
        }
        let mut remaining = Self::from_rect(rect);
        remaining.subtract_region(self);
        remaining.is_empty()
    }

    /// Returns `true` if the region shares any area with `rect`.
    #[must_use]
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| geometry::intersects(*r, rect))
    }

    /// Drops the smallest rectangles until at most `max_rects` remain.
    pub fn limit_complexity(&mut self, max_rects: usize) {
        if self.rects.len() <= max_rects {
            return;
        }
        self.rects
            .sort_by(|a, b| b.area().total_cmp(&a.area()));
        self.rects.truncate(max_rects);
    }

    /// Maps the region through `transform`, rounding each rectangle inward.
    ///
    /// Returns `None` if the transform does not preserve axis alignment, in
    /// which case no exact rectangle mapping exists.
    #[must_use]
    pub fn transformed(&self, transform: &Transform3d) -> Option<Self> {
        if transform.is_identity() {
            return Some(self.clone());
        }
        if !transform.preserves_2d_axis_alignment() {
            return None;
        }
        let mut out = Self::new();
        for r in &self.rects {
            if let Some(mapped) = transform.map_enclosed_axis_aligned(*r) {
                out.union_rect(mapped);
            }
        }
        Some(out)
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform with rectangle mapping.
//!
//! Layers carry full 4×4 transforms, but damage and occlusion only ever work
//! on the 2-D projection. The mapping helpers here flatten to a
//! [`kurbo::Affine`] whenever the matrix has no perspective row, and refuse
//! (return `None`) when an exact 2-D answer is not available.

use core::ops::Mul;

use kurbo::{Affine, Point, Rect, Vec2};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::geometry;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a 2-D translation from a vector.
    #[inline]
    #[must_use]
    pub const fn from_offset(v: Vec2) -> Self {
        Self::from_translation(v.x, v.y, 0.0)
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Embeds a 2-D affine transform.
    #[must_use]
    pub fn from_affine(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self {
            cols: [
                [a, b, 0.0, 0.0],
                [c, d, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [e, f, 0.0, 1.0],
            ],
        }
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Returns `true` for the exact identity matrix.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns `true` if the matrix is the identity apart from its
    /// translation column.
    #[must_use]
    pub fn is_identity_or_translation(&self) -> bool {
        let c = &self.cols;
        c[0] == [1.0, 0.0, 0.0, 0.0]
            && c[1] == [0.0, 1.0, 0.0, 0.0]
            && c[2] == [0.0, 0.0, 1.0, 0.0]
            && c[3][3] == 1.0
    }

    /// The x/y translation.
    #[inline]
    #[must_use]
    pub fn translation_2d(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Returns `true` if the matrix has no perspective row, so points on the
    /// z = 0 plane map without a homogeneous divide.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        let c = &self.cols;
        c[0][3] == 0.0 && c[1][3] == 0.0 && c[2][3] == 0.0 && c[3][3] == 1.0
    }

    /// The 2-D projection of this transform, if it has no perspective.
    #[must_use]
    pub fn to_affine(&self) -> Option<Affine> {
        if !self.is_flat() {
            return None;
        }
        let c = &self.cols;
        Some(Affine::new([c[0][0], c[0][1], c[1][0], c[1][1], c[3][0], c[3][1]]))
    }

    /// Returns `true` if axis-aligned rectangles stay axis-aligned after
    /// mapping (only scales, translations and quarter-turn rotations).
    #[must_use]
    pub fn preserves_2d_axis_alignment(&self) -> bool {
        let Some(affine) = self.to_affine() else {
            return false;
        };
        let [a, b, c, d, _, _] = affine.as_coeffs();
        (b == 0.0 && c == 0.0) || (a == 0.0 && d == 0.0)
    }

    /// Returns `true` if the 2-D part can be inverted.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.to_affine()
            .is_some_and(|a| a.determinant() != 0.0 && a.determinant().is_finite())
    }

    /// Inverse of the 2-D projection, if there is one.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let affine = self.to_affine()?;
        let det = affine.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self::from_affine(affine.inverse()))
    }

    /// Maps a point on the z = 0 plane. Returns `None` when the point lands
    /// behind the viewer (w ≤ 0).
    #[must_use]
    pub fn map_point(&self, p: Point) -> Option<Point> {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w <= 0.0 {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }

    /// Bounding box of `rect` after mapping.
    ///
    /// Returns `None` if any corner lands behind the viewer. Empty input maps
    /// to [`Rect::ZERO`].
    #[must_use]
    pub fn map_rect_bounds(&self, rect: Rect) -> Option<Rect> {
        if geometry::is_empty(rect) {
            return Some(Rect::ZERO);
        }
        if let Some(affine) = self.to_affine() {
            return Some(affine.transform_rect_bbox(rect));
        }
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x0, rect.y1),
            Point::new(rect.x1, rect.y1),
        ];
        let mut out = Rect::ZERO;
        for corner in corners {
            let p = self.map_point(corner)?;
            let r = Rect::from_points(p, p);
            out = if out == Rect::ZERO {
                r
            } else {
                out.union(r)
            };
        }
        Some(out)
    }

    /// Bounding box of `rect` after mapping, or `fallback` when no finite
    /// bounds exist.
    #[must_use]
    pub fn map_rect_or(&self, rect: Rect, fallback: Rect) -> Rect {
        self.map_rect_bounds(rect).unwrap_or(fallback)
    }

    /// Maps `rect` exactly and shrinks the result to whole pixels.
    ///
    /// Returns `None` unless the transform preserves 2-D axis alignment, in
    /// which case the mapped rectangle is exactly the mapped area.
    #[must_use]
    pub fn map_enclosed_axis_aligned(&self, rect: Rect) -> Option<Rect> {
        if !self.preserves_2d_axis_alignment() {
            return None;
        }
        let affine = self.to_affine()?;
        Some(geometry::enclosed(affine.transform_rect_bbox(rect)))
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        assert_eq!((a * b).translation_2d(), Vec2::new(1.0, 2.0));
        assert!((a * b).is_identity_or_translation());
    }

    #[test]
    fn scale_then_translate_maps_rect() {
        let s = Transform3d::from_scale(2.0, 2.0, 1.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        let combined = t * s;
        assert_eq!(
            combined.map_rect_bounds(Rect::new(0.0, 0.0, 10.0, 5.0)),
            Some(Rect::new(3.0, 4.0, 23.0, 14.0))
        );
    }

    #[test]
    fn affine_round_trip() {
        let affine = Affine::new([2.0, 0.0, 0.0, 3.0, 5.0, 7.0]);
        let t = Transform3d::from_affine(affine);
        assert_eq!(t.to_affine(), Some(affine));
    }

    #[test]
    fn axis_alignment() {
        assert!(Transform3d::IDENTITY.preserves_2d_axis_alignment());
        assert!(Transform3d::from_scale(2.0, 0.5, 1.0).preserves_2d_axis_alignment());
        let quarter = Transform3d::from_affine(Affine::new([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]));
        assert!(quarter.preserves_2d_axis_alignment());
        let tilted = Transform3d::from_rotation_z(0.3);
        assert!(
            !tilted.preserves_2d_axis_alignment(),
            "a non-right-angle rotation must not be treated as axis-aligned"
        );
        assert_eq!(tilted.map_enclosed_axis_aligned(Rect::new(0.0, 0.0, 1.0, 1.0)), None);
    }

    #[test]
    fn perspective_is_not_flat() {
        let mut t = Transform3d::IDENTITY;
        t.cols[0][3] = 0.01;
        assert!(!t.is_flat());
        assert_eq!(t.to_affine(), None);
        assert!(!t.preserves_2d_axis_alignment());
    }

    #[test]
    fn behind_viewer_has_no_bounds() {
        let mut t = Transform3d::IDENTITY;
        t.cols[3][3] = -1.0;
        assert_eq!(t.map_rect_bounds(Rect::new(0.0, 0.0, 10.0, 10.0)), None);
        let fallback = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(t.map_rect_or(Rect::new(0.0, 0.0, 10.0, 10.0), fallback), fallback);
    }

    #[test]
    fn inverse_undoes_mapping() {
        let t = Transform3d::from_translation(10.0, 20.0, 0.0) * Transform3d::from_scale(2.0, 4.0, 1.0);
        let inv = t.inverse().expect("scale + translation is invertible");
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        let mapped = t.map_rect_bounds(r).unwrap();
        assert_eq!(inv.map_rect_bounds(mapped), Some(r));
        assert_eq!(Transform3d::from_scale(0.0, 1.0, 1.0).inverse(), None);
    }

    #[test]
    fn enclosed_mapping_rounds_inward() {
        let t = Transform3d::from_translation(0.5, 0.5, 0.0);
        assert_eq!(
            t.map_enclosed_axis_aligned(Rect::new(0.0, 0.0, 10.0, 10.0)),
            Some(Rect::new(1.0, 1.0, 10.0, 10.0))
        );
    }

    #[test]
    fn nan_is_not_finite() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(Transform3d::IDENTITY.is_finite());
    }
}

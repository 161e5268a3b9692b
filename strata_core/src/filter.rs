// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter operation lists.
//!
//! Filters matter to damage and occlusion only through two questions: do
//! they move pixels (so a change at one point damages its neighbourhood),
//! and do they change opacity (so opaque content under them stops being
//! opaque). Actual filter rendering is the rasterizer's business.

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::geometry::Outsets;

/// One filter operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOperation {
    /// Gaussian blur with the given standard deviation in pixels.
    Blur(f64),
    /// Blurred, offset copy of the content drawn beneath it.
    DropShadow {
        /// Shadow offset.
        offset: Vec2,
        /// Blur standard deviation.
        std_deviation: f64,
    },
    /// Multiplies alpha by the given amount.
    Opacity(f64),
    /// Desaturates by the given amount.
    Grayscale(f64),
    /// Scales color channels by the given amount.
    Brightness(f64),
    /// Nearest-neighbour zoom used for magnifier effects.
    Zoom {
        /// Magnification factor.
        amount: f64,
        /// Inset, in pixels, of the magnified area.
        inset: f64,
    },
}

impl FilterOperation {
    /// Returns `true` if an output pixel depends on input pixels elsewhere.
    #[must_use]
    pub fn moves_pixels(&self) -> bool {
        matches!(self, Self::Blur(_) | Self::DropShadow { .. } | Self::Zoom { .. })
    }

    /// Returns `true` if opaque input can produce non-opaque output.
    #[must_use]
    pub fn affects_opacity(&self) -> bool {
        match self {
            Self::Opacity(amount) => *amount != 1.0,
            Self::Blur(_) | Self::DropShadow { .. } | Self::Zoom { .. } => true,
            Self::Grayscale(_) | Self::Brightness(_) => false,
        }
    }
}

/// An ordered list of filter operations, applied first to last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOperations(pub Vec<FilterOperation>);

impl FilterOperations {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns `true` if the list has no operations.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends an operation.
    pub fn push(&mut self, op: FilterOperation) {
        self.0.push(op);
    }

    /// Returns `true` if any operation moves pixels.
    #[must_use]
    pub fn has_filter_that_moves_pixels(&self) -> bool {
        self.0.iter().any(FilterOperation::moves_pixels)
    }

    /// Returns `true` if any operation can reduce opacity.
    #[must_use]
    pub fn has_filter_that_affects_opacity(&self) -> bool {
        self.0.iter().any(FilterOperation::affects_opacity)
    }

    /// How far, on each edge, a pixel can spread once the whole list is
    /// applied.
    ///
    /// A blur spreads roughly three standard deviations; outsets of
    /// successive operations add up.
    #[must_use]
    pub fn outsets(&self) -> Outsets {
        let mut out = Outsets::ZERO;
        for op in &self.0 {
            match *op {
                FilterOperation::Blur(sigma) => {
                    let spread = (sigma * 3.0).max(0.0);
                    out.top += spread;
                    out.right += spread;
                    out.bottom += spread;
                    out.left += spread;
                }
                FilterOperation::DropShadow {
                    offset,
                    std_deviation,
                } => {
                    let spread = (std_deviation * 3.0).max(0.0);
                    out.top += (spread - offset.y).max(0.0);
                    out.right += (spread + offset.x).max(0.0);
                    out.bottom += (spread + offset.y).max(0.0);
                    out.left += (spread - offset.x).max(0.0);
                }
                FilterOperation::Zoom { inset, .. } => {
                    let spread = inset.max(0.0);
                    out.top += spread;
                    out.right += spread;
                    out.bottom += spread;
                    out.left += spread;
                }
                FilterOperation::Opacity(_)
                | FilterOperation::Grayscale(_)
                | FilterOperation::Brightness(_) => {}
            }
        }
        out
    }
}

impl From<Vec<FilterOperation>> for FilterOperations {
    fn from(ops: Vec<FilterOperation>) -> Self {
        Self(ops)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn color_filters_do_not_move_pixels() {
        let f = FilterOperations::from(vec![
            FilterOperation::Grayscale(1.0),
            FilterOperation::Brightness(0.5),
        ]);
        assert!(!f.has_filter_that_moves_pixels());
        assert!(!f.has_filter_that_affects_opacity());
        assert!(f.outsets().is_zero());
    }

    #[test]
    fn blur_spreads_three_sigma() {
        let f = FilterOperations::from(vec![FilterOperation::Blur(2.0)]);
        assert!(f.has_filter_that_moves_pixels());
        let o = f.outsets();
        assert_eq!((o.top, o.right, o.bottom, o.left), (6.0, 6.0, 6.0, 6.0));
    }

    #[test]
    fn drop_shadow_outsets_follow_offset() {
        let f = FilterOperations::from(vec![FilterOperation::DropShadow {
            offset: Vec2::new(4.0, -2.0),
            std_deviation: 1.0,
        }]);
        let o = f.outsets();
        assert_eq!(o.right, 7.0);
        assert_eq!(o.left, 0.0);
        assert_eq!(o.top, 5.0);
        assert_eq!(o.bottom, 1.0);
    }

    #[test]
    fn unit_opacity_is_not_an_opacity_change() {
        assert!(!FilterOperations::from(vec![FilterOperation::Opacity(1.0)]).has_filter_that_affects_opacity());
        assert!(FilterOperations::from(vec![FilterOperation::Opacity(0.5)]).has_filter_that_affects_opacity());
    }
}

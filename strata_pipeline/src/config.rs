// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline configuration.

use kurbo::{Rect, Size};
use strata_render::OcclusionConfig;

/// Where a commit lands on the consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommitMode {
    /// Commits fill a pending tree that is activated separately, so the
    /// active tree keeps drawing while the pending one is prepared.
    Threaded,
    /// Commits write straight into the active tree and activate at once.
    SingleBuffered,
}

/// Bounds for the page scale factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageScaleLimits {
    /// Smallest allowed scale.
    pub min: f64,
    /// Largest allowed scale.
    pub max: f64,
}

impl PageScaleLimits {
    /// Typical limits for content that can be zoomed.
    pub const DEFAULT: Self = Self { min: 1.0, max: 4.0 };

    /// Locks the scale at 1.
    pub const FIXED: Self = Self { min: 1.0, max: 1.0 };

    /// Clamps `scale` into the limits.
    #[must_use]
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.max(self.min).min(self.max)
    }
}

impl Default for PageScaleLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration shared by the producer and the consumer.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// How commits reach the active tree.
    pub commit_mode: CommitMode,
    /// Size of the output, in device pixels.
    pub viewport_size: Size,
    /// Device pixels per layout pixel.
    pub device_scale_factor: f64,
    /// Bounds for the page scale factor on both sides.
    pub page_scale_limits: PageScaleLimits,
    /// Height of the top controls; hiding them grows the inner viewport
    /// container by up to this much.
    pub top_controls_height: f64,
    /// Occlusion tracking used when building render plans.
    pub occlusion: OcclusionConfig,
}

impl PipelineConfig {
    /// Pending/active trees with separate activation.
    #[must_use]
    pub const fn threaded(viewport_size: Size) -> Self {
        Self {
            commit_mode: CommitMode::Threaded,
            viewport_size,
            device_scale_factor: 1.0,
            page_scale_limits: PageScaleLimits::DEFAULT,
            top_controls_height: 0.0,
            occlusion: OcclusionConfig::DEFAULT,
        }
    }

    /// A single tree that commits activate into directly.
    #[must_use]
    pub const fn single_buffered(viewport_size: Size) -> Self {
        Self {
            commit_mode: CommitMode::SingleBuffered,
            ..Self::threaded(viewport_size)
        }
    }

    /// The output rectangle.
    #[must_use]
    pub fn viewport_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.viewport_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_scale_limits_clamp() {
        let limits = PageScaleLimits { min: 0.5, max: 3.0 };
        assert_eq!(limits.clamp(0.1), 0.5);
        assert_eq!(limits.clamp(2.0), 2.0);
        assert_eq!(limits.clamp(9.0), 3.0);
        assert_eq!(PageScaleLimits::FIXED.clamp(2.0), 1.0);
    }

    #[test]
    fn presets_differ_only_in_mode() {
        let size = Size::new(800.0, 600.0);
        let threaded = PipelineConfig::threaded(size);
        let single = PipelineConfig::single_buffered(size);
        assert_eq!(threaded.commit_mode, CommitMode::Threaded);
        assert_eq!(single.commit_mode, CommitMode::SingleBuffered);
        assert_eq!(single.viewport_rect(), Rect::new(0.0, 0.0, 800.0, 600.0));
        assert_eq!(single.page_scale_limits, threaded.page_scale_limits);
    }
}

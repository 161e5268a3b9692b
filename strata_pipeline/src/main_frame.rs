// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Messages exchanged between the producer and the consumer.
//!
//! ```text
//!   consumer ── BeginMainFrameState ──► producer   (pulled deltas, evictions)
//!   consumer ◄──────── Commit ───────── producer   (snapshot, values, promises)
//! ```
//!
//! Both are plain owned data and `Send`, so they can cross threads as is.

use kurbo::Vec2;
use strata_core::layer::{CommitSnapshot, LayerId};

use crate::swap_promise::SwapPromiseList;
use crate::ui_resource::UiResourceRequest;

/// Interactive deltas pulled from the consumer for the producer to absorb.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollAndScaleSet {
    /// Scroll deltas of layers that moved.
    pub scrolls: Vec<(LayerId, Vec2)>,
    /// Page scale factor change (multiplicative).
    pub page_scale_delta: f64,
    /// Elastic overscroll change.
    pub elastic_overscroll_delta: Vec2,
    /// Top-controls shown ratio change.
    pub top_controls_delta: f64,
}

impl Default for ScrollAndScaleSet {
    fn default() -> Self {
        Self {
            scrolls: Vec::new(),
            page_scale_delta: 1.0,
            elastic_overscroll_delta: Vec2::ZERO,
            top_controls_delta: 0.0,
        }
    }
}

impl ScrollAndScaleSet {
    /// Returns `true` if applying the set changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scrolls.is_empty()
            && self.page_scale_delta == 1.0
            && self.elastic_overscroll_delta == Vec2::ZERO
            && self.top_controls_delta == 0.0
    }
}

/// What the consumer tells the producer when it asks for a new frame.
#[derive(Clone, Debug, PartialEq)]
pub struct BeginMainFrameState {
    /// Consumer frame counter at the time of the request.
    pub frame_index: u64,
    /// Deltas the producer must fold into its values.
    pub scroll_and_scale: ScrollAndScaleSet,
    /// The consumer lost its UI resources; every live one must be re-sent.
    pub ui_resources_evicted: bool,
}

/// Layers with a viewport role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewportLayers {
    /// Children of this layer are scaled by the page scale factor.
    pub page_scale: Option<LayerId>,
    /// Grows by the hidden part of the top controls.
    pub inner_viewport_container: Option<LayerId>,
    /// Children of this layer are offset by the elastic overscroll.
    pub overscroll_elasticity: Option<LayerId>,
}

/// A request to animate the page scale, played by the consumer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageScaleAnimation {
    /// Scroll offset to end at.
    pub target_offset: Vec2,
    /// Page scale to end at.
    pub target_scale: f64,
    /// Whether `target_offset` is a zoom anchor rather than an offset.
    pub use_anchor: bool,
    /// Length of the animation, in milliseconds.
    pub duration_ms: u32,
}

/// Everything one commit carries.
#[derive(Debug)]
pub struct Commit {
    /// Layer changes.
    pub snapshot: CommitSnapshot,
    /// Authoritative page scale.
    pub page_scale: f64,
    /// Authoritative elastic overscroll.
    pub elastic_overscroll: Vec2,
    /// Authoritative top-controls shown ratio.
    pub top_controls_shown_ratio: f64,
    /// Whether any synchronized value changed since the previous commit.
    pub synced_values_changed: bool,
    /// Viewport roles.
    pub viewport_layers: ViewportLayers,
    /// Page scale animation to start.
    pub page_scale_animation: Option<PageScaleAnimation>,
    /// UI resource changes.
    pub ui_resource_requests: Vec<UiResourceRequest>,
    /// Promises resolved by the frame that shows this commit.
    pub swap_promises: SwapPromiseList,
}

impl Default for Commit {
    fn default() -> Self {
        Self {
            snapshot: CommitSnapshot::default(),
            page_scale: 1.0,
            elastic_overscroll: Vec2::ZERO,
            top_controls_shown_ratio: 1.0,
            synced_values_changed: false,
            viewport_layers: ViewportLayers::default(),
            page_scale_animation: None,
            ui_resource_requests: Vec::new(),
            swap_promises: SwapPromiseList::new(),
        }
    }
}

impl Commit {
    /// Returns `true` if the commit changes anything on the consumer.
    ///
    /// Swap promises alone do not count; a commit without updates is
    /// aborted and its promises are broken.
    #[must_use]
    pub fn has_updates(&self) -> bool {
        !self.snapshot.is_empty()
            || self.synced_values_changed
            || self.page_scale_animation.is_some()
            || !self.ui_resource_requests.is_empty()
    }

    /// Producer frame number.
    #[must_use]
    pub fn source_frame(&self) -> u64 {
        self.snapshot.source_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap_promise::testing::RecordingPromise;

    #[test]
    fn promises_alone_are_not_an_update() {
        let mut commit = Commit::default();
        let (promise, _log) = RecordingPromise::new();
        commit.swap_promises.push(promise);
        assert!(!commit.has_updates());
        commit.synced_values_changed = true;
        assert!(commit.has_updates());
    }

    #[test]
    fn default_scroll_and_scale_set_is_empty() {
        let mut set = ScrollAndScaleSet::default();
        assert!(set.is_empty());
        set.page_scale_delta = 1.5;
        assert!(!set.is_empty());
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The producer side: the authoritative scene and values.

use kurbo::Vec2;
use strata_core::layer::{LayerId, SceneGraph, UiResourceId};
use strata_core::trace::{DidNotSwapReason, Tracer};

use crate::config::{PageScaleLimits, PipelineConfig};
use crate::main_frame::{
    BeginMainFrameState, Commit, PageScaleAnimation, ScrollAndScaleSet, ViewportLayers,
};
use crate::swap_promise::{SwapPromise, SwapPromiseList};
use crate::ui_resource::{UiResourceBitmap, UiResourceRegistry};

/// Values whose change alone is worth a commit.
#[derive(Clone, Debug, PartialEq)]
struct CommittedValues {
    scroll_offsets: Vec<(LayerId, Vec2)>,
    page_scale: f64,
    elastic_overscroll: Vec2,
    top_controls_shown_ratio: f64,
    viewport_layers: ViewportLayers,
}

/// Owns the [`SceneGraph`] and everything else a commit carries.
///
/// Consumer-side interaction reaches the host only as deltas, through
/// [`begin_main_frame`](Self::begin_main_frame); the host's values are
/// authoritative otherwise.
#[derive(Debug)]
pub struct SceneHost {
    scene: SceneGraph,
    page_scale_limits: PageScaleLimits,
    page_scale: f64,
    elastic_overscroll: Vec2,
    top_controls_shown_ratio: f64,
    viewport_layers: ViewportLayers,
    swap_promises: SwapPromiseList,
    page_scale_animation: Option<PageScaleAnimation>,
    ui_resources: UiResourceRegistry,
    last_committed: Option<CommittedValues>,
}

impl SceneHost {
    /// Creates a host with an empty scene.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            scene: SceneGraph::new(),
            page_scale_limits: config.page_scale_limits,
            page_scale: config.page_scale_limits.clamp(1.0),
            elastic_overscroll: Vec2::ZERO,
            top_controls_shown_ratio: 1.0,
            viewport_layers: ViewportLayers::default(),
            swap_promises: SwapPromiseList::new(),
            page_scale_animation: None,
            ui_resources: UiResourceRegistry::new(),
            last_committed: None,
        }
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// The scene, for mutation.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Authoritative page scale.
    #[must_use]
    pub fn page_scale(&self) -> f64 {
        self.page_scale
    }

    /// Sets the page scale, clamped to the limits.
    pub fn set_page_scale(&mut self, scale: f64) {
        self.page_scale = self.page_scale_limits.clamp(scale);
    }

    /// Authoritative elastic overscroll.
    #[must_use]
    pub fn elastic_overscroll(&self) -> Vec2 {
        self.elastic_overscroll
    }

    /// Sets the elastic overscroll.
    pub fn set_elastic_overscroll(&mut self, overscroll: Vec2) {
        self.elastic_overscroll = overscroll;
    }

    /// Authoritative top-controls shown ratio.
    #[must_use]
    pub fn top_controls_shown_ratio(&self) -> f64 {
        self.top_controls_shown_ratio
    }

    /// Sets the top-controls shown ratio, clamped to `0..=1`.
    pub fn set_top_controls_shown_ratio(&mut self, ratio: f64) {
        self.top_controls_shown_ratio = ratio.clamp(0.0, 1.0);
    }

    /// Viewport roles.
    #[must_use]
    pub fn viewport_layers(&self) -> ViewportLayers {
        self.viewport_layers
    }

    /// Assigns viewport roles.
    pub fn set_viewport_layers(&mut self, layers: ViewportLayers) {
        self.viewport_layers = layers;
    }

    /// Requests a page scale animation. A request not yet committed is
    /// superseded.
    pub fn start_page_scale_animation(&mut self, animation: PageScaleAnimation) {
        self.page_scale_animation = Some(animation);
    }

    /// Queues a promise on the next commit.
    pub fn queue_swap_promise(&mut self, promise: Box<dyn SwapPromise>) {
        self.swap_promises.push(promise);
    }

    /// Registers a UI resource; it is uploaded with the next commit.
    pub fn create_ui_resource(&mut self, bitmap: UiResourceBitmap) -> UiResourceId {
        self.ui_resources.create(bitmap)
    }

    /// Releases a UI resource. Unknown ids are ignored.
    pub fn delete_ui_resource(&mut self, id: UiResourceId) {
        self.ui_resources.delete(id);
    }

    /// Live UI resources.
    #[must_use]
    pub fn ui_resources(&self) -> &UiResourceRegistry {
        &self.ui_resources
    }

    /// Absorbs what the consumer reported when it asked for this frame.
    pub fn begin_main_frame(&mut self, state: &BeginMainFrameState) {
        self.apply_scroll_and_scale(&state.scroll_and_scale);
        if state.ui_resources_evicted {
            self.ui_resources.recreate_all();
        }
    }

    /// Folds interactive deltas into the authoritative values.
    ///
    /// Scroll deltas for layers that no longer exist are dropped. Applied
    /// deltas do not override the consumer at the next activation: it is
    /// already showing them.
    pub fn apply_scroll_and_scale(&mut self, set: &ScrollAndScaleSet) {
        for &(layer, delta) in &set.scrolls {
            if self.scene.is_alive(layer) {
                self.scene.apply_scroll_delta(layer, delta);
            }
        }
        self.page_scale = self
            .page_scale_limits
            .clamp(self.page_scale * set.page_scale_delta);
        self.elastic_overscroll += set.elastic_overscroll_delta;
        self.top_controls_shown_ratio =
            (self.top_controls_shown_ratio + set.top_controls_delta).clamp(0.0, 1.0);
    }

    /// Returns `true` if a commit would carry anything.
    #[must_use]
    pub fn needs_commit(&self) -> bool {
        self.scene.has_pending_changes()
            || self.page_scale_animation.is_some()
            || !self.swap_promises.is_empty()
            || self.last_committed.as_ref().is_none_or(|last| {
                last.page_scale != self.page_scale
                    || last.elastic_overscroll != self.elastic_overscroll
                    || last.top_controls_shown_ratio != self.top_controls_shown_ratio
                    || last.viewport_layers != self.viewport_layers
                    || !last
                        .scroll_offsets
                        .iter()
                        .copied()
                        .eq(self.scene.scroll_offsets())
            })
    }

    /// Captures everything that changed into a commit.
    pub fn begin_commit(&mut self) -> Commit {
        let snapshot = self.scene.prepare_commit();
        let values = CommittedValues {
            scroll_offsets: snapshot.scroll_offsets.clone(),
            page_scale: self.page_scale,
            elastic_overscroll: self.elastic_overscroll,
            top_controls_shown_ratio: self.top_controls_shown_ratio,
            viewport_layers: self.viewport_layers,
        };
        let synced_values_changed = self.last_committed.as_ref() != Some(&values);
        self.last_committed = Some(values);
        Commit {
            snapshot,
            page_scale: self.page_scale,
            elastic_overscroll: self.elastic_overscroll,
            top_controls_shown_ratio: self.top_controls_shown_ratio,
            synced_values_changed,
            viewport_layers: self.viewport_layers,
            page_scale_animation: self.page_scale_animation.take(),
            ui_resource_requests: self.ui_resources.take_requests(),
            swap_promises: core::mem::take(&mut self.swap_promises),
        }
    }

    /// Breaks every queued promise; used when the frame they wait for is
    /// aborted before a commit was built.
    pub fn break_swap_promises(&mut self, reason: DidNotSwapReason) {
        let frame = self.scene.source_frame();
        self.swap_promises
            .break_all(reason, frame, &mut Tracer::none());
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The consumer's synchronized values.
//!
//! One [`SyncedValues`] is shared by the pending and active trees: the
//! pending tree reads [`TreeSide::Pending`], the active tree
//! [`TreeSide::Active`]. Commits write bases with
//! [`push_commit`](SyncedValues::push_commit), activation moves them into
//! the active tree, and interactive input writes deltas on the active side.

use std::collections::BTreeMap;

use kurbo::Vec2;
use strata_core::layer::LayerId;
use strata_core::synced::{ElasticOverscroll, PageScale, ScrollOffset, TopControlsRatio, TreeSide};

use crate::main_frame::{Commit, ScrollAndScaleSet};

/// Every synchronized value the consumer owns.
#[derive(Clone, Debug)]
pub struct SyncedValues {
    scroll: BTreeMap<LayerId, ScrollOffset>,
    /// Scroll entries whose layer left the scene; dropped at activation so
    /// the active tree keeps its offsets until then.
    retired: Vec<LayerId>,
    page_scale: PageScale,
    elastic_overscroll: ElasticOverscroll,
    top_controls: TopControlsRatio,
}

impl Default for SyncedValues {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncedValues {
    /// Page scale 1, controls fully shown, no scrollers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scroll: BTreeMap::new(),
            retired: Vec::new(),
            page_scale: PageScale::new(1.0),
            elastic_overscroll: ElasticOverscroll::default(),
            top_controls: TopControlsRatio::new(1.0),
        }
    }

    /// Number of scrollable layers tracked.
    #[must_use]
    pub fn scroller_count(&self) -> usize {
        self.scroll.len()
    }

    /// The scroll value for `layer`, if the layer scrolls.
    #[must_use]
    pub fn scroll_offset(&self, layer: LayerId) -> Option<&ScrollOffset> {
        self.scroll.get(&layer)
    }

    /// Scroll offset of `layer` as seen by `side`; zero for layers that do
    /// not scroll.
    #[must_use]
    pub fn current_scroll_offset(&self, layer: LayerId, side: TreeSide) -> Vec2 {
        self.scroll
            .get(&layer)
            .map_or(Vec2::ZERO, |s| s.current(side))
    }

    /// Page scale value.
    #[must_use]
    pub fn page_scale(&self) -> &PageScale {
        &self.page_scale
    }

    /// Elastic overscroll value.
    #[must_use]
    pub fn elastic_overscroll(&self) -> &ElasticOverscroll {
        &self.elastic_overscroll
    }

    /// Top-controls shown ratio value.
    #[must_use]
    pub fn top_controls(&self) -> &TopControlsRatio {
        &self.top_controls
    }

    /// Interactive scroll on the active tree. Returns `false` if `layer`
    /// does not scroll or the offset did not change.
    #[must_use]
    pub fn set_scroll_offset(&mut self, layer: LayerId, offset: Vec2) -> bool {
        self.scroll
            .get_mut(&layer)
            .is_some_and(|s| s.set_current(offset))
    }

    /// Interactive page scale on the active tree.
    #[must_use]
    pub fn set_page_scale(&mut self, scale: f64) -> bool {
        self.page_scale.set_current(scale)
    }

    /// Interactive elastic overscroll on the active tree.
    #[must_use]
    pub fn set_elastic_overscroll(&mut self, overscroll: Vec2) -> bool {
        self.elastic_overscroll.set_current(overscroll)
    }

    /// Interactive top-controls ratio on the active tree.
    #[must_use]
    pub fn set_top_controls_shown_ratio(&mut self, ratio: f64) -> bool {
        self.top_controls.set_current(ratio)
    }

    /// Writes the producer's values from a commit. Returns how many values
    /// changed.
    pub fn push_commit(&mut self, commit: &Commit) -> u32 {
        let mut changed = 0;
        let mut seen = Vec::with_capacity(commit.snapshot.scroll_offsets.len());
        for &(layer, offset) in &commit.snapshot.scroll_offsets {
            seen.push(layer);
            let value = self
                .scroll
                .entry(layer)
                .or_insert_with(|| ScrollOffset::new(offset));
            if value.push_from_main_thread(offset) {
                changed += 1;
            }
        }
        seen.sort_unstable();
        self.retired = self
            .scroll
            .keys()
            .copied()
            .filter(|id| seen.binary_search(id).is_err())
            .collect();
        for layer in &commit.snapshot.scroll_clobbers {
            if let Some(value) = self.scroll.get_mut(layer) {
                value.set_clobber_active_value();
            }
        }
        changed += u32::from(self.page_scale.push_from_main_thread(commit.page_scale));
        changed += u32::from(
            self.elastic_overscroll
                .push_from_main_thread(commit.elastic_overscroll),
        );
        changed += u32::from(
            self.top_controls
                .push_from_main_thread(commit.top_controls_shown_ratio),
        );
        changed
    }

    /// Activates every value. Returns how many changed.
    pub fn push_pending_to_active(&mut self) -> u32 {
        for layer in self.retired.drain(..) {
            self.scroll.remove(&layer);
        }
        let mut changed = 0;
        for value in self.scroll.values_mut() {
            changed += u32::from(value.push_pending_to_active());
        }
        changed += u32::from(self.page_scale.push_pending_to_active());
        changed += u32::from(self.elastic_overscroll.push_pending_to_active());
        changed += u32::from(self.top_controls.push_pending_to_active());
        changed
    }

    /// Rolls back every in-flight delta after an aborted commit.
    pub fn abort_commit(&mut self) {
        self.retired.clear();
        for value in self.scroll.values_mut() {
            value.abort_commit();
        }
        self.page_scale.abort_commit();
        self.elastic_overscroll.abort_commit();
        self.top_controls.abort_commit();
    }

    /// Snapshots every interactive delta for the producer.
    ///
    /// Must not be called again until the commit carrying the result has
    /// activated or been aborted.
    pub fn pull_deltas(&mut self) -> ScrollAndScaleSet {
        let mut set = ScrollAndScaleSet::default();
        for (&layer, value) in &mut self.scroll {
            let delta = value.pull_delta_for_main_thread();
            if delta != Vec2::ZERO {
                set.scrolls.push((layer, delta));
            }
        }
        set.page_scale_delta = self.page_scale.pull_delta_for_main_thread();
        set.elastic_overscroll_delta = self.elastic_overscroll.pull_delta_for_main_thread();
        set.top_controls_delta = self.top_controls.pull_delta_for_main_thread();
        set
    }
}

#[cfg(test)]
mod tests {
    use strata_core::layer::CommitSnapshot;

    use super::*;

    fn id(n: u32) -> LayerId {
        LayerId::from_raw(n, 0)
    }

    fn commit(scrolls: &[(LayerId, Vec2)], page_scale: f64) -> Commit {
        Commit {
            snapshot: CommitSnapshot {
                scroll_offsets: scrolls.to_vec(),
                ..CommitSnapshot::default()
            },
            page_scale,
            ..Commit::default()
        }
    }

    #[test]
    fn commit_then_activate() {
        let mut values = SyncedValues::new();
        let a = id(1);
        assert_eq!(values.push_commit(&commit(&[(a, Vec2::new(0.0, 5.0))], 1.0)), 0);
        assert_eq!(values.scroller_count(), 1);
        assert_eq!(
            values.current_scroll_offset(a, TreeSide::Active),
            Vec2::new(0.0, 5.0),
            "a new scroller starts at its committed offset"
        );

        assert_eq!(values.push_commit(&commit(&[(a, Vec2::new(0.0, 9.0))], 2.0)), 2);
        assert_eq!(values.current_scroll_offset(a, TreeSide::Active), Vec2::new(0.0, 5.0));
        assert_eq!(values.current_scroll_offset(a, TreeSide::Pending), Vec2::new(0.0, 9.0));
        assert_eq!(values.push_pending_to_active(), 2);
        assert_eq!(values.current_scroll_offset(a, TreeSide::Active), Vec2::new(0.0, 9.0));
        assert_eq!(values.page_scale().current(TreeSide::Active), 2.0);
    }

    #[test]
    fn pulled_deltas_skip_idle_scrollers() {
        let mut values = SyncedValues::new();
        let (a, b) = (id(1), id(2));
        let _ = values.push_commit(&commit(&[(a, Vec2::ZERO), (b, Vec2::ZERO)], 1.0));
        let _ = values.push_pending_to_active();
        assert!(values.set_scroll_offset(b, Vec2::new(3.0, 0.0)));
        assert!(!values.set_scroll_offset(b, Vec2::new(3.0, 0.0)), "unchanged");
        assert!(!values.set_scroll_offset(id(7), Vec2::new(3.0, 0.0)), "not a scroller");
        assert!(values.set_page_scale(2.0));

        let set = values.pull_deltas();
        assert_eq!(set.scrolls, [(b, Vec2::new(3.0, 0.0))]);
        assert_eq!(set.page_scale_delta, 2.0);
        assert_eq!(set.elastic_overscroll_delta, Vec2::ZERO);
        assert_eq!(set.top_controls_delta, 0.0);
    }

    #[test]
    fn abort_keeps_the_sent_delta() {
        let mut values = SyncedValues::new();
        let a = id(1);
        let _ = values.push_commit(&commit(&[(a, Vec2::ZERO)], 1.0));
        let _ = values.push_pending_to_active();
        let _ = values.set_scroll_offset(a, Vec2::new(0.0, 4.0));
        let _ = values.pull_deltas();
        values.abort_commit();
        let Some(value) = values.scroll_offset(a) else {
            panic!("scroller missing");
        };
        assert_eq!(value.active_base(), Vec2::new(0.0, 4.0));
        assert_eq!(value.delta(), Vec2::ZERO);
        assert_eq!(value.current(TreeSide::Active), Vec2::new(0.0, 4.0));
    }

    #[test]
    fn removed_scrollers_retire_at_activation() {
        let mut values = SyncedValues::new();
        let (a, b) = (id(1), id(2));
        let _ = values.push_commit(&commit(&[(a, Vec2::ZERO), (b, Vec2::new(1.0, 1.0))], 1.0));
        let _ = values.push_pending_to_active();
        let _ = values.push_commit(&commit(&[(a, Vec2::ZERO)], 1.0));
        assert_eq!(
            values.current_scroll_offset(b, TreeSide::Active),
            Vec2::new(1.0, 1.0),
            "the active tree still shows b"
        );
        let _ = values.push_pending_to_active();
        assert_eq!(values.scroller_count(), 1);
        assert!(values.scroll_offset(b).is_none());
    }

    #[test]
    fn clobber_discards_interaction() {
        let mut values = SyncedValues::new();
        let a = id(1);
        let _ = values.push_commit(&commit(&[(a, Vec2::ZERO)], 1.0));
        let _ = values.push_pending_to_active();
        let _ = values.set_scroll_offset(a, Vec2::new(0.0, 10.0));
        let mut c = commit(&[(a, Vec2::new(0.0, 30.0))], 1.0);
        c.snapshot.scroll_clobbers = vec![a];
        let _ = values.push_commit(&c);
        let _ = values.push_pending_to_active();
        assert_eq!(values.current_scroll_offset(a, TreeSide::Active), Vec2::new(0.0, 30.0));
    }
}

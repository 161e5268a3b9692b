// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays producer scene graph with allocation, topology, property
//! management and commit preparation.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::commit::{CommitSnapshot, LayerNode, LayerUpdate};
use super::id::{INVALID, LayerId};
use super::properties::LayerProperties;
use super::traverse::Children;
use crate::dirty;
use crate::geometry;

/// Struct-of-arrays storage for the producer's layer tree.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Destroyed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Only the producer context mutates a `SceneGraph`. The consumer sees it
/// exclusively through the [`CommitSnapshot`]s returned by
/// [`prepare_commit`](Self::prepare_commit).
#[derive(Debug)]
pub struct SceneGraph {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) mask: Vec<u32>,
    pub(crate) replica: Vec<u32>,
    pub(crate) owner: Vec<u32>,
    pub(crate) root: u32,

    // -- Properties --
    pub(crate) props: Vec<LayerProperties>,
    pub(crate) scroll_offset: Vec<Vec2>,
    pub(crate) update_rect: Vec<Rect>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) has_marks: bool,
    pub(crate) needs_full_sync: bool,
    pub(crate) source_frame: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            mask: Vec::new(),
            replica: Vec::new(),
            owner: Vec::new(),
            root: INVALID,
            props: Vec::new(),
            scroll_offset: Vec::new(),
            update_rect: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            has_marks: false,
            needs_full_sync: true,
            source_frame: 0,
        }
    }

    // -- Allocation API --

    /// Creates a new layer and returns its handle.
    ///
    /// The layer starts with [default](LayerProperties::default) properties
    /// and no parent.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.mask[i] = INVALID;
            self.replica[i] = INVALID;
            self.owner[i] = INVALID;
            self.props[i] = LayerProperties::default();
            self.scroll_offset[i] = Vec2::ZERO;
            self.update_rect[i] = Rect::ZERO;
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.mask.push(INVALID);
            self.replica.push(INVALID);
            self.owner.push(INVALID);
            self.props.push(LayerProperties::default());
            self.scroll_offset.push(Vec2::ZERO);
            self.update_rect.push(Rect::ZERO);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        self.mark(idx, dirty::TOPOLOGY);
        self.mark(idx, dirty::LOCAL);

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children, a mask or a replica (remove them
    /// first), or if the handle is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        let i = idx as usize;
        assert!(
            self.first_child[i] == INVALID,
            "cannot destroy layer with children"
        );
        assert!(
            self.mask[i] == INVALID && self.replica[i] == INVALID,
            "cannot destroy layer that still owns a mask or replica"
        );

        if self.parent[i] != INVALID {
            self.unlink_from_parent(idx);
        }
        if self.owner[i] != INVALID {
            let owner = self.owner[i] as usize;
            if self.mask[owner] == idx {
                self.mask[owner] = INVALID;
            }
            if self.replica[owner] == idx {
                self.replica[owner] = INVALID;
            }
            self.owner[i] = INVALID;
        }
        if self.root == idx {
            self.root = INVALID;
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.alive[i] = false;

        self.free_list.push(idx);
        self.needs_full_sync = true;
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Number of live layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    // -- Topology API --

    /// Makes `id` the root of the tree that commits describe.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has a parent.
    pub fn set_root(&mut self, id: LayerId) {
        self.validate(id);
        assert!(
            self.parent[id.idx as usize] == INVALID,
            "root layer must not have a parent"
        );
        self.root = id.idx;
        self.mark(id.idx, dirty::TOPOLOGY);
    }

    /// Returns the root layer, if set.
    #[must_use]
    pub fn root(&self) -> Option<LayerId> {
        self.handle(self.root)
    }

    /// Adds `child` as the last (front-most) child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent
    /// or owner.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID && self.owner[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(c != self.root, "the root layer cannot become a child");

        self.link_last(p, c);
        let _ = self.dirty.add_dependency(c, p, dirty::SUBTREE);
        self.mark_subtree(c);
        self.mark(p, dirty::TOPOLOGY);
    }

    /// Inserts `child` before `sibling` in the sibling list (behind it in
    /// paint order).
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID && self.owner[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        let _ = self.dirty.add_dependency(c, p, dirty::SUBTREE);
        self.mark_subtree(c);
        self.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::SUBTREE);
        self.mark_subtree(c);
        self.mark(p, dirty::TOPOLOGY);
    }

    /// Attaches (or detaches, with `None`) the mask layer of `owner`.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or the mask already has a parent or owner.
    pub fn set_mask_layer(&mut self, owner: LayerId, mask: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let old = self.mask[o as usize];
        if old != INVALID {
            self.detach_owned(old, o);
        }
        self.mask[o as usize] = match mask {
            Some(mask) => self.attach_owned(mask, o),
            None => INVALID,
        };
        self.mark(o, dirty::TOPOLOGY);
        self.mark_subtree(o);
    }

    /// Attaches (or detaches, with `None`) the replica layer of `owner`.
    ///
    /// The replica's own transform positions the mirrored copy relative to
    /// the owner; the replica may carry its own mask.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or the replica already has a parent or
    /// owner.
    pub fn set_replica_layer(&mut self, owner: LayerId, replica: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let old = self.replica[o as usize];
        if old != INVALID {
            self.detach_owned(old, o);
        }
        self.replica[o as usize] = match replica {
            Some(replica) => self.attach_owned(replica, o),
            None => INVALID,
        };
        self.mark(o, dirty::TOPOLOGY);
        self.mark_subtree(o);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a layer, back to
    /// front.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the mask layer of `id`.
    #[must_use]
    pub fn mask_layer(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.mask[id.idx as usize])
    }

    /// Returns the replica layer of `id`.
    #[must_use]
    pub fn replica_layer(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.replica[id.idx as usize])
    }

    // -- Property API --

    /// Returns the property bundle of a layer.
    #[must_use]
    pub fn properties(&self, id: LayerId) -> &LayerProperties {
        self.validate(id);
        &self.props[id.idx as usize]
    }

    /// Replaces the property bundle of a layer.
    ///
    /// Changes that affect descendants mark the whole subtree; others mark
    /// only the layer. Setting an identical bundle marks nothing.
    pub fn set_properties(&mut self, id: LayerId, props: LayerProperties) {
        self.validate(id);
        let i = id.idx as usize;
        if self.props[i] == props {
            return;
        }
        if self.props[i].subtree_differs(&props) {
            self.mark_subtree(id.idx);
        } else {
            self.mark(id.idx, dirty::LOCAL);
        }
        self.props[i] = props;
    }

    /// Edits the property bundle of a layer in place.
    pub fn update_properties(&mut self, id: LayerId, f: impl FnOnce(&mut LayerProperties)) {
        let mut props = self.properties(id).clone();
        f(&mut props);
        self.set_properties(id, props);
    }

    /// Invalidates `rect` (in layer space) of the layer's content.
    pub fn set_needs_display_rect(&mut self, id: LayerId, rect: Rect) {
        self.validate(id);
        let i = id.idx as usize;
        let clipped = geometry::intersect(rect, self.props[i].content_rect());
        if geometry::is_empty(clipped) {
            return;
        }
        self.update_rect[i] = geometry::union(self.update_rect[i], clipped);
        self.mark(id.idx, dirty::CONTENT);
    }

    /// Invalidates the layer's whole content.
    pub fn set_needs_display(&mut self, id: LayerId) {
        let rect = self.properties(id).content_rect();
        self.set_needs_display_rect(id, rect);
    }

    /// Returns the producer's scroll offset of a layer.
    #[must_use]
    pub fn scroll_offset(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.scroll_offset[id.idx as usize]
    }

    /// Returns the offset of every live scrollable layer, in index order.
    pub fn scroll_offsets(&self) -> impl Iterator<Item = (LayerId, Vec2)> + '_ {
        (0..self.len).filter_map(|idx| {
            let i = idx as usize;
            (self.alive[i] && self.props[i].is_scrollable()).then(|| {
                let id = LayerId {
                    idx,
                    generation: self.generation[i],
                };
                (id, self.scroll_offset[i])
            })
        })
    }

    /// Programmatic scroll: sets the offset and makes it win over any
    /// consumer-side interaction at the next activation.
    pub fn set_scroll_offset(&mut self, id: LayerId, offset: Vec2) {
        self.validate(id);
        let i = id.idx as usize;
        let clamped = clamp_scroll(offset, self.props[i].max_scroll_offset());
        if self.scroll_offset[i] == clamped {
            return;
        }
        self.scroll_offset[i] = clamped;
        self.mark(id.idx, dirty::SCROLL);
    }

    /// Folds a consumer-reported scroll delta into the producer's offset.
    ///
    /// Unlike [`set_scroll_offset`](Self::set_scroll_offset) this does not
    /// clobber the consumer's value: the consumer already shows it.
    pub fn apply_scroll_delta(&mut self, id: LayerId, delta: Vec2) {
        self.validate(id);
        let i = id.idx as usize;
        let max = self.props[i].max_scroll_offset();
        self.scroll_offset[i] = clamp_scroll(self.scroll_offset[i] + delta, max);
    }

    // -- Commit --

    /// Returns `true` if a commit would carry any layer change.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.needs_full_sync || self.has_marks
    }

    /// Drains all dirty channels and captures what the consumer needs.
    ///
    /// The first commit, and any commit after a topology change, carries the
    /// full tree structure and every reachable layer's properties. Otherwise
    /// only marked layers are pushed. Update rects are consumed.
    pub fn prepare_commit(&mut self) -> CommitSnapshot {
        self.source_frame += 1;

        let subtree: Vec<u32> = self
            .dirty
            .drain(dirty::SUBTREE)
            .affected()
            .deterministic()
            .run()
            .collect();
        let local: Vec<u32> = self
            .dirty
            .drain(dirty::LOCAL)
            .deterministic()
            .run()
            .collect();
        let content: Vec<u32> = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        let scrolled: Vec<u32> = self
            .dirty
            .drain(dirty::SCROLL)
            .deterministic()
            .run()
            .collect();
        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        let structural = self.needs_full_sync || !topology.is_empty();
        self.needs_full_sync = false;
        self.has_marks = false;

        let mut changed = alloc::vec![false; self.len as usize];
        for &idx in subtree.iter().chain(&local) {
            if let Some(slot) = changed.get_mut(idx as usize) {
                *slot = true;
            }
        }

        let mut snapshot = CommitSnapshot {
            source_frame: self.source_frame,
            root: self.root(),
            ..CommitSnapshot::default()
        };

        let pushed: Vec<u32> = if structural {
            let mut nodes = Vec::new();
            if self.root != INVALID {
                self.collect_nodes(self.root, &mut nodes);
            }
            let order = nodes.iter().map(|n| n.id.idx).collect();
            snapshot.structure = Some(nodes);
            order
        } else {
            let mut order: Vec<u32> = subtree
                .iter()
                .chain(&local)
                .chain(&content)
                .copied()
                .filter(|&idx| self.alive.get(idx as usize).copied().unwrap_or(false))
                .collect();
            order.sort_unstable();
            order.dedup();
            order
        };

        for idx in pushed {
            let i = idx as usize;
            snapshot.updates.push(LayerUpdate {
                id: LayerId {
                    idx,
                    generation: self.generation[i],
                },
                props: self.props[i].clone(),
                property_changed: changed[i],
                update_rect: core::mem::replace(&mut self.update_rect[i], Rect::ZERO),
            });
        }

        snapshot.scroll_offsets.extend(self.scroll_offsets());
        snapshot.scroll_clobbers = scrolled
            .into_iter()
            .filter_map(|idx| self.live_handle(idx))
            .collect();

        snapshot
    }

    /// Forces the next commit to carry the full tree.
    ///
    /// Used after the consumer lost its trees (for example when its output
    /// surface was recreated).
    pub fn set_needs_full_tree_sync(&mut self) {
        self.needs_full_sync = true;
    }

    /// Producer frame number of the last prepared commit.
    #[must_use]
    pub fn source_frame(&self) -> u64 {
        self.source_frame
    }

    // -- Internal helpers --

    fn mark(&mut self, idx: u32, channel: understory_dirty::Channel) {
        self.dirty.mark(idx, channel);
        self.has_marks = true;
    }

    /// Marks `idx` and, eagerly, everything that depends on it.
    fn mark_subtree(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::SUBTREE, &EagerPolicy);
        self.has_marks = true;
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: LayerId) {
        assert!(
            self.is_alive(id),
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn handle(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn live_handle(&self, idx: u32) -> Option<LayerId> {
        (idx < self.len && self.alive[idx as usize]).then(|| LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn attach_owned(&mut self, id: LayerId, owner: u32) -> u32 {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            self.parent[i] == INVALID && self.owner[i] == INVALID && id.idx != self.root,
            "mask or replica layer already has a parent"
        );
        self.owner[i] = owner;
        let _ = self.dirty.add_dependency(id.idx, owner, dirty::SUBTREE);
        id.idx
    }

    fn detach_owned(&mut self, idx: u32, owner: u32) {
        self.owner[idx as usize] = INVALID;
        self.dirty.remove_dependency(idx, owner, dirty::SUBTREE);
    }

    /// Pre-order walk: the layer, its mask, its replica (and the replica's
    /// mask), then its children.
    fn collect_nodes(&self, idx: u32, out: &mut Vec<LayerNode>) {
        let i = idx as usize;
        let children: Vec<LayerId> = Children::new(self, self.first_child[i]).collect();
        out.push(LayerNode {
            id: LayerId {
                idx,
                generation: self.generation[i],
            },
            parent: self.handle(self.parent[i]),
            children: children.clone(),
            mask: self.handle(self.mask[i]),
            replica: self.handle(self.replica[i]),
        });
        for owned in [self.mask[i], self.replica[i]] {
            if owned != INVALID {
                self.collect_nodes(owned, out);
            }
        }
        for child in children {
            self.collect_nodes(child.idx, out);
        }
    }
}

fn clamp_scroll(offset: Vec2, max: Vec2) -> Vec2 {
    Vec2::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y))
}

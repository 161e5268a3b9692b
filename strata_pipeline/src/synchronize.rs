// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reconciling consumer layers with commits.
//!
//! A structural commit carries the whole tree; the consumer keeps every
//! layer whose [`LayerId`] still appears, creates the new ones and drops the
//! rest, so surviving layers keep their render surfaces and damage history.
//! A non-structural commit only pushes property bundles.

use strata_core::geometry;
use strata_core::layer::{CommitSnapshot, LayerId};
use strata_render::{Layer, LayerArena};

/// What one synchronization did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Layers created on the consumer.
    pub created: u32,
    /// Layers dropped from the consumer.
    pub removed: u32,
    /// Property bundles pushed.
    pub pushed: u32,
}

/// Applies a commit snapshot to a consumer arena.
///
/// A pushed bundle that differs from the layer's current one, or that the
/// producer flagged, sets the layer's `property_changed`. Update rects
/// accumulate until the tree is drawn.
///
/// # Panics
///
/// Panics if the structure lists a layer twice, or if a bundle is pushed for
/// a layer the arena does not hold.
pub fn synchronize_tree(arena: &mut LayerArena, snapshot: &CommitSnapshot) -> SyncStats {
    let mut stats = SyncStats::default();

    if let Some(nodes) = &snapshot.structure {
        let mut ids: Vec<LayerId> = nodes.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        let listed = ids.len();
        ids.dedup();
        assert!(
            ids.len() == listed,
            "commit structure lists a layer more than once"
        );

        for id in arena.ids() {
            if ids.binary_search(&id).is_err() {
                let _ = arena.remove(id);
                stats.removed += 1;
            }
        }

        for node in nodes {
            if !arena.contains(node.id) {
                arena.insert(Layer::new(node.id));
                stats.created += 1;
            }
            let layer = arena.layer_mut(node.id);
            if layer.mask_layer != node.mask || layer.replica_layer != node.replica {
                layer.property_changed = true;
            }
            layer.parent = node.parent;
            layer.children.clone_from(&node.children);
            layer.mask_layer = node.mask;
            layer.replica_layer = node.replica;
        }
        arena.set_root(snapshot.root);
    }

    for update in &snapshot.updates {
        let Some(layer) = arena.get_mut(update.id) else {
            panic!("commit pushes properties for unknown layer {:?}", update.id);
        };
        if update.property_changed || layer.props != update.props {
            layer.property_changed = true;
        }
        layer.props.clone_from(&update.props);
        layer.update_rect = geometry::union(layer.update_rect, update.update_rect);
        stats.pushed += 1;
    }

    stats
}

/// Makes `target` hold the same layers, topology and properties as
/// `source`, reusing `target`'s layers where ids match.
///
/// Change flags and update rects are copied too: if `source` has not been
/// drawn since its last commit, those invalidations must still reach the
/// screen. Draw properties and surfaces are left for the next
/// draw-properties pass.
pub fn mirror_layers(target: &mut LayerArena, source: &LayerArena) {
    for id in target.ids() {
        if !source.contains(id) {
            let _ = target.remove(id);
        }
    }
    for from in source.iter() {
        if !target.contains(from.id) {
            target.insert(Layer::new(from.id));
        }
        let to = target.layer_mut(from.id);
        to.parent = from.parent;
        to.children.clone_from(&from.children);
        to.mask_layer = from.mask_layer;
        to.replica_layer = from.replica_layer;
        to.props.clone_from(&from.props);
        to.bounds_delta = from.bounds_delta;
        to.property_changed = from.property_changed;
        to.update_rect = from.update_rect;
    }
    target.set_root(source.root());
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size};
    use strata_core::layer::{LayerNode, LayerProperties, LayerUpdate};

    use super::*;

    fn id(n: u32) -> LayerId {
        LayerId::from_raw(n, 0)
    }

    fn node(n: u32, parent: Option<u32>, children: &[u32]) -> LayerNode {
        LayerNode {
            id: id(n),
            parent: parent.map(id),
            children: children.iter().copied().map(id).collect(),
            mask: None,
            replica: None,
        }
    }

    fn update(n: u32, width: f64) -> LayerUpdate {
        LayerUpdate {
            id: id(n),
            props: LayerProperties {
                bounds: Size::new(width, 10.0),
                ..LayerProperties::default()
            },
            property_changed: false,
            update_rect: Rect::ZERO,
        }
    }

    fn structural(nodes: Vec<LayerNode>, updates: Vec<LayerUpdate>) -> CommitSnapshot {
        CommitSnapshot {
            source_frame: 1,
            root: nodes.first().map(|n| n.id),
            structure: Some(nodes),
            updates,
            ..CommitSnapshot::default()
        }
    }

    #[test]
    fn structural_resync_reuses_layers() {
        let mut arena = LayerArena::new();
        let first = structural(
            vec![node(0, None, &[1, 2]), node(1, Some(0), &[]), node(2, Some(0), &[])],
            vec![update(0, 10.0), update(1, 10.0), update(2, 10.0)],
        );
        let stats = synchronize_tree(&mut arena, &first);
        assert_eq!(
            stats,
            SyncStats {
                created: 3,
                removed: 0,
                pushed: 3
            }
        );
        arena.layer_mut(id(1)).update_rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        arena.layer_mut(id(1)).property_changed = false;

        let second = structural(
            vec![node(0, None, &[1, 3]), node(1, Some(0), &[]), node(3, Some(0), &[])],
            vec![update(0, 10.0), update(1, 10.0), update(3, 10.0)],
        );
        let stats = synchronize_tree(&mut arena, &second);
        assert_eq!(stats.created, 1, "only layer 3 is new");
        assert_eq!(stats.removed, 1, "layer 2 is gone");
        assert!(!arena.contains(id(2)));
        let kept = arena.layer(id(1));
        assert!(!kept.property_changed, "identical bundle");
        assert_eq!(
            kept.update_rect,
            Rect::new(0.0, 0.0, 1.0, 1.0),
            "pending invalidation survives"
        );
        assert_eq!(arena.layer(id(0)).children, [id(1), id(3)]);
    }

    #[test]
    fn differing_bundle_sets_property_changed() {
        let mut arena = LayerArena::new();
        let _ = synchronize_tree(
            &mut arena,
            &structural(vec![node(0, None, &[])], vec![update(0, 10.0)]),
        );
        arena.layer_mut(id(0)).property_changed = false;

        let mut snapshot = CommitSnapshot {
            source_frame: 2,
            root: Some(id(0)),
            updates: vec![update(0, 20.0)],
            ..CommitSnapshot::default()
        };
        snapshot.updates[0].update_rect = Rect::new(0.0, 0.0, 2.0, 2.0);
        let stats = synchronize_tree(&mut arena, &snapshot);
        assert_eq!(stats.pushed, 1);
        let layer = arena.layer(id(0));
        assert!(layer.property_changed);
        assert_eq!(layer.props.bounds, Size::new(20.0, 10.0));
        assert_eq!(layer.update_rect, Rect::new(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn new_mask_sets_property_changed() {
        let mut arena = LayerArena::new();
        let _ = synchronize_tree(
            &mut arena,
            &structural(vec![node(0, None, &[])], vec![update(0, 10.0)]),
        );
        arena.layer_mut(id(0)).property_changed = false;
        let mut owner = node(0, None, &[]);
        owner.mask = Some(id(1));
        let _ = synchronize_tree(
            &mut arena,
            &structural(
                vec![owner, node(1, None, &[])],
                vec![update(0, 10.0), update(1, 10.0)],
            ),
        );
        assert!(arena.layer(id(0)).property_changed);
        assert_eq!(arena.layer(id(0)).mask_layer, Some(id(1)));
    }

    #[test]
    #[should_panic(expected = "unknown layer")]
    fn update_for_missing_layer_panics() {
        let mut arena = LayerArena::new();
        let snapshot = CommitSnapshot {
            updates: vec![update(4, 1.0)],
            ..CommitSnapshot::default()
        };
        let _ = synchronize_tree(&mut arena, &snapshot);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn duplicate_structure_panics() {
        let mut arena = LayerArena::new();
        let snapshot = structural(vec![node(0, None, &[]), node(0, None, &[])], Vec::new());
        let _ = synchronize_tree(&mut arena, &snapshot);
    }

    #[test]
    fn mirror_copies_state_and_undrawn_flags() {
        let mut source = LayerArena::new();
        let _ = synchronize_tree(
            &mut source,
            &structural(
                vec![node(0, None, &[1]), node(1, Some(0), &[])],
                vec![update(0, 10.0), update(1, 30.0)],
            ),
        );
        let mut target = LayerArena::new();
        let _ = synchronize_tree(
            &mut target,
            &structural(
                vec![node(0, None, &[5]), node(5, Some(0), &[])],
                vec![update(0, 10.0), update(5, 10.0)],
            ),
        );
        source.layer_mut(id(0)).property_changed = false;
        source.layer_mut(id(1)).update_rect = Rect::new(0.0, 0.0, 3.0, 3.0);
        mirror_layers(&mut target, &source);
        assert_eq!(target.ids(), source.ids());
        assert_eq!(target.root(), Some(id(0)));
        let copied = target.layer(id(1));
        assert_eq!(copied.props.bounds, Size::new(30.0, 10.0));
        assert!(!target.layer(id(0)).property_changed);
        assert_eq!(copied.update_rect, Rect::new(0.0, 0.0, 3.0, 3.0));
        assert_eq!(target.layer(id(0)).children, [id(1)]);
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental damage tracking per render surface.
//!
//! Each surface remembers, for every layer and nested surface drawn into it,
//! the rectangle it covered the last time damage was computed. A frame's
//! damage is built from:
//!
//! 1. each contributor: its mapped update rect if nothing else changed, or
//!    its old and new rectangles if it is new or restyled;
//! 2. the whole surface if its mask changed;
//! 3. the last rectangle of every contributor that is gone;
//! 4. growth by the surface's own pixel-moving filters.
//!
//! Entries are stamped with a per-accumulator generation ("mailbox"); anything
//! not stamped during an update was removed.
//!
//! Damage accumulates across updates until
//! [`did_draw_damaged_area`](DamageAccumulator::did_draw_damaged_area).

use alloc::vec::Vec;
use core::mem;

use kurbo::Rect;
use strata_core::filter::FilterOperations;
use strata_core::geometry;
use strata_core::layer::LayerId;

use crate::layer::{Layer, LayerArena};

#[derive(Clone, Copy, Debug, PartialEq)]
struct RectMapEntry {
    id: LayerId,
    rect: Rect,
    mailbox: u32,
}

/// Damage state for one [`RenderSurface`](crate::RenderSurface).
#[derive(Clone, Debug, Default)]
pub struct DamageAccumulator {
    /// Sorted by id.
    rect_history: Vec<RectMapEntry>,
    mailbox: u32,
    current_damage: Rect,
    next_update_damage: Rect,
    force_full_damage: bool,
}

impl DamageAccumulator {
    /// Creates an accumulator with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Damage accumulated since the last draw, in surface space.
    #[inline]
    #[must_use]
    pub fn current_damage_rect(&self) -> Rect {
        self.current_damage
    }

    /// Returns `true` if there is accumulated or scheduled damage.
    #[must_use]
    pub fn has_pending_damage(&self) -> bool {
        self.force_full_damage
            || !geometry::is_empty(self.current_damage)
            || !geometry::is_empty(self.next_update_damage)
    }

    /// Number of contributors the accumulator remembers.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.rect_history.len()
    }

    /// Clears the accumulated damage once it has been drawn.
    pub fn did_draw_damaged_area(&mut self) {
        self.current_damage = Rect::ZERO;
    }

    /// Adds `rect` (surface space) to the next update.
    pub fn add_damage_next_update(&mut self, rect: Rect) {
        self.next_update_damage = geometry::union(self.next_update_damage, rect);
    }

    /// Makes the next update damage the whole content rect.
    pub fn force_full_damage_next_update(&mut self) {
        self.force_full_damage = true;
    }

    /// Folds this frame's changes for the surface owned by `owner` into the
    /// accumulated damage.
    ///
    /// The surface's own accumulator must have been taken out of the arena
    /// (see [`update_damage`]); nested surfaces must already be up to date.
    pub fn update_damage_tracking_state(&mut self, arena: &LayerArena, owner: LayerId) {
        self.mailbox = self.mailbox.wrapping_add(1);
        let owner_layer = arena.layer(owner);
        let surface = arena.surface(owner);
        let content_rect = surface.content_rect;

        let mut damage = Rect::ZERO;
        for &member in &surface.layer_list {
            let layer = arena.layer(member);
            if member != owner && layer.has_surface() {
                self.extend_for_surface(arena, layer, &mut damage);
            } else {
                self.extend_for_layer(layer, &mut damage);
            }
        }
        damage = geometry::union(damage, damage_from_mask(arena, owner_layer, content_rect));
        damage = geometry::union(damage, self.take_leftover_rects());
        damage = geometry::union(damage, mem::take(&mut self.next_update_damage));
        if mem::take(&mut self.force_full_damage) {
            damage = geometry::union(damage, content_rect);
        }
        let filters = &owner_layer.props.filters;
        if filters.has_filter_that_moves_pixels() {
            damage = expand_inside(damage, content_rect, filters);
        }
        self.current_damage = geometry::union(self.current_damage, damage);
    }

    /// Records `rect` for `id` and returns the previous rect and whether the
    /// id is new.
    fn update_rect_data(&mut self, id: LayerId, rect: Rect) -> (Rect, bool) {
        let mailbox = self.mailbox;
        match self.rect_history.binary_search_by_key(&id, |e| e.id) {
            Ok(i) => {
                let entry = &mut self.rect_history[i];
                let old = entry.rect;
                entry.rect = rect;
                entry.mailbox = mailbox;
                (old, false)
            }
            Err(i) => {
                self.rect_history
                    .insert(i, RectMapEntry { id, rect, mailbox });
                (Rect::ZERO, true)
            }
        }
    }

    fn extend_for_layer(&mut self, layer: &Layer, damage: &mut Rect) {
        let rect_in_target = geometry::enclosing(layer.draw.drawable_content_rect);
        let (old, is_new) = self.update_rect_data(layer.id, rect_in_target);
        if is_new || layer.property_changed {
            // Both full rects, even when they overlap.
            *damage = geometry::union(*damage, old);
            *damage = geometry::union(*damage, rect_in_target);
        } else if !geometry::is_empty(layer.update_rect) {
            let mapped = layer
                .draw
                .draw_transform
                .map_rect_or(layer.update_rect, rect_in_target);
            *damage = geometry::union(
                *damage,
                geometry::intersect(geometry::enclosing(mapped), rect_in_target),
            );
        }
    }

    fn extend_for_surface(&mut self, arena: &LayerArena, layer: &Layer, damage: &mut Rect) {
        let Some(surface) = layer.render_surface.as_ref() else {
            return;
        };
        let has_replica = layer.replica_layer.is_some();
        let rect_in_target = geometry::enclosing(surface.drawable_content_rect(has_replica));

        // Pixels read through the background filter are widened before this
        // surface's own damage joins in.
        let background = &layer.props.background_filters;
        if background.has_filter_that_moves_pixels() {
            let widened = background.outsets().expand(*damage);
            *damage = geometry::union(*damage, geometry::intersect(widened, rect_in_target));
        }

        let (old, is_new) = self.update_rect_data(layer.id, rect_in_target);
        if is_new || surface.surface_property_changed {
            *damage = geometry::union(*damage, old);
            *damage = geometry::union(*damage, rect_in_target);
        } else {
            let local = surface.damage.current_damage_rect();
            let mut d = geometry::enclosing(
                surface.draw_transform.map_rect_or(local, rect_in_target),
            );
            if has_replica {
                d = geometry::union(
                    d,
                    geometry::enclosing(
                        surface
                            .replica_draw_transform
                            .map_rect_or(local, rect_in_target),
                    ),
                );
            }
            if surface.is_clipped {
                d = geometry::intersect(d, geometry::enclosing(surface.clip_rect));
            }
            *damage = geometry::union(*damage, d);
        }

        if let Some(replica) = layer.replica_layer
            && let Some(replica_mask) = arena.layer(replica).mask_layer
        {
            let mask = arena.layer(replica_mask);
            let rect = geometry::enclosing(
                surface
                    .replica_draw_transform
                    .map_rect_or(mask.content_rect(), rect_in_target),
            );
            let (_, is_new) = self.update_rect_data(replica_mask, rect);
            if is_new || mask.property_changed || !geometry::is_empty(mask.update_rect) {
                *damage = geometry::union(*damage, rect);
            }
        }
    }

    /// Removes entries not refreshed by this update and returns their union.
    fn take_leftover_rects(&mut self) -> Rect {
        let mailbox = self.mailbox;
        let mut damage = Rect::ZERO;
        self.rect_history.retain(|e| {
            if e.mailbox == mailbox {
                true
            } else {
                damage = geometry::union(damage, e.rect);
                false
            }
        });
        damage
    }
}

fn damage_from_mask(arena: &LayerArena, owner: &Layer, content_rect: Rect) -> Rect {
    let Some(mask) = owner.mask_layer else {
        return Rect::ZERO;
    };
    let mask = arena.layer(mask);
    if mask.property_changed || !geometry::is_empty(mask.update_rect) {
        content_rect
    } else {
        Rect::ZERO
    }
}

/// Grows `damage` by the filter outsets, limited to what the filter can reach
/// from `pre_filter_rect`.
fn expand_inside(damage: Rect, pre_filter_rect: Rect, filters: &FilterOperations) -> Rect {
    let outsets = filters.outsets();
    let expanded_damage = outsets.expand(damage);
    let filter_rect = outsets.expand(pre_filter_rect);
    geometry::union(damage, geometry::intersect(expanded_damage, filter_rect))
}

/// Updates every surface's damage, children before parents.
///
/// `surfaces` is the pre-order list from
/// [`compute_draw_properties`](crate::compute_draw_properties), so walking it
/// backwards visits each nested surface before the surface it contributes to.
///
/// # Panics
///
/// Panics if a listed layer owns no surface.
pub fn update_damage(arena: &mut LayerArena, surfaces: &[LayerId]) {
    for &owner in surfaces.iter().rev() {
        let mut tracker = match arena.layer_mut(owner).render_surface.as_mut() {
            Some(surface) => mem::take(&mut surface.damage),
            None => panic!("layer {owner:?} owns no render surface"),
        };
        tracker.update_damage_tracking_state(arena, owner);
        if let Some(surface) = arena.layer_mut(owner).render_surface.as_mut() {
            surface.damage = tracker;
        }
    }
}

/// Marks the accumulated damage of every listed surface as drawn.
pub fn did_draw_damaged_areas(arena: &mut LayerArena, surfaces: &[LayerId]) {
    for &owner in surfaces {
        if let Some(surface) = arena.layer_mut(owner).render_surface.as_mut() {
            surface.damage.did_draw_damaged_area();
        }
    }
}

/// Clears per-layer change flags once a frame has been drawn.
pub fn reset_change_tracking(arena: &mut LayerArena) {
    for layer in arena.iter_mut() {
        layer.property_changed = false;
        layer.update_rect = Rect::ZERO;
        if let Some(surface) = layer.render_surface.as_mut() {
            surface.surface_property_changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use strata_core::filter::FilterOperation;
    use strata_core::layer::LayerProperties;
    use strata_core::transform::Transform3d;

    use super::*;
    use crate::draw_properties::compute_draw_properties;
    use crate::test_util::{TreeBuilder, group, inputs, solid};

    fn frame(arena: &mut LayerArena) -> Vec<LayerId> {
        let list = compute_draw_properties(arena, &inputs(100.0, 100.0));
        update_damage(arena, &list);
        list
    }

    fn drawn(arena: &mut LayerArena, list: &[LayerId]) {
        did_draw_damaged_areas(arena, list);
        reset_change_tracking(arena);
    }

    fn damage(arena: &LayerArena, owner: LayerId) -> Rect {
        arena.surface(owner).damage.current_damage_rect()
    }

    fn two_layers() -> (LayerArena, LayerId, LayerId, LayerId) {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 10.0, 10.0), false));
        let b = t.child(root, solid(Rect::new(20.0, 20.0, 40.0, 40.0), false));
        (t.finish(), root, a, b)
    }

    #[test]
    fn new_layers_damage_their_rects() {
        let (mut arena, root, _, _) = two_layers();
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(0.0, 0.0, 40.0, 40.0));
        assert_eq!(arena.surface(root).damage.tracked_count(), 2);
    }

    #[test]
    fn unchanged_frame_has_no_damage() {
        let (mut arena, root, _, _) = two_layers();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::ZERO, "nothing changed");
        assert!(!arena.surface(root).damage.has_pending_damage());
    }

    #[test]
    fn update_rect_is_mapped_to_target() {
        let (mut arena, root, _, b) = two_layers();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(b).update_rect = Rect::new(0.0, 0.0, 5.0, 5.0);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(20.0, 20.0, 25.0, 25.0));
    }

    #[test]
    fn moved_layer_damages_old_and_new() {
        let (mut arena, root, a, _) = two_layers();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        let layer = arena.layer_mut(a);
        layer.props.transform = Transform3d::from_translation(50.0, 50.0, 0.0);
        layer.property_changed = true;
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(0.0, 0.0, 60.0, 60.0));
    }

    #[test]
    fn removed_layer_damages_last_rect_and_leaves_history() {
        let (mut arena, root, _, b) = two_layers();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(root).children.retain(|&c| c != b);
        let _ = arena.remove(b);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(20.0, 20.0, 40.0, 40.0));
        assert_eq!(arena.surface(root).damage.tracked_count(), 1, "history shrinks");
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::ZERO, "removal damages only once");
    }

    #[test]
    fn damage_accumulates_until_drawn() {
        let (mut arena, root, a, b) = two_layers();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(a).update_rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let _ = frame(&mut arena);
        reset_change_tracking(&mut arena);
        arena.layer_mut(b).update_rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(0.0, 0.0, 21.0, 21.0));
    }

    #[test]
    fn forced_and_scheduled_damage() {
        let (mut arena, root, _, _) = two_layers();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        if let Some(surface) = arena.layer_mut(root).render_surface.as_mut() {
            surface.damage.add_damage_next_update(Rect::new(90.0, 90.0, 95.0, 95.0));
        }
        let list = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(90.0, 90.0, 95.0, 95.0));
        drawn(&mut arena, &list);
        if let Some(surface) = arena.layer_mut(root).render_surface.as_mut() {
            surface.damage.force_full_damage_next_update();
        }
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(0.0, 0.0, 100.0, 100.0));
    }

    fn nested(filters: FilterOperations) -> (LayerArena, LayerId, LayerId, LayerId) {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let s = t.child(root, group(50.0, 50.0));
        t.update(s, |p| {
            p.force_render_surface = true;
            p.transform = Transform3d::from_translation(20.0, 20.0, 0.0);
            p.filters = filters;
        });
        let c = t.child(s, solid(Rect::new(0.0, 0.0, 10.0, 10.0), false));
        (t.finish(), root, s, c)
    }

    #[test]
    fn nested_surface_damage_reaches_parent() {
        let (mut arena, root, s, c) = nested(FilterOperations::new());
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(c).update_rect = Rect::new(0.0, 0.0, 5.0, 5.0);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, s), Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(damage(&arena, root), Rect::new(20.0, 20.0, 25.0, 25.0));
    }

    #[test]
    fn restyled_surface_damages_whole_footprint() {
        let (mut arena, root, s, _) = nested(FilterOperations::new());
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        let layer = arena.layer_mut(s);
        layer.props.opacity = 0.5;
        layer.property_changed = true;
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(20.0, 20.0, 30.0, 30.0));
    }

    #[test]
    fn blur_expands_surface_damage() {
        let (mut arena, root, s, c) =
            nested(FilterOperations::from(alloc::vec![FilterOperation::Blur(2.0)]));
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(c).update_rect = Rect::new(0.0, 0.0, 5.0, 5.0);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, s), Rect::new(-6.0, -6.0, 11.0, 11.0));
        assert_eq!(damage(&arena, root), Rect::new(14.0, 14.0, 31.0, 31.0));
    }

    #[test]
    fn background_filter_widens_only_damage_beneath() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let s = t.child(root, solid(Rect::new(40.0, 40.0, 60.0, 60.0), false));
        t.update(s, |p| {
            p.force_render_surface = true;
            p.background_filters = FilterOperations::from(alloc::vec![FilterOperation::Blur(1.0)]);
        });
        let mut arena = t.finish();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);

        arena.layer_mut(a).update_rect = Rect::new(38.0, 38.0, 39.0, 39.0);
        let list = frame(&mut arena);
        assert_eq!(
            damage(&arena, root),
            Rect::new(38.0, 38.0, 42.0, 42.0),
            "widened damage stays inside the filtered surface"
        );
        drawn(&mut arena, &list);

        arena.layer_mut(s).update_rect = Rect::new(0.0, 0.0, 5.0, 5.0);
        let _ = frame(&mut arena);
        assert_eq!(
            damage(&arena, root),
            Rect::new(40.0, 40.0, 45.0, 45.0),
            "the surface's own damage is not widened"
        );
    }

    #[test]
    fn mask_change_damages_whole_surface() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let s = t.child(root, solid(Rect::new(0.0, 0.0, 30.0, 30.0), false));
        let mask = t.mask(s, group(30.0, 30.0));
        let _ = t.child(s, solid(Rect::new(0.0, 0.0, 10.0, 10.0), false));
        let mut arena = t.finish();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(mask).update_rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, s), Rect::new(0.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn replica_doubles_nested_damage() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let s = t.child(root, group(20.0, 20.0));
        let _ = t.replica(
            s,
            LayerProperties {
                transform: Transform3d::from_translation(50.0, 0.0, 0.0),
                ..group(20.0, 20.0)
            },
        );
        let c = t.child(s, solid(Rect::new(0.0, 0.0, 10.0, 10.0), false));
        let mut arena = t.finish();
        let list = frame(&mut arena);
        drawn(&mut arena, &list);
        arena.layer_mut(c).update_rect = Rect::new(0.0, 0.0, 2.0, 2.0);
        let _ = frame(&mut arena);
        assert_eq!(damage(&arena, root), Rect::new(0.0, 0.0, 52.0, 2.0));
    }
}

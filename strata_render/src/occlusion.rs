// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion accumulated during a front-to-back walk.
//!
//! The accumulator keeps one frame per render target on the walk's current
//! path. Each frame splits what is known to be opaque into occlusion from
//! layers drawn into that target (`inside`) and occlusion inherited from
//! outside it (`outside`), both in the target's space. Every region here is
//! an under-approximation: a rect is only added when it is known to be
//! covered, so a query never hides something that can show.
//!
//! ```text
//!   enter  Itself              → enter_render_target(target)
//!   enter  TargetSurface       → finished_render_target(target)
//!   leave  Itself              → mark_occluded_behind_layer(layer)
//!   leave  ContributingSurface → leave_to_render_target(parent target)
//! ```

use alloc::vec::Vec;

use kurbo::{Rect, Size};
use strata_core::filter::FilterOperations;
use strata_core::geometry;
use strata_core::layer::LayerId;
use strata_core::region::Region;
use strata_core::transform::Transform3d;

use crate::layer::LayerArena;
use crate::surface::RenderSurface;
use crate::traversal::{StepRole, TraversalStep};

/// Tuning for [`OcclusionAccumulator`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OcclusionConfig {
    /// Opaque rects smaller than this in both dimensions are not tracked.
    pub minimum_tracking_size: Size,
    /// Upper bound on rectangles per region; the smallest are dropped.
    pub max_region_complexity: usize,
}

impl OcclusionConfig {
    /// Tracks everything, up to 32 rectangles per region.
    pub const DEFAULT: Self = Self {
        minimum_tracking_size: Size::ZERO,
        max_region_complexity: 32,
    };
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Occlusion as seen by one layer or surface, in its target's space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Occlusion {
    draw_transform: Transform3d,
    outside: Region,
    inside: Region,
}

impl Occlusion {
    /// Creates an occlusion for content mapped by `draw_transform`.
    #[must_use]
    pub fn new(draw_transform: Transform3d, outside: Region, inside: Region) -> Self {
        Self {
            draw_transform,
            outside,
            inside,
        }
    }

    /// Returns `true` if anything is known to be occluded.
    #[must_use]
    pub fn has_occlusion(&self) -> bool {
        !self.inside.is_empty() || !self.outside.is_empty()
    }

    /// Unoccluded part of `content_rect` in target space, or `None` if the
    /// rect cannot be mapped.
    fn unoccluded_in_target(&self, content_rect: Rect) -> Option<Rect> {
        let mapped = geometry::enclosing(self.draw_transform.map_rect_bounds(content_rect)?);
        let mut region = Region::from_rect(mapped);
        region.subtract_region(&self.inside);
        region.subtract_region(&self.outside);
        Some(region.bounds())
    }

    /// Returns `true` if every pixel of `content_rect` (content space) is
    /// covered. Empty rects are trivially occluded.
    #[must_use]
    pub fn is_occluded(&self, content_rect: Rect) -> bool {
        if geometry::is_empty(content_rect) {
            return true;
        }
        if !self.has_occlusion() {
            return false;
        }
        self.unoccluded_in_target(content_rect)
            .is_some_and(geometry::is_empty)
    }

    /// Smallest rect covering the part of `content_rect` that can show, in
    /// content space.
    #[must_use]
    pub fn unoccluded_content_rect(&self, content_rect: Rect) -> Rect {
        if geometry::is_empty(content_rect) || !self.has_occlusion() {
            return content_rect;
        }
        let Some(unoccluded) = self.unoccluded_in_target(content_rect) else {
            return content_rect;
        };
        if geometry::is_empty(unoccluded) {
            return Rect::ZERO;
        }
        match self.draw_transform.inverse() {
            Some(inv) => geometry::intersect(
                geometry::enclosing(inv.map_rect_or(unoccluded, content_rect)),
                content_rect,
            ),
            None => content_rect,
        }
    }
}

#[derive(Clone, Debug)]
struct StackFrame {
    target: LayerId,
    inside: Region,
    outside: Region,
}

/// Stack machine that accumulates occlusion over a
/// [`SurfaceTraversal::front_to_back`](crate::SurfaceTraversal::front_to_back)
/// walk.
#[derive(Clone, Debug)]
pub struct OcclusionAccumulator {
    screen_space_clip_rect: Rect,
    config: OcclusionConfig,
    stack: Vec<StackFrame>,
}

impl OcclusionAccumulator {
    /// Creates an accumulator that only tracks occlusion inside
    /// `screen_space_clip_rect`.
    #[must_use]
    pub fn new(screen_space_clip_rect: Rect, config: OcclusionConfig) -> Self {
        Self {
            screen_space_clip_rect,
            config,
            stack: Vec::new(),
        }
    }

    /// Number of frames on the stack.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Call before processing `step`.
    pub fn enter_layer(&mut self, arena: &LayerArena, step: TraversalStep) {
        match step.role {
            StepRole::Itself => self.enter_render_target(arena, step.target),
            StepRole::TargetSurface => self.finished_render_target(arena, step.layer),
            StepRole::ContributingSurface => {}
        }
    }

    /// Call after processing `step`.
    pub fn leave_layer(&mut self, arena: &LayerArena, step: TraversalStep) {
        match step.role {
            StepRole::Itself => self.mark_occluded_behind_layer(arena, step.layer),
            StepRole::ContributingSurface => self.leave_to_render_target(arena, step.target),
            StepRole::TargetSurface => {}
        }
    }

    /// Occlusion for a layer drawn into the current target.
    ///
    /// # Panics
    ///
    /// Panics if no target has been entered.
    #[must_use]
    pub fn current_occlusion_for_layer(&self, draw_transform: Transform3d) -> Occlusion {
        let top = self.top();
        Occlusion::new(draw_transform, top.outside.clone(), top.inside.clone())
    }

    /// Occlusion for the surface on top of the stack, as drawn into its
    /// parent target. A surface is never occluded by its own contents.
    #[must_use]
    pub fn current_occlusion_for_contributing_surface(
        &self,
        draw_transform: Transform3d,
    ) -> Occlusion {
        let n = self.stack.len();
        if n < 2 {
            return Occlusion::new(draw_transform, Region::new(), Region::new());
        }
        let below = &self.stack[n - 2];
        Occlusion::new(draw_transform, below.outside.clone(), below.inside.clone())
    }

    /// The part of the screen clip not covered by anything, once the walk
    /// has finished the root surface.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty or its top is not the root surface.
    #[must_use]
    pub fn compute_visible_region_in_screen(&self, arena: &LayerArena) -> Region {
        let top = self.top();
        assert!(
            arena.root() == Some(top.target),
            "visible region requested before reaching the root surface"
        );
        let mut visible = Region::from_rect(self.screen_space_clip_rect);
        visible.subtract_region(&top.inside);
        visible
    }

    fn top(&self) -> &StackFrame {
        match self.stack.last() {
            Some(top) => top,
            None => panic!("occlusion stack underflow"),
        }
    }

    fn top_mut(&mut self) -> &mut StackFrame {
        match self.stack.last_mut() {
            Some(top) => top,
            None => panic!("occlusion stack underflow"),
        }
    }

    fn enter_render_target(&mut self, arena: &LayerArena, new_target: LayerId) {
        if self.stack.last().is_some_and(|f| f.target == new_target) {
            return;
        }
        let old_target = self.stack.last().map(|f| f.target);
        self.stack.push(StackFrame {
            target: new_target,
            inside: Region::new(),
            outside: Region::new(),
        });

        let surface = arena.surface(new_target);
        let entering_root = arena.root() == Some(new_target);
        let Some(old_target) = old_target else {
            return;
        };
        // Surfaces nested under the same immune ancestor still occlude each other.
        let immune = surface.nearest_occlusion_immune_ancestor;
        let entering_unoccluded_subtree = immune.is_some()
            && immune != arena.surface(old_target).nearest_occlusion_immune_ancestor;
        if entering_unoccluded_subtree || entering_root {
            return;
        }
        let Some(inverse_screen) = surface.screen_space_transform.inverse() else {
            return;
        };
        let old_to_new = inverse_screen * arena.surface(old_target).screen_space_transform;
        let n = self.stack.len();
        let previous = &self.stack[n - 2];
        let mut outside = transform_region(&previous.outside, None, &old_to_new);
        outside.union_region(&transform_region(&previous.inside, None, &old_to_new));
        outside.limit_complexity(self.config.max_region_complexity);
        self.stack[n - 1].outside = outside;
    }

    fn finished_render_target(&mut self, arena: &LayerArena, finished: LayerId) {
        self.enter_render_target(arena, finished);
        let layer = arena.layer(finished);
        let surface = arena.surface(finished);
        let only_for_copy_request = layer.props.has_copy_request && surface.is_hidden_for_read_back;
        // Occlusion inside these cannot be applied to anything outside them.
        if layer.mask_layer.is_some()
            || surface.draw_opacity < 1.0
            || !layer.props.blend_mode.is_default()
            || only_for_copy_request
            || layer.props.filters.has_filter_that_affects_opacity()
        {
            let top = self.top_mut();
            top.outside.clear();
            top.inside.clear();
        }
    }

    fn leave_to_render_target(&mut self, arena: &LayerArena, new_target: LayerId) {
        let n = self.stack.len();
        assert!(n > 0, "occlusion stack underflow");
        let surface_will_be_at_top_after_pop = n > 1 && self.stack[n - 2].target == new_target;

        let old_target = self.stack[n - 1].target;
        let old_layer = arena.layer(old_target);
        let old_surface = arena.surface(old_target);
        let clip = old_surface.is_clipped.then_some(old_surface.clip_rect);

        let top = &self.stack[n - 1];
        let mut inside_in_new = transform_region(&top.inside, clip, &old_surface.draw_transform);
        let replica_has_mask = old_layer
            .replica_layer
            .is_some_and(|r| arena.layer(r).mask_layer.is_some());
        if old_layer.replica_layer.is_some() && !replica_has_mask {
            inside_in_new.union_region(&transform_region(
                &top.inside,
                clip,
                &old_surface.replica_draw_transform,
            ));
        }
        let outside_in_new = transform_region(&top.outside, None, &old_surface.draw_transform);

        let background = &old_layer.props.background_filters;
        let moves_pixels = background.has_filter_that_moves_pixels();
        let mut unoccluded_surface_rect = Rect::ZERO;
        let mut unoccluded_replica_rect = Rect::ZERO;
        if moves_pixels {
            unoccluded_surface_rect = self
                .current_occlusion_for_contributing_surface(old_surface.draw_transform)
                .unoccluded_content_rect(old_surface.content_rect);
            if old_layer.replica_layer.is_some() {
                unoccluded_replica_rect = self
                    .current_occlusion_for_contributing_surface(
                        old_surface.replica_draw_transform,
                    )
                    .unoccluded_content_rect(old_surface.content_rect);
            }
        }

        let new_is_root = arena.root() == Some(new_target);
        if surface_will_be_at_top_after_pop {
            self.stack.pop();
            let top = self.top_mut();
            top.inside.union_region(&inside_in_new);
            if !new_is_root {
                top.outside.union_region(&outside_in_new);
            }
        } else {
            let top = self.top_mut();
            top.target = new_target;
            top.inside = inside_in_new;
            top.outside = if new_is_root {
                Region::new()
            } else {
                outside_in_new
            };
        }

        let max = self.config.max_region_complexity;
        let top = self.top_mut();
        if moves_pixels {
            for (rect, transform) in [
                (unoccluded_surface_rect, old_surface.draw_transform),
                (
                    unoccluded_replica_rect,
                    old_surface.replica_draw_transform,
                ),
            ] {
                reduce_occlusion_below_surface(
                    old_surface,
                    rect,
                    &transform,
                    background,
                    &mut top.inside,
                );
                reduce_occlusion_below_surface(
                    old_surface,
                    rect,
                    &transform,
                    background,
                    &mut top.outside,
                );
            }
        }
        top.inside.limit_complexity(max);
        top.outside.limit_complexity(max);
    }

    fn mark_occluded_behind_layer(&mut self, arena: &LayerArena, id: LayerId) {
        if self.stack.is_empty() {
            return;
        }
        let layer = arena.layer(id);
        let draw = &layer.draw;
        if !layer.draws_content()
            || draw.opacity < 1.0
            || !layer.props.blend_mode.is_default()
            || layer.props.sorted_in_3d
            || !draw.draw_transform.preserves_2d_axis_alignment()
        {
            return;
        }
        let opaque = layer.visible_opaque_rect();
        if geometry::is_empty(opaque) {
            return;
        }
        let Some(target) = draw.render_target else {
            return;
        };
        let target_surface = arena.surface(target);
        let mut clip_in_target = self.screen_space_clip_rect_in_target_surface(target_surface);
        clip_in_target = geometry::intersect(
            clip_in_target,
            if draw.is_clipped {
                draw.clip_rect
            } else {
                target_surface.content_rect
            },
        );
        let Some(mapped) = draw.draw_transform.map_enclosed_axis_aligned(opaque) else {
            return;
        };
        let rect = geometry::intersect(mapped, clip_in_target);
        let min = self.config.minimum_tracking_size;
        if rect.width() < min.width && rect.height() < min.height {
            return;
        }
        let max = self.config.max_region_complexity;
        let top = self.top_mut();
        top.inside.union_rect(rect);
        top.inside.limit_complexity(max);
    }

    fn screen_space_clip_rect_in_target_surface(&self, surface: &RenderSurface) -> Rect {
        match surface.screen_space_transform.inverse() {
            Some(inverse) => geometry::enclosing(
                inverse.map_rect_or(self.screen_space_clip_rect, surface.content_rect),
            ),
            None => surface.content_rect,
        }
    }
}

/// Maps each rect of `region` into a new target, rounding inward. Anything
/// that would not stay axis-aligned is dropped.
fn transform_region(region: &Region, clip: Option<Rect>, transform: &Transform3d) -> Region {
    let mut out = Region::new();
    if region.is_empty() || !transform.preserves_2d_axis_alignment() {
        return out;
    }
    for r in region.rects() {
        if let Some(mut mapped) = transform.map_enclosed_axis_aligned(*r) {
            if let Some(clip) = clip {
                mapped = geometry::intersect(mapped, clip);
            }
            out.union_rect(mapped);
        }
    }
    out
}

/// Removes occlusion a pixel-moving background filter can see through: the
/// filter reads pixels from around the surface, so whatever is beneath that
/// neighborhood has to be drawn.
fn reduce_occlusion_below_surface(
    surface: &RenderSurface,
    surface_rect: Rect,
    transform: &Transform3d,
    filters: &FilterOperations,
    occlusion: &mut Region,
) {
    if geometry::is_empty(surface_rect) {
        return;
    }
    let Some(mapped) = transform.map_rect_bounds(surface_rect) else {
        occlusion.clear();
        return;
    };
    let mut affected = geometry::enclosing(mapped);
    if surface.is_clipped {
        affected = geometry::intersect(affected, surface.clip_rect);
    }
    if geometry::is_empty(affected) {
        return;
    }
    let o = filters.outsets();
    // The filter can pull pixels from outside the clip.
    let affected = o.expand(affected);

    let mut affected_occlusion = occlusion.clone();
    affected_occlusion.intersect_rect(affected);
    occlusion.subtract_rect(affected);
    for r in affected_occlusion.rects() {
        // The left outset pulls pixels from the right, shrinking the right
        // edge of what stays opaque (and so on for each edge).
        let shrink_left = if r.x0 == affected.x0 { 0.0 } else { o.right };
        let shrink_top = if r.y0 == affected.y0 { 0.0 } else { o.bottom };
        let shrink_right = if r.x1 == affected.x1 { 0.0 } else { o.left };
        let shrink_bottom = if r.y1 == affected.y1 { 0.0 } else { o.top };
        let shrunk = Rect::new(
            r.x0 + shrink_left,
            r.y0 + shrink_top,
            r.x1 - shrink_right,
            r.y1 - shrink_bottom,
        );
        if !geometry::is_empty(shrunk) {
            occlusion.union_rect(shrunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use strata_core::filter::FilterOperation;
    use strata_core::layer::LayerProperties;

    use super::*;
    use crate::draw_properties::compute_draw_properties;
    use crate::test_util::{TreeBuilder, group, inputs, solid};
    use crate::traversal::SurfaceTraversal;

    const SCREEN: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);

    /// Runs a front-to-back walk, calling `visit` between enter and leave.
    fn walk(
        arena: &LayerArena,
        list: &[LayerId],
        config: OcclusionConfig,
        mut visit: impl FnMut(TraversalStep, &OcclusionAccumulator),
    ) -> OcclusionAccumulator {
        let mut occ = OcclusionAccumulator::new(SCREEN, config);
        for step in SurfaceTraversal::front_to_back(arena, list) {
            occ.enter_layer(arena, step);
            visit(step, &occ);
            occ.leave_layer(arena, step);
        }
        occ
    }

    /// Occlusion each content layer saw when it was visited.
    fn occlusion_seen(
        arena: &LayerArena,
        list: &[LayerId],
        config: OcclusionConfig,
    ) -> (Vec<(LayerId, Occlusion)>, OcclusionAccumulator) {
        let mut seen = Vec::new();
        let occ = walk(arena, list, config, |step, occ| {
            if step.represents_itself() {
                let dt = arena.layer(step.layer).draw.draw_transform;
                seen.push((step.layer, occ.current_occlusion_for_layer(dt)));
            }
        });
        (seen, occ)
    }

    fn seen_by(seen: &[(LayerId, Occlusion)], id: LayerId) -> &Occlusion {
        match seen.iter().find(|(l, _)| *l == id) {
            Some((_, o)) => o,
            None => panic!("{id:?} was never visited"),
        }
    }

    #[test]
    fn three_layer_scenario() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let b = t.child(root, solid(Rect::new(50.0, 0.0, 100.0, 100.0), true));
        let c = t.child(root, solid(Rect::new(10.0, 10.0, 20.0, 20.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));

        let order: Vec<_> = SurfaceTraversal::back_to_front(&arena, &list)
            .filter(TraversalStep::represents_itself)
            .map(|s| s.layer)
            .collect();
        assert_eq!(order, [a, b, c], "painting order");

        let (seen, occ) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        let for_a = seen_by(&seen, a);
        assert!(
            for_a.is_occluded(Rect::new(50.0, 0.0, 100.0, 100.0)),
            "B covers the right half of A"
        );
        assert_eq!(
            for_a.unoccluded_content_rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
            Rect::new(0.0, 0.0, 50.0, 100.0)
        );
        let for_c = seen_by(&seen, c);
        assert!(!for_c.has_occlusion(), "nothing is in front of C");
        assert!(!for_c.is_occluded(Rect::new(0.0, 0.0, 10.0, 10.0)));

        let visible = occ.compute_visible_region_in_screen(&arena);
        assert_eq!(visible.area(), 100.0 * 100.0 - 50.0 * 100.0 - 10.0 * 10.0);
        assert!(!visible.intersects_rect(Rect::new(50.0, 0.0, 100.0, 100.0)));
        assert!(!visible.intersects_rect(Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(visible.contains_rect(Rect::new(0.0, 20.0, 50.0, 100.0)));
    }

    #[test]
    fn translucent_surface_does_not_occlude() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let g = t.child(
            root,
            LayerProperties {
                opacity: 0.5,
                ..group(100.0, 100.0)
            },
        );
        let _ = t.child(g, solid(Rect::new(0.0, 0.0, 50.0, 50.0), true));
        let _ = t.child(g, solid(Rect::new(50.0, 50.0, 100.0, 100.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        assert_eq!(list.len(), 2, "opacity group owns a surface");
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        assert!(!seen_by(&seen, a).has_occlusion(), "nothing opaque reaches A");
    }

    #[test]
    fn nested_surface_occlusion_merges_into_parent() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let s = t.child(root, group(50.0, 50.0));
        t.update(s, |p| {
            p.force_render_surface = true;
            p.transform = Transform3d::from_translation(20.0, 20.0, 0.0);
        });
        let _ = t.child(s, solid(Rect::new(0.0, 0.0, 30.0, 30.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let (seen, occ) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        assert!(seen_by(&seen, a).is_occluded(Rect::new(20.0, 20.0, 50.0, 50.0)));
        assert!(!seen_by(&seen, a).is_occluded(Rect::new(19.0, 20.0, 50.0, 50.0)));
        assert_eq!(occ.depth(), 1, "only the root frame remains");
    }

    #[test]
    fn masked_surface_does_not_occlude() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let s = t.child(root, group(50.0, 50.0));
        let _ = t.mask(s, group(50.0, 50.0));
        let _ = t.child(s, solid(Rect::new(0.0, 0.0, 50.0, 50.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        assert!(!seen_by(&seen, a).has_occlusion());
    }

    fn immune_fixture(immune: bool) -> (LayerArena, Vec<LayerId>, LayerId) {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let i = t.child(root, group(100.0, 100.0));
        t.update(i, |p| {
            p.force_render_surface = true;
            p.occlusion_immune = immune;
        });
        let x = t.child(i, solid(Rect::new(0.0, 0.0, 50.0, 50.0), false));
        let _ = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        (arena, list, x)
    }

    #[test]
    fn occlusion_does_not_cross_immune_boundary() {
        let (arena, list, x) = immune_fixture(true);
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        let for_x = seen_by(&seen, x);
        assert!(!for_x.has_occlusion(), "immune subtree inherits no occlusion");
        assert!(!for_x.is_occluded(Rect::new(0.0, 0.0, 50.0, 50.0)));

        let (arena, list, x) = immune_fixture(false);
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        assert!(
            seen_by(&seen, x).is_occluded(Rect::new(0.0, 0.0, 50.0, 50.0)),
            "without immunity the front layer covers X"
        );
    }

    #[test]
    fn surfaces_under_one_immune_ancestor_occlude_each_other() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let i = t.child(root, group(100.0, 100.0));
        t.update(i, |p| {
            p.force_render_surface = true;
            p.occlusion_immune = true;
        });
        let x = t.child(i, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let inner = t.child(i, group(100.0, 100.0));
        t.update(inner, |p| p.force_render_surface = true);
        let y = t.child(inner, solid(Rect::new(0.0, 0.0, 50.0, 50.0), false));
        let _ = t.child(i, solid(Rect::new(0.0, 0.0, 40.0, 40.0), true));
        let _ = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        assert_eq!(list.len(), 3, "root, immune and inner surfaces");
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);

        let for_y = seen_by(&seen, y);
        assert!(
            for_y.is_occluded(Rect::new(0.0, 0.0, 40.0, 40.0)),
            "the inner surface inherits occlusion from its immune parent"
        );
        assert!(
            !for_y.is_occluded(Rect::new(0.0, 0.0, 50.0, 50.0)),
            "the layer in front of the immune surface stays outside it"
        );
        assert!(seen_by(&seen, x).is_occluded(Rect::new(0.0, 0.0, 40.0, 40.0)));
    }

    #[test]
    fn outside_occlusion_survives_target_replace() {
        // The inner surface is left before its parent surface is ever
        // entered, so its frame is retargeted instead of popped.
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let outer = t.child(root, group(100.0, 100.0));
        t.update(outer, |p| p.force_render_surface = true);
        let m = t.child(outer, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let inner = t.child(outer, group(100.0, 100.0));
        t.update(inner, |p| p.force_render_surface = true);
        let _ = t.child(inner, solid(Rect::new(60.0, 60.0, 80.0, 80.0), true));
        let _ = t.child(root, solid(Rect::new(0.0, 0.0, 50.0, 100.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let (seen, occ) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);

        let for_m = seen_by(&seen, m);
        assert!(
            for_m.is_occluded(Rect::new(0.0, 0.0, 50.0, 100.0)),
            "the front layer still covers M after the inner surface is left"
        );
        assert!(
            for_m.is_occluded(Rect::new(60.0, 60.0, 80.0, 80.0)),
            "the inner surface's content covers M"
        );
        assert!(!for_m.is_occluded(Rect::new(50.0, 0.0, 60.0, 100.0)));
        assert_eq!(occ.depth(), 1, "only the root frame remains");
    }

    #[test]
    fn background_blur_reduces_occlusion_beneath() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let s = t.child(root, solid(Rect::new(40.0, 0.0, 60.0, 100.0), false));
        t.update(s, |p| {
            p.background_filters = FilterOperations::from(alloc::vec![FilterOperation::Blur(1.0)]);
        });
        let _ = t.child(root, solid(Rect::new(0.0, 0.0, 50.0, 100.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        let for_a = seen_by(&seen, a);
        assert!(for_a.is_occluded(Rect::new(0.0, 0.0, 47.0, 100.0)));
        assert!(
            !for_a.is_occluded(Rect::new(47.0, 0.0, 50.0, 100.0)),
            "the blur reads pixels next to its surface"
        );
    }

    #[test]
    fn small_rects_are_not_tracked() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let a = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let _ = t.child(root, solid(Rect::new(10.0, 10.0, 20.0, 20.0), true));
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let config = OcclusionConfig {
            minimum_tracking_size: Size::new(20.0, 20.0),
            ..OcclusionConfig::DEFAULT
        };
        let (seen, _) = occlusion_seen(&arena, &list, config);
        assert!(!seen_by(&seen, a).has_occlusion());
    }

    #[test]
    fn occlusion_never_covers_visible_content() {
        // Every rect reported unoccluded for a layer must contain all of the
        // layer's pixels that are not under an opaque layer in front of it.
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let back = t.child(root, solid(Rect::new(0.0, 0.0, 100.0, 100.0), false));
        let _ = t.child(root, solid(Rect::new(0.0, 0.0, 30.0, 100.0), true));
        let _ = t.child(
            root,
            LayerProperties {
                opacity: 0.5,
                ..solid(Rect::new(30.0, 0.0, 60.0, 100.0), true)
            },
        );
        let _ = t.child(
            root,
            LayerProperties {
                transform: Transform3d::from_translation(70.0, 10.0, 0.0)
                    * Transform3d::from_rotation_z(0.3),
                ..solid(Rect::new(0.0, 0.0, 20.0, 20.0), true)
            },
        );
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let (seen, _) = occlusion_seen(&arena, &list, OcclusionConfig::DEFAULT);
        let unoccluded = seen_by(&seen, back).unoccluded_content_rect(SCREEN);
        assert_eq!(
            unoccluded,
            Rect::new(30.0, 0.0, 100.0, 100.0),
            "only the opaque, fully visible, axis-aligned layer occludes"
        );
    }

    #[test]
    #[should_panic(expected = "occlusion stack underflow")]
    fn visible_region_on_empty_stack_panics() {
        let arena = LayerArena::new();
        let occ = OcclusionAccumulator::new(SCREEN, OcclusionConfig::DEFAULT);
        let _ = occ.compute_visible_region_in_screen(&arena);
    }

    #[test]
    #[should_panic(expected = "before reaching the root surface")]
    fn visible_region_inside_nested_surface_panics() {
        let mut t = TreeBuilder::new();
        let root = t.root(group(100.0, 100.0));
        let s = t.child(root, solid(Rect::new(0.0, 0.0, 10.0, 10.0), false));
        t.update(s, |p| p.force_render_surface = true);
        let mut arena = t.finish();
        let list = compute_draw_properties(&mut arena, &inputs(100.0, 100.0));
        let mut occ = OcclusionAccumulator::new(SCREEN, OcclusionConfig::DEFAULT);
        let first = SurfaceTraversal::front_to_back(&arena, &list).next();
        if let Some(step) = first {
            occ.enter_layer(&arena, step);
        }
        let _ = occ.compute_visible_region_in_screen(&arena);
    }
}

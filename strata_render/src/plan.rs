// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: what the output surface draws for one frame.
//!
//! A [`RenderPlan`] holds one [`RenderPass`] per render surface, ordered so
//! that every nested surface is drawn before the pass that samples it. The
//! root pass is always last. Items inside a pass are back to front.
//!
//! Items whose footprint misses the pass damage are culled, as is content
//! that occlusion proves cannot show. A pass with an empty damage rect is
//! expected to be served from the texture the presenter kept for the same
//! target.

use alloc::vec::Vec;

use kurbo::Rect;
use strata_core::geometry;
use strata_core::layer::{BlendMode, LayerId, UiResourceId};
use strata_core::region::Region;
use strata_core::transform::Transform3d;

use crate::damage_region::DamageRegion;
use crate::layer::LayerArena;
use crate::occlusion::{OcclusionAccumulator, OcclusionConfig};
use crate::traversal::{StepRole, SurfaceTraversal, TraversalStep};

/// The presenter's handle for an uploaded UI resource bitmap.
///
/// The resource manager hands one out per [`UiResourceId`] upload; content
/// items carry it so the presenter can bind the bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(pub u64);

/// What a [`RenderItem`] draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    /// A layer's own content.
    Content {
        /// Bitmap backing the layer, if it names a known UI resource.
        resource: Option<ResourceKey>,
    },
    /// The output of `source`'s pass, composited as a quad.
    Surface {
        /// Owner of the sampled surface.
        source: LayerId,
        /// Mask applied to the quad.
        mask: Option<LayerId>,
    },
    /// The reflected copy of `source`'s pass.
    Replica {
        /// Owner of the sampled surface.
        source: LayerId,
        /// Mask applied to the reflected quad.
        mask: Option<LayerId>,
    },
}

/// A single draw inside a [`RenderPass`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// The layer that produced this item.
    pub layer_id: LayerId,
    /// What to draw.
    pub kind: ItemKind,
    /// Item space to pass space.
    pub draw_transform: Transform3d,
    /// Opacity relative to the pass.
    pub opacity: f32,
    /// Clip in pass space.
    pub clip: Option<Rect>,
    /// How the item blends with what is beneath it.
    pub blend_mode: BlendMode,
    /// Part of the item that can show, in item space.
    pub visible_rect: Rect,
}

/// Everything drawn into one render surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    /// Owner of the surface.
    pub target: LayerId,
    /// Extent of the pass texture, in pass space.
    pub output_rect: Rect,
    /// Part of the pass that must be redrawn, in pass space.
    pub damage_rect: Rect,
    /// Pass space to screen space.
    pub transform_to_root: Transform3d,
    /// Items back to front.
    pub items: Vec<RenderItem>,
}

/// The output of [`build_render_plan`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPlan {
    /// Passes, nested surfaces before their parents; the root pass is last.
    pub passes: Vec<RenderPass>,
    /// Damage of the root pass, classified against the screen.
    pub root_damage: DamageRegion,
    /// Screen area not covered by opaque content.
    pub visible_region: Region,
}

impl RenderPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all passes, retaining allocated capacity.
    pub fn clear(&mut self) {
        self.passes.clear();
        self.root_damage = DamageRegion::None;
        self.visible_region.clear();
    }

    /// The root pass, if the plan has any.
    #[must_use]
    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.passes.last()
    }

    /// Total number of items across all passes.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.passes.iter().map(|p| p.items.len()).sum()
    }
}

/// Builds the render plan for a tree whose draw properties and damage are
/// up to date.
///
/// `screen_clip` bounds the occlusion tracking and the visible region.
/// `resolve` maps the UI resources named by layers to presenter resources.
///
/// # Panics
///
/// Panics if `surfaces` is not the list produced for `arena` by
/// [`compute_draw_properties`](crate::compute_draw_properties).
#[must_use]
pub fn build_render_plan(
    arena: &LayerArena,
    surfaces: &[LayerId],
    screen_clip: Rect,
    config: OcclusionConfig,
    resolve: impl Fn(UiResourceId) -> Option<ResourceKey>,
) -> RenderPlan {
    let mut plan = RenderPlan::new();
    let Some(&root) = surfaces.first() else {
        return plan;
    };
    let mut occlusion = OcclusionAccumulator::new(screen_clip, config);
    // Items per open target, front to back.
    let mut pending: Vec<(LayerId, Vec<RenderItem>)> = Vec::new();

    for step in SurfaceTraversal::front_to_back(arena, surfaces) {
        occlusion.enter_layer(arena, step);
        match step.role {
            StepRole::Itself => {
                if let Some(item) = content_item(arena, step, &occlusion, &resolve) {
                    items_for(&mut pending, step.target).push(item);
                }
            }
            StepRole::ContributingSurface => {
                let items = surface_items(arena, step, &occlusion);
                items_for(&mut pending, step.target).extend(items);
            }
            StepRole::TargetSurface => {
                let mut items = match pending.iter().rposition(|(t, _)| *t == step.target) {
                    Some(i) => pending.swap_remove(i).1,
                    None => Vec::new(),
                };
                items.reverse();
                let surface = arena.surface(step.target);
                plan.passes.push(RenderPass {
                    target: step.target,
                    output_rect: surface.content_rect,
                    damage_rect: surface.damage.current_damage_rect(),
                    transform_to_root: surface.screen_space_transform,
                    items,
                });
            }
        }
        occlusion.leave_layer(arena, step);
    }

    let root_damage = arena.surface(root).damage.current_damage_rect();
    plan.root_damage = DamageRegion::from_root_damage(root_damage, screen_clip);
    plan.visible_region = occlusion.compute_visible_region_in_screen(arena);
    plan
}

fn items_for(
    pending: &mut Vec<(LayerId, Vec<RenderItem>)>,
    target: LayerId,
) -> &mut Vec<RenderItem> {
    let index = match pending.iter().rposition(|(t, _)| *t == target) {
        Some(i) => i,
        None => {
            pending.push((target, Vec::new()));
            pending.len() - 1
        }
    };
    &mut pending[index].1
}

/// Returns `true` if `footprint` (pass space) overlaps the pass damage.
fn touches_damage(arena: &LayerArena, target: LayerId, footprint: Rect) -> bool {
    let damage = arena.surface(target).damage.current_damage_rect();
    geometry::intersects(footprint, damage)
}

fn content_item(
    arena: &LayerArena,
    step: TraversalStep,
    occlusion: &OcclusionAccumulator,
    resolve: &impl Fn(UiResourceId) -> Option<ResourceKey>,
) -> Option<RenderItem> {
    let layer = arena.layer(step.layer);
    let draw = &layer.draw;
    if !touches_damage(arena, step.target, draw.drawable_content_rect) {
        return None;
    }
    let visible_rect = occlusion
        .current_occlusion_for_layer(draw.draw_transform)
        .unoccluded_content_rect(draw.visible_content_rect);
    if geometry::is_empty(visible_rect) {
        return None;
    }
    Some(RenderItem {
        layer_id: layer.id,
        kind: ItemKind::Content {
            resource: layer.props.ui_resource.and_then(resolve),
        },
        draw_transform: draw.draw_transform,
        opacity: draw.opacity,
        clip: draw.is_clipped.then_some(draw.clip_rect),
        blend_mode: layer.props.blend_mode,
        visible_rect,
    })
}

/// The surface quad and its replica, front to back.
fn surface_items(
    arena: &LayerArena,
    step: TraversalStep,
    occlusion: &OcclusionAccumulator,
) -> Vec<RenderItem> {
    let mut items = Vec::new();
    let layer = arena.layer(step.layer);
    let surface = arena.surface(step.layer);
    if surface.is_hidden_for_read_back {
        return items;
    }
    let has_replica = layer.replica_layer.is_some();
    if !touches_damage(arena, step.target, surface.drawable_content_rect(has_replica)) {
        return items;
    }
    let clip = surface.is_clipped.then_some(surface.clip_rect);

    let visible_rect = occlusion
        .current_occlusion_for_contributing_surface(surface.draw_transform)
        .unoccluded_content_rect(surface.content_rect);
    if !geometry::is_empty(visible_rect) {
        items.push(RenderItem {
            layer_id: layer.id,
            kind: ItemKind::Surface {
                source: layer.id,
                mask: layer.mask_layer,
            },
            draw_transform: surface.draw_transform,
            opacity: surface.draw_opacity,
            clip,
            blend_mode: layer.props.blend_mode,
            visible_rect,
        });
    }

    if let Some(replica) = layer.replica_layer {
        let visible_rect = occlusion
            .current_occlusion_for_contributing_surface(surface.replica_draw_transform)
            .unoccluded_content_rect(surface.content_rect);
        if !geometry::is_empty(visible_rect) {
            // The replica sits behind the original.
            items.push(RenderItem {
                layer_id: replica,
                kind: ItemKind::Replica {
                    source: layer.id,
                    mask: arena.layer(replica).mask_layer,
                },
                draw_transform: surface.replica_draw_transform,
                opacity: surface.draw_opacity,
                clip,
                blend_mode: layer.props.blend_mode,
                visible_rect,
            });
        }
    }
    items
}

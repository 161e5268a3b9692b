// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The draw-properties pass.
//!
//! Walks the layer tree once, decides which layers need their own
//! [`RenderSurface`], and fills in every layer's [`DrawProperties`] and every
//! surface's per-frame fields. The result is the surface list in pre-order
//! (each surface before the surfaces nested in it), which is what
//! [`SurfaceTraversal`](crate::SurfaceTraversal) expects.
//!
//! Surfaces that are still needed keep their damage history; surfaces that
//! are no longer needed are dropped.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Rect, Vec2};
use strata_core::geometry;
use strata_core::layer::LayerId;
use strata_core::transform::Transform3d;

use crate::layer::{DrawProperties, Layer, LayerArena};
use crate::surface::RenderSurface;

/// Per-frame values the pass needs beyond the layers themselves.
pub struct DrawPropertiesInputs<'a> {
    /// Device viewport; the root surface's content rect.
    pub viewport: Rect,
    /// Device pixels per layout pixel.
    pub device_scale_factor: f64,
    /// Current page scale.
    pub page_scale_factor: f64,
    /// Layer whose contents the page scale applies to.
    pub page_scale_layer: Option<LayerId>,
    /// Current elastic overscroll.
    pub elastic_overscroll: Vec2,
    /// Layer whose contents the overscroll displaces.
    pub overscroll_layer: Option<LayerId>,
    /// Current scroll offset of a scrollable layer.
    pub scroll_offset: &'a dyn Fn(LayerId) -> Vec2,
}

impl fmt::Debug for DrawPropertiesInputs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawPropertiesInputs")
            .field("viewport", &self.viewport)
            .field("device_scale_factor", &self.device_scale_factor)
            .field("page_scale_factor", &self.page_scale_factor)
            .field("page_scale_layer", &self.page_scale_layer)
            .field("elastic_overscroll", &self.elastic_overscroll)
            .field("overscroll_layer", &self.overscroll_layer)
            .finish_non_exhaustive()
    }
}

/// What a layer inherits from the layers above it.
#[derive(Clone, Copy)]
struct Context {
    /// `None` above the root.
    target: Option<LayerId>,
    parent_to_target: Transform3d,
    parent_to_screen: Transform3d,
    opacity: f32,
    clip: Option<Rect>,
    immune: Option<LayerId>,
}

/// Recomputes draw properties for every layer and returns the surface list.
pub fn compute_draw_properties(
    arena: &mut LayerArena,
    inputs: &DrawPropertiesInputs<'_>,
) -> Vec<LayerId> {
    for layer in arena.iter_mut() {
        layer.draw = DrawProperties::default();
    }
    let mut surfaces = Vec::new();
    if let Some(root) = arena.root() {
        let device = Transform3d::from_scale(
            inputs.device_scale_factor,
            inputs.device_scale_factor,
            1.0,
        );
        let ctx = Context {
            target: None,
            parent_to_target: device,
            parent_to_screen: device,
            opacity: 1.0,
            clip: None,
            immune: None,
        };
        visit(arena, root, &ctx, inputs, &mut surfaces);
    }
    for layer in arena.iter_mut() {
        let keep = layer
            .render_surface
            .as_ref()
            .is_some_and(|s| surfaces.get(s.list_index) == Some(&layer.id));
        if !keep {
            layer.render_surface = None;
        }
    }
    surfaces
}

fn needs_surface(layer: &Layer) -> bool {
    let p = &layer.props;
    let blends_group = (p.opacity < 1.0 || !p.blend_mode.is_default())
        && !layer.children.is_empty()
        && (p.draws_content || layer.children.len() > 1);
    layer.mask_layer.is_some()
        || layer.replica_layer.is_some()
        || !p.filters.is_empty()
        || !p.background_filters.is_empty()
        || p.force_render_surface
        || p.has_copy_request
        || p.occlusion_immune
        || blends_group
}

/// Transform from a layer's child space into its own space.
fn sublayer_transform(layer: &Layer, inputs: &DrawPropertiesInputs<'_>) -> Transform3d {
    let mut t = Transform3d::IDENTITY;
    if inputs.overscroll_layer == Some(layer.id) {
        t = t * Transform3d::from_offset(-inputs.elastic_overscroll);
    }
    if inputs.page_scale_layer == Some(layer.id) {
        let s = inputs.page_scale_factor;
        t = t * Transform3d::from_scale(s, s, 1.0);
    }
    if layer.props.is_scrollable() {
        t = t * Transform3d::from_offset(-(inputs.scroll_offset)(layer.id));
    }
    t
}

fn clipped(rect: Rect, clip: Option<Rect>) -> Rect {
    match clip {
        Some(c) => geometry::intersect(rect, c),
        None => rect,
    }
}

/// Part of `content_rect` that lands inside `drawable` once mapped.
fn visible_rect(draw_transform: &Transform3d, content_rect: Rect, drawable: Rect) -> Rect {
    if geometry::is_empty(drawable) {
        return Rect::ZERO;
    }
    match draw_transform.inverse() {
        Some(inv) => geometry::intersect(
            geometry::enclosing(inv.map_rect_or(drawable, content_rect)),
            content_rect,
        ),
        None => content_rect,
    }
}

fn visit(
    arena: &mut LayerArena,
    id: LayerId,
    ctx: &Context,
    inputs: &DrawPropertiesInputs<'_>,
    surfaces: &mut Vec<LayerId>,
) {
    let layer = arena.layer(id);
    if layer.props.hide_subtree && !layer.props.has_copy_request {
        return;
    }
    let is_root = ctx.target.is_none();
    let owns_surface = is_root || needs_surface(layer);
    let content_rect = layer.content_rect();
    let to_target = ctx.parent_to_target * layer.props.transform;
    let to_screen = ctx.parent_to_screen * layer.props.transform;
    let sublayer = sublayer_transform(layer, inputs);
    let children = layer.children.clone();
    let mask = layer.mask_layer;
    let replica = layer.replica_layer;
    let opacity = layer.props.opacity;
    let draws_content = layer.props.draws_content;
    let masks_to_bounds = layer.props.masks_to_bounds;
    let hidden_for_read_back = layer.props.hide_subtree;
    let immune = if layer.props.occlusion_immune {
        Some(id)
    } else {
        ctx.immune
    };
    let property_changed = layer.property_changed;

    if !owns_surface {
        let draw_opacity = ctx.opacity * opacity;
        let fallback = ctx.clip.unwrap_or(Rect::ZERO);
        let drawable = clipped(to_target.map_rect_or(content_rect, fallback), ctx.clip);
        let layer = arena.layer_mut(id);
        layer.draw = DrawProperties {
            render_target: ctx.target,
            draw_transform: to_target,
            screen_space_transform: to_screen,
            opacity: draw_opacity,
            is_clipped: ctx.clip.is_some(),
            clip_rect: fallback,
            drawable_content_rect: drawable,
            visible_content_rect: visible_rect(&to_target, content_rect, drawable),
        };
        if draws_content
            && let Some(target) = ctx.target
        {
            push_to_list(arena, target, id);
        }
        let child_clip = if masks_to_bounds {
            let bounds = to_target.map_rect_or(content_rect, fallback);
            Some(clipped(bounds, ctx.clip))
        } else {
            ctx.clip
        };
        let child_ctx = Context {
            target: ctx.target,
            parent_to_target: to_target * sublayer,
            parent_to_screen: to_screen * sublayer,
            opacity: draw_opacity,
            clip: child_clip,
            immune: ctx.immune,
        };
        for child in children {
            visit(arena, child, &child_ctx, inputs, surfaces);
        }
        return;
    }

    // The root surface is the screen; every other surface is in the owner's
    // layer space.
    let (in_surface, surface_draw, surface_screen) = if is_root {
        (to_target, Transform3d::IDENTITY, Transform3d::IDENTITY)
    } else {
        (Transform3d::IDENTITY, to_target, to_screen)
    };
    let own_clip = if is_root {
        let viewport = inputs.viewport;
        Some(if masks_to_bounds {
            geometry::intersect(viewport, in_surface.map_rect_or(content_rect, viewport))
        } else {
            viewport
        })
    } else if masks_to_bounds {
        Some(content_rect)
    } else {
        None
    };
    let replica_transform = replica.map_or(Transform3d::IDENTITY, |r| {
        arena.layer(r).props.transform
    });

    let list_index = surfaces.len();
    surfaces.push(id);
    {
        let drawable = clipped(
            in_surface.map_rect_or(content_rect, own_clip.unwrap_or(Rect::ZERO)),
            own_clip,
        );
        let layer = arena.layer_mut(id);
        let surface = layer
            .render_surface
            .get_or_insert_with(|| RenderSurface::new(id));
        surface.reset_for_frame();
        surface.list_index = list_index;
        surface.draw_transform = surface_draw;
        surface.screen_space_transform = surface_screen;
        surface.replica_draw_transform = surface_draw * replica_transform;
        surface.replica_screen_space_transform = surface_screen * replica_transform;
        surface.is_clipped = !is_root && ctx.clip.is_some();
        surface.clip_rect = if surface.is_clipped {
            ctx.clip.unwrap_or(Rect::ZERO)
        } else {
            Rect::ZERO
        };
        surface.draw_opacity = if is_root { 1.0 } else { ctx.opacity * opacity };
        surface.is_hidden_for_read_back = hidden_for_read_back;
        surface.nearest_occlusion_immune_ancestor = immune;
        surface.surface_property_changed = property_changed;
        if draws_content {
            surface.layer_list.push(id);
        }
        layer.draw = DrawProperties {
            render_target: Some(id),
            draw_transform: in_surface,
            screen_space_transform: to_screen,
            opacity: 1.0,
            is_clipped: own_clip.is_some(),
            clip_rect: own_clip.unwrap_or(Rect::ZERO),
            drawable_content_rect: drawable,
            visible_content_rect: visible_rect(&in_surface, content_rect, drawable),
        };
    }
    if let Some(parent_target) = ctx.target {
        push_to_list(arena, parent_target, id);
    }
    if let Some(mask) = mask {
        place_attached(arena, mask, id, in_surface, to_screen);
    }
    if let Some(replica) = replica {
        let replica_draw = in_surface * replica_transform;
        let replica_screen = to_screen * replica_transform;
        place_attached(arena, replica, id, replica_draw, replica_screen);
        if let Some(replica_mask) = arena.layer(replica).mask_layer {
            place_attached(arena, replica_mask, id, replica_draw, replica_screen);
        }
    }

    let child_ctx = Context {
        target: Some(id),
        parent_to_target: in_surface * sublayer,
        parent_to_screen: to_screen * sublayer,
        opacity: 1.0,
        clip: own_clip,
        immune,
    };
    for child in children {
        visit(arena, child, &child_ctx, inputs, surfaces);
    }

    let content = if is_root {
        inputs.viewport
    } else {
        let surface = arena.surface(id);
        let mut content = Rect::ZERO;
        for &member in &surface.layer_list {
            content = geometry::union(content, contribution_rect(arena, member, id));
        }
        if masks_to_bounds {
            content = geometry::intersect(content, content_rect);
        }
        content
    };
    if let Some(surface) = arena.layer_mut(id).render_surface.as_mut() {
        surface.content_rect = content;
    }
}

/// Footprint of `member` inside `target`'s surface.
pub(crate) fn contribution_rect(arena: &LayerArena, member: LayerId, target: LayerId) -> Rect {
    let layer = arena.layer(member);
    match &layer.render_surface {
        Some(surface) if member != target => {
            surface.drawable_content_rect(layer.replica_layer.is_some())
        }
        _ => layer.draw.drawable_content_rect,
    }
}

fn push_to_list(arena: &mut LayerArena, target: LayerId, member: LayerId) {
    if let Some(surface) = arena.layer_mut(target).render_surface.as_mut() {
        surface.layer_list.push(member);
    }
}

/// Draw properties for a mask or replica layer, which draw in their owner's
/// surface and never appear in a layer list.
fn place_attached(
    arena: &mut LayerArena,
    id: LayerId,
    owner: LayerId,
    draw_transform: Transform3d,
    screen_space_transform: Transform3d,
) {
    let layer = arena.layer_mut(id);
    let content_rect = layer.content_rect();
    layer.draw = DrawProperties {
        render_target: Some(owner),
        draw_transform,
        screen_space_transform,
        opacity: 1.0,
        is_clipped: false,
        clip_rect: Rect::ZERO,
        drawable_content_rect: draw_transform.map_rect_or(content_rect, Rect::ZERO),
        visible_content_rect: content_rect,
    };
}

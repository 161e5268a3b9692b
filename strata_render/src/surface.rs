// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render surfaces.

use alloc::vec::Vec;
use core::cell::Cell;

use kurbo::Rect;
use strata_core::geometry;
use strata_core::layer::LayerId;
use strata_core::transform::Transform3d;

use crate::damage::DamageAccumulator;

/// An intermediate target that a layer's subtree is drawn into before being
/// composited into its parent target.
///
/// Owned by the layer it belongs to. Everything except the damage history is
/// recomputed by each draw-properties pass.
#[derive(Debug)]
pub struct RenderSurface {
    /// The owning layer.
    pub owner: LayerId,
    /// Layers and contributing surfaces drawn into this surface, back to
    /// front.
    pub layer_list: Vec<LayerId>,
    /// Union of everything drawn into the surface, in surface space.
    pub content_rect: Rect,
    /// Surface space to parent-target space.
    pub draw_transform: Transform3d,
    /// Surface space to screen space.
    pub screen_space_transform: Transform3d,
    /// Surface space to parent-target space for the replica copy.
    pub replica_draw_transform: Transform3d,
    /// Surface space to screen space for the replica copy.
    pub replica_screen_space_transform: Transform3d,
    /// Whether [`clip_rect`](Self::clip_rect) applies.
    pub is_clipped: bool,
    /// Clip in parent-target space.
    pub clip_rect: Rect,
    /// Opacity the surface is composited with.
    pub draw_opacity: f32,
    /// The surface is drawn only to satisfy a copy request on a hidden
    /// subtree.
    pub is_hidden_for_read_back: bool,
    /// Nearest occlusion-immune surface owner at or above this one.
    pub nearest_occlusion_immune_ancestor: Option<LayerId>,
    /// The owner changed in a way that restyles the whole surface.
    pub surface_property_changed: bool,
    /// Position in the surface list.
    pub list_index: usize,
    /// Damage history for this surface.
    pub damage: DamageAccumulator,
    pub(crate) child_index_history: Cell<isize>,
    pub(crate) parent_index_history: Cell<usize>,
}

impl RenderSurface {
    /// Creates an empty surface for `owner`.
    #[must_use]
    pub fn new(owner: LayerId) -> Self {
        Self {
            owner,
            layer_list: Vec::new(),
            content_rect: Rect::ZERO,
            draw_transform: Transform3d::IDENTITY,
            screen_space_transform: Transform3d::IDENTITY,
            replica_draw_transform: Transform3d::IDENTITY,
            replica_screen_space_transform: Transform3d::IDENTITY,
            is_clipped: false,
            clip_rect: Rect::ZERO,
            draw_opacity: 1.0,
            is_hidden_for_read_back: false,
            nearest_occlusion_immune_ancestor: None,
            surface_property_changed: false,
            list_index: 0,
            damage: DamageAccumulator::new(),
            child_index_history: Cell::new(0),
            parent_index_history: Cell::new(0),
        }
    }

    /// Footprint of the surface (and its replica, if `has_replica`) in its
    /// parent target, after the surface clip.
    #[must_use]
    pub fn drawable_content_rect(&self, has_replica: bool) -> Rect {
        let fallback = if self.is_clipped {
            self.clip_rect
        } else {
            Rect::ZERO
        };
        let mut rect = self.draw_transform.map_rect_or(self.content_rect, fallback);
        if has_replica {
            rect = geometry::union(
                rect,
                self.replica_draw_transform
                    .map_rect_or(self.content_rect, fallback),
            );
        }
        if self.is_clipped {
            rect = geometry::intersect(rect, self.clip_rect);
        }
        rect
    }

    /// Clears the per-frame fields before the surface is rebuilt.
    pub(crate) fn reset_for_frame(&mut self) {
        self.layer_list.clear();
        self.content_rect = Rect::ZERO;
        self.is_clipped = false;
        self.clip_rect = Rect::ZERO;
        self.is_hidden_for_read_back = false;
        self.nearest_occlusion_immune_ancestor = None;
        self.surface_property_changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawable_rect_includes_replica_and_clip() {
        let mut s = RenderSurface::new(LayerId::from_raw(0, 0));
        s.content_rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        s.draw_transform = Transform3d::from_translation(5.0, 0.0, 0.0);
        s.replica_draw_transform = Transform3d::from_translation(20.0, 0.0, 0.0);
        assert_eq!(s.drawable_content_rect(false), Rect::new(5.0, 0.0, 15.0, 10.0));
        assert_eq!(s.drawable_content_rect(true), Rect::new(5.0, 0.0, 30.0, 10.0));
        s.is_clipped = true;
        s.clip_rect = Rect::new(0.0, 0.0, 25.0, 5.0);
        assert_eq!(s.drawable_content_rect(true), Rect::new(5.0, 0.0, 25.0, 5.0));
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The consumer's layers.

use alloc::vec::Vec;

use kurbo::{Rect, Size, Vec2};
use strata_core::geometry;
use strata_core::layer::{LayerId, LayerProperties};
use strata_core::transform::Transform3d;

use crate::surface::RenderSurface;

/// Values the draw-properties pass computes for one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawProperties {
    /// Owner of the surface this layer draws into; `None` if the layer is
    /// not drawn this frame.
    pub render_target: Option<LayerId>,
    /// Layer space to target-surface space.
    pub draw_transform: Transform3d,
    /// Layer space to screen space.
    pub screen_space_transform: Transform3d,
    /// Opacity relative to the target surface.
    pub opacity: f32,
    /// Whether [`clip_rect`](Self::clip_rect) applies.
    pub is_clipped: bool,
    /// Clip in target space.
    pub clip_rect: Rect,
    /// Footprint in target space, after clipping.
    pub drawable_content_rect: Rect,
    /// Part of the content rect that can show, in layer space.
    pub visible_content_rect: Rect,
}

impl Default for DrawProperties {
    fn default() -> Self {
        Self {
            render_target: None,
            draw_transform: Transform3d::IDENTITY,
            screen_space_transform: Transform3d::IDENTITY,
            opacity: 1.0,
            is_clipped: false,
            clip_rect: Rect::ZERO,
            drawable_content_rect: Rect::ZERO,
            visible_content_rect: Rect::ZERO,
        }
    }
}

/// A consumer-side layer.
#[derive(Debug)]
pub struct Layer {
    /// Identity shared with the producer.
    pub id: LayerId,
    /// Parent layer; `None` for the root and for mask/replica layers.
    pub parent: Option<LayerId>,
    /// Children, back to front.
    pub children: Vec<LayerId>,
    /// Mask layer.
    pub mask_layer: Option<LayerId>,
    /// Replica layer.
    pub replica_layer: Option<LayerId>,
    /// Last pushed property bundle.
    pub props: LayerProperties,
    /// Set when a push moved or restyled the whole footprint; cleared after
    /// a draw.
    pub property_changed: bool,
    /// Invalidated content since the last draw, in layer space.
    pub update_rect: Rect,
    /// Growth of the layer's bounds applied by the consumer (top controls
    /// hiding grows the viewport container).
    pub bounds_delta: Vec2,
    /// Computed by the draw-properties pass.
    pub draw: DrawProperties,
    /// Surface owned by this layer, if it needs one.
    pub render_surface: Option<RenderSurface>,
}

impl Layer {
    /// Creates a detached layer with default properties.
    #[must_use]
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            mask_layer: None,
            replica_layer: None,
            props: LayerProperties::default(),
            property_changed: false,
            update_rect: Rect::ZERO,
            bounds_delta: Vec2::ZERO,
            draw: DrawProperties::default(),
            render_surface: None,
        }
    }

    /// Bounds including [`bounds_delta`](Self::bounds_delta).
    #[must_use]
    pub fn bounds(&self) -> Size {
        Size::new(
            (self.props.bounds.width + self.bounds_delta.x).max(0.0),
            (self.props.bounds.height + self.bounds_delta.y).max(0.0),
        )
    }

    /// Content rectangle in layer space.
    #[must_use]
    pub fn content_rect(&self) -> Rect {
        geometry::rect_of_size(self.bounds())
    }

    /// Returns `true` if the layer paints and is not hidden.
    #[inline]
    #[must_use]
    pub fn draws_content(&self) -> bool {
        self.props.draws_content && self.draw.render_target.is_some()
    }

    /// Returns `true` if the layer owns a render surface.
    #[inline]
    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.render_surface.is_some()
    }

    /// Opaque part of the visible content, in layer space.
    #[must_use]
    pub fn visible_opaque_rect(&self) -> Rect {
        let opaque = if self.props.contents_opaque {
            self.content_rect()
        } else {
            match self.props.opaque_rect {
                Some(r) => r,
                None => return Rect::ZERO,
            }
        };
        geometry::intersect(opaque, self.draw.visible_content_rect)
    }
}

/// Consumer layers in slots indexed by [`LayerId::index`].
///
/// A slot's layer is only returned for the exact generation stored in it, so
/// an id that outlived its layer never aliases a newer one.
#[derive(Debug, Default)]
pub struct LayerArena {
    slots: Vec<Option<Layer>>,
    root: Option<LayerId>,
    len: usize,
}

impl LayerArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there are no layers.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Root layer.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<LayerId> {
        self.root
    }

    /// Sets the root layer.
    pub fn set_root(&mut self, root: Option<LayerId>) {
        self.root = root;
    }

    /// Returns `true` if `id` names a layer in this arena.
    #[must_use]
    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    /// The layer for `id`, if it is present with the same generation.
    #[must_use]
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.slots
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .filter(|l| l.id == id)
    }

    /// Mutable access to the layer for `id`.
    #[must_use]
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .filter(|l| l.id == id)
    }

    /// The layer for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or unknown.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> &Layer {
        match self.get(id) {
            Some(l) => l,
            None => panic!("stale LayerId {id:?}"),
        }
    }

    /// Mutable access to the layer for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or unknown.
    #[must_use]
    pub fn layer_mut(&mut self, id: LayerId) -> &mut Layer {
        match self.get_mut(id) {
            Some(l) => l,
            None => panic!("stale LayerId {id:?}"),
        }
    }

    /// The surface owned by `id`.
    ///
    /// # Panics
    ///
    /// Panics if the layer owns no surface.
    #[must_use]
    pub fn surface(&self, id: LayerId) -> &RenderSurface {
        match &self.layer(id).render_surface {
            Some(s) => s,
            None => panic!("layer {id:?} owns no render surface"),
        }
    }

    /// Inserts a layer.
    ///
    /// # Panics
    ///
    /// Panics if the slot already holds a layer.
    pub fn insert(&mut self, layer: Layer) {
        let idx = layer.id.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        let slot = &mut self.slots[idx];
        assert!(slot.is_none(), "duplicate layer id {:?}", layer.id);
        *slot = Some(layer);
        self.len += 1;
    }

    /// Removes and returns a layer.
    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.as_ref().is_some_and(|l| l.id == id) {
            self.len -= 1;
            if self.root == Some(id) {
                self.root = None;
            }
            slot.take()
        } else {
            None
        }
    }

    /// Iterates over every layer in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Iterates mutably over every layer in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Ids of every layer, in slot order.
    #[must_use]
    pub fn ids(&self) -> Vec<LayerId> {
        self.iter().map(|l| l.id).collect()
    }

    /// Removes every layer.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.root = None;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(idx: u32, generation: u32) -> LayerId {
        LayerId::from_raw(idx, generation)
    }

    #[test]
    fn generation_mismatch_is_absent() {
        let mut arena = LayerArena::new();
        arena.insert(Layer::new(id(3, 1)));
        assert!(arena.contains(id(3, 1)), "inserted layer should be present");
        assert!(!arena.contains(id(3, 2)), "newer generation must not alias");
        assert!(!arena.contains(id(0, 0)), "empty slot");
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn remove_clears_root() {
        let mut arena = LayerArena::new();
        arena.insert(Layer::new(id(0, 0)));
        arena.set_root(Some(id(0, 0)));
        assert!(arena.remove(id(0, 1)).is_none(), "wrong generation");
        assert!(arena.remove(id(0, 0)).is_some());
        assert_eq!(arena.root(), None);
        assert!(arena.is_empty());
    }

    #[test]
    #[should_panic(expected = "duplicate layer id")]
    fn duplicate_insert_panics() {
        let mut arena = LayerArena::new();
        arena.insert(Layer::new(id(1, 0)));
        arena.insert(Layer::new(id(1, 0)));
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn stale_lookup_panics() {
        let arena = LayerArena::new();
        let _ = arena.layer(id(0, 0));
    }

    #[test]
    fn bounds_delta_grows_content_rect() {
        let mut layer = Layer::new(id(0, 0));
        layer.props.bounds = Size::new(100.0, 50.0);
        layer.bounds_delta = Vec2::new(0.0, 20.0);
        assert_eq!(layer.content_rect(), Rect::new(0.0, 0.0, 100.0, 70.0));
    }

    #[test]
    fn opaque_rect_is_limited_to_visible() {
        let mut layer = Layer::new(id(0, 0));
        layer.props.bounds = Size::new(100.0, 100.0);
        layer.props.opaque_rect = Some(Rect::new(0.0, 0.0, 80.0, 80.0));
        layer.draw.visible_content_rect = Rect::new(40.0, 0.0, 100.0, 100.0);
        assert_eq!(layer.visible_opaque_rect(), Rect::new(40.0, 0.0, 80.0, 80.0));
        layer.props.opaque_rect = None;
        assert_eq!(layer.visible_opaque_rect(), Rect::ZERO);
    }
}

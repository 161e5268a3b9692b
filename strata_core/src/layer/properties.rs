// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-layer property bundle pushed by commits.

use kurbo::{Rect, Size, Vec2};

use super::id::UiResourceId;
use crate::filter::FilterOperations;
use crate::transform::Transform3d;

/// How a layer (or surface) composites onto what is beneath it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard alpha compositing.
    #[default]
    SourceOver,
    /// Multiplies source and destination.
    Multiply,
    /// Inverse multiply.
    Screen,
}

impl BlendMode {
    /// Returns `true` for [`SourceOver`](Self::SourceOver).
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::SourceOver)
    }
}

/// Everything about a layer that is not topology.
///
/// The producer owns the authoritative copy; commits push whole bundles and
/// the consumer compares them to decide whether a layer's footprint moved.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerProperties {
    /// Size of the layer's content rectangle, anchored at its local origin.
    pub bounds: Size,
    /// Transform from the layer's space to its parent's space.
    pub transform: Transform3d,
    /// Opacity applied to the layer and its subtree.
    pub opacity: f32,
    /// How the layer composites.
    pub blend_mode: BlendMode,
    /// Whether the layer itself paints anything.
    pub draws_content: bool,
    /// Whether every painted pixel is fully opaque.
    pub contents_opaque: bool,
    /// Opaque sub-rectangle in layer space, for layers that are only
    /// partially opaque.
    pub opaque_rect: Option<Rect>,
    /// Whether the subtree is clipped to `bounds`.
    pub masks_to_bounds: bool,
    /// Filters applied to the layer's rendered subtree.
    pub filters: FilterOperations,
    /// Filters applied to whatever is behind the layer.
    pub background_filters: FilterOperations,
    /// Forces an intermediate render surface.
    pub force_render_surface: bool,
    /// Whether the layer takes part in 3-D depth sorting.
    pub sorted_in_3d: bool,
    /// Hides the layer and its subtree.
    pub hide_subtree: bool,
    /// Whether someone asked to read the rendered subtree back.
    pub has_copy_request: bool,
    /// Excludes the subtree from occlusion cast by content outside it.
    pub occlusion_immune: bool,
    /// Viewport size of a scrollable layer; `None` if it does not scroll.
    pub scroll_container: Option<Size>,
    /// UI resource drawn as this layer's content.
    pub ui_resource: Option<UiResourceId>,
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self {
            bounds: Size::ZERO,
            transform: Transform3d::IDENTITY,
            opacity: 1.0,
            blend_mode: BlendMode::SourceOver,
            draws_content: false,
            contents_opaque: false,
            opaque_rect: None,
            masks_to_bounds: false,
            filters: FilterOperations::new(),
            background_filters: FilterOperations::new(),
            force_render_surface: false,
            sorted_in_3d: false,
            hide_subtree: false,
            has_copy_request: false,
            occlusion_immune: false,
            scroll_container: None,
            ui_resource: None,
        }
    }
}

impl LayerProperties {
    /// The layer's content rectangle in its own space.
    #[inline]
    #[must_use]
    pub fn content_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.bounds)
    }

    /// Returns `true` if going from `self` to `other` changes how
    /// descendants are positioned or styled.
    #[must_use]
    pub fn subtree_differs(&self, other: &Self) -> bool {
        self.transform != other.transform
            || self.opacity != other.opacity
            || self.blend_mode != other.blend_mode
            || self.filters != other.filters
            || self.hide_subtree != other.hide_subtree
            || self.masks_to_bounds != other.masks_to_bounds
            || (self.masks_to_bounds && self.bounds != other.bounds)
            || self.sorted_in_3d != other.sorted_in_3d
            || self.force_render_surface != other.force_render_surface
            || self.occlusion_immune != other.occlusion_immune
            || self.has_copy_request != other.has_copy_request
    }

    /// Largest scroll offset the layer accepts, or zero if it does not
    /// scroll.
    #[must_use]
    pub fn max_scroll_offset(&self) -> Vec2 {
        match self.scroll_container {
            Some(container) => Vec2::new(
                (self.bounds.width - container.width).max(0.0),
                (self.bounds.height - container.height).max(0.0),
            ),
            None => Vec2::ZERO,
        }
    }

    /// Returns `true` if the layer scrolls.
    #[inline]
    #[must_use]
    pub fn is_scrollable(&self) -> bool {
        self.scroll_container.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_flags_do_not_affect_subtree() {
        let a = LayerProperties::default();
        let mut b = a.clone();
        b.draws_content = true;
        b.contents_opaque = true;
        assert!(!a.subtree_differs(&b));
        b.opacity = 0.5;
        assert!(a.subtree_differs(&b));
    }

    #[test]
    fn bounds_only_matter_when_clipping() {
        let a = LayerProperties::default();
        let mut b = a.clone();
        b.bounds = Size::new(10.0, 10.0);
        assert!(!a.subtree_differs(&b));
        let mut c = a.clone();
        c.masks_to_bounds = true;
        let mut d = c.clone();
        d.bounds = Size::new(10.0, 10.0);
        assert!(c.subtree_differs(&d));
    }

    #[test]
    fn max_scroll_offset_is_clamped() {
        let p = LayerProperties {
            bounds: Size::new(100.0, 500.0),
            scroll_container: Some(Size::new(100.0, 200.0)),
            ..LayerProperties::default()
        };
        assert_eq!(p.max_scroll_offset(), Vec2::new(0.0, 300.0));
        assert!(p.is_scrollable());
        assert_eq!(LayerProperties::default().max_scroll_offset(), Vec2::ZERO);
    }
}

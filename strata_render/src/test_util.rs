// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree builders shared by the unit tests.

use kurbo::{Rect, Size, Vec2};
use strata_core::layer::{LayerId, LayerProperties};
use strata_core::transform::Transform3d;

use crate::draw_properties::DrawPropertiesInputs;
use crate::layer::{Layer, LayerArena};

pub(crate) struct TreeBuilder {
    arena: LayerArena,
    next: u32,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        Self {
            arena: LayerArena::new(),
            next: 0,
        }
    }

    fn add(&mut self, props: LayerProperties) -> LayerId {
        let id = LayerId::from_raw(self.next, 0);
        self.next += 1;
        let mut layer = Layer::new(id);
        layer.props = props;
        self.arena.insert(layer);
        id
    }

    pub(crate) fn root(&mut self, props: LayerProperties) -> LayerId {
        let id = self.add(props);
        self.arena.set_root(Some(id));
        id
    }

    pub(crate) fn child(&mut self, parent: LayerId, props: LayerProperties) -> LayerId {
        let id = self.add(props);
        self.arena.layer_mut(id).parent = Some(parent);
        self.arena.layer_mut(parent).children.push(id);
        id
    }

    pub(crate) fn mask(&mut self, owner: LayerId, props: LayerProperties) -> LayerId {
        let id = self.add(props);
        self.arena.layer_mut(owner).mask_layer = Some(id);
        id
    }

    pub(crate) fn replica(&mut self, owner: LayerId, props: LayerProperties) -> LayerId {
        let id = self.add(props);
        self.arena.layer_mut(owner).replica_layer = Some(id);
        id
    }

    pub(crate) fn update(&mut self, id: LayerId, f: impl FnOnce(&mut LayerProperties)) {
        f(&mut self.arena.layer_mut(id).props);
    }

    pub(crate) fn finish(self) -> LayerArena {
        self.arena
    }
}

/// A content-less container of the given size.
pub(crate) fn group(width: f64, height: f64) -> LayerProperties {
    LayerProperties {
        bounds: Size::new(width, height),
        ..LayerProperties::default()
    }
}

/// A content layer covering `rect` in its parent's space.
pub(crate) fn solid(rect: Rect, opaque: bool) -> LayerProperties {
    LayerProperties {
        bounds: rect.size(),
        transform: Transform3d::from_translation(rect.x0, rect.y0, 0.0),
        draws_content: true,
        contents_opaque: opaque,
        ..LayerProperties::default()
    }
}

fn no_scroll(_: LayerId) -> Vec2 {
    Vec2::ZERO
}

pub(crate) fn inputs<'a>(width: f64, height: f64) -> DrawPropertiesInputs<'a> {
    DrawPropertiesInputs {
        viewport: Rect::new(0.0, 0.0, width, height),
        device_scale_factor: 1.0,
        page_scale_factor: 1.0,
        page_scale_layer: None,
        elastic_overscroll: Vec2::ZERO,
        overscroll_layer: None,
        scroll_offset: &no_scroll,
    }
}

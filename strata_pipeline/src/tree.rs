// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consumer-side layer trees.
//!
//! The consumer keeps up to three [`ConsumerTree`]s: the active tree that is
//! drawn, the pending tree a commit was synchronized into, and a recycled
//! tree kept around so the next commit can reuse its allocations. Activation
//! swaps pending and active; the old active tree becomes the recycled one.

use std::collections::BTreeMap;

use kurbo::{Rect, Vec2};
use strata_core::layer::LayerId;
use strata_core::synced::TreeSide;
use strata_core::transform::Transform3d;
use strata_render::{DamageAccumulator, DrawPropertiesInputs, LayerArena, compute_draw_properties};

use crate::config::PipelineConfig;
use crate::main_frame::{Commit, PageScaleAnimation, ViewportLayers};
use crate::swap_promise::SwapPromiseList;
use crate::synced_table::SyncedValues;
use crate::synchronize::{SyncStats, mirror_layers, synchronize_tree};

/// What a tree is currently used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeRole {
    /// Holds a commit that has not activated yet.
    Pending,
    /// Drawn to the output.
    Active,
    /// Idle; reused by the next commit.
    Recycle,
}

impl TreeRole {
    /// Which side of the synchronized values the tree reads.
    #[must_use]
    pub fn side(self) -> TreeSide {
        match self {
            Self::Active => TreeSide::Active,
            Self::Pending | Self::Recycle => TreeSide::Pending,
        }
    }
}

/// Where a surface lands in its parent target.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SurfaceFootprint {
    draw_transform: Transform3d,
    replica_draw_transform: Transform3d,
    opacity: f32,
    clip: Option<Rect>,
}

/// Where a layer lands in its target, plus its surface's placement if it
/// owns one.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LayerFootprint {
    target: Option<LayerId>,
    draw_transform: Transform3d,
    opacity: f32,
    clip: Option<Rect>,
    drawable: Rect,
    surface: Option<SurfaceFootprint>,
}

/// Placement of every layer after a draw-properties pass.
#[derive(Clone, Debug, Default)]
pub(crate) struct Footprints(BTreeMap<LayerId, LayerFootprint>);

impl Footprints {
    fn capture(arena: &LayerArena) -> Self {
        let mut map = BTreeMap::new();
        for layer in arena.iter() {
            let d = &layer.draw;
            let surface = layer.render_surface.as_ref().map(|s| SurfaceFootprint {
                draw_transform: s.draw_transform,
                replica_draw_transform: s.replica_draw_transform,
                opacity: s.draw_opacity,
                clip: s.is_clipped.then_some(s.clip_rect),
            });
            map.insert(
                layer.id,
                LayerFootprint {
                    target: d.render_target,
                    draw_transform: d.draw_transform,
                    opacity: d.opacity,
                    clip: d.is_clipped.then_some(d.clip_rect),
                    drawable: d.drawable_content_rect,
                    surface,
                },
            );
        }
        Self(map)
    }
}

/// One consumer layer tree and the state that travels with it.
#[derive(Debug)]
pub struct ConsumerTree {
    role: TreeRole,
    arena: LayerArena,
    surfaces: Vec<LayerId>,
    source_frame: u64,
    viewport_layers: ViewportLayers,
    swap_promises: SwapPromiseList,
    page_scale_animation: Option<PageScaleAnimation>,
}

impl ConsumerTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new(role: TreeRole) -> Self {
        Self {
            role,
            arena: LayerArena::new(),
            surfaces: Vec::new(),
            source_frame: 0,
            viewport_layers: ViewportLayers::default(),
            swap_promises: SwapPromiseList::new(),
            page_scale_animation: None,
        }
    }

    /// Current role.
    #[must_use]
    pub fn role(&self) -> TreeRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: TreeRole) {
        self.role = role;
    }

    /// The layers.
    #[must_use]
    pub fn arena(&self) -> &LayerArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut LayerArena {
        &mut self.arena
    }

    /// Surface list from the last draw-properties pass, in pre-order.
    #[must_use]
    pub fn surfaces(&self) -> &[LayerId] {
        &self.surfaces
    }

    /// Producer frame of the last commit synchronized into the tree.
    #[must_use]
    pub fn source_frame(&self) -> u64 {
        self.source_frame
    }

    /// Viewport roles from the last commit.
    #[must_use]
    pub fn viewport_layers(&self) -> ViewportLayers {
        self.viewport_layers
    }

    /// Promises waiting for this tree to be presented.
    #[must_use]
    pub fn swap_promises(&self) -> &SwapPromiseList {
        &self.swap_promises
    }

    pub(crate) fn swap_promises_mut(&mut self) -> &mut SwapPromiseList {
        &mut self.swap_promises
    }

    /// Takes the page scale animation the last commit requested.
    pub fn take_page_scale_animation(&mut self) -> Option<PageScaleAnimation> {
        self.page_scale_animation.take()
    }

    /// Synchronizes a commit into the tree and takes over its promises and
    /// animation request.
    pub fn apply_commit(&mut self, commit: &mut Commit) -> SyncStats {
        let stats = synchronize_tree(&mut self.arena, &commit.snapshot);
        self.source_frame = commit.source_frame();
        self.viewport_layers = commit.viewport_layers;
        if let Some(animation) = commit.page_scale_animation.take() {
            self.page_scale_animation = Some(animation);
        }
        self.swap_promises.append(&mut commit.swap_promises);
        stats
    }

    /// Makes this tree a copy of `source` so a non-structural commit can be
    /// applied on top of it.
    pub fn mirror_from(&mut self, source: &Self) {
        mirror_layers(&mut self.arena, &source.arena);
        self.source_frame = source.source_frame;
        self.viewport_layers = source.viewport_layers;
        self.surfaces.clear();
    }

    pub(crate) fn footprints(&self) -> Footprints {
        Footprints::capture(&self.arena)
    }

    /// Runs the draw-properties pass with the synchronized values the tree's
    /// role reads.
    ///
    /// Layers and surfaces whose placement differs from `baseline` (or, if
    /// `None`, from this tree's previous pass) are flagged as changed so the
    /// damage pass repaints their old and new footprints.
    pub(crate) fn update_draw_properties(
        &mut self,
        synced: &SyncedValues,
        config: &PipelineConfig,
        baseline: Option<&Footprints>,
    ) {
        let own;
        let baseline = match baseline {
            Some(b) => b,
            None => {
                own = self.footprints();
                &own
            }
        };

        let side = self.role.side();
        let hidden = 1.0 - synced.top_controls().current(side).clamp(0.0, 1.0);
        let container = self.viewport_layers.inner_viewport_container;
        for layer in self.arena.iter_mut() {
            layer.bounds_delta = if Some(layer.id) == container {
                Vec2::new(0.0, config.top_controls_height * hidden)
            } else {
                Vec2::ZERO
            };
        }

        let scroll_offset = |id: LayerId| synced.current_scroll_offset(id, side);
        let inputs = DrawPropertiesInputs {
            viewport: config.viewport_rect(),
            device_scale_factor: config.device_scale_factor,
            page_scale_factor: synced.page_scale().current(side),
            page_scale_layer: self.viewport_layers.page_scale,
            elastic_overscroll: synced.elastic_overscroll().current(side),
            overscroll_layer: self.viewport_layers.overscroll_elasticity,
            scroll_offset: &scroll_offset,
        };
        self.surfaces = compute_draw_properties(&mut self.arena, &inputs);

        let current = self.footprints();
        for (id, now) in &current.0 {
            let Some(before) = baseline.0.get(id) else {
                continue;
            };
            if before == now {
                continue;
            }
            let layer = self.arena.layer_mut(*id);
            if before.target != now.target
                || before.draw_transform != now.draw_transform
                || before.opacity != now.opacity
                || before.clip != now.clip
                || before.drawable != now.drawable
            {
                layer.property_changed = true;
            }
            if let (Some(b), Some(n)) = (before.surface, now.surface)
                && b != n
                && let Some(surface) = layer.render_surface.as_mut()
            {
                surface.surface_property_changed = true;
            }
        }
    }

    /// Moves damage history from `previous` into this tree's surfaces.
    ///
    /// Called at activation: `previous` is the tree that was on screen, so
    /// its history describes what the output shows. Surfaces with no
    /// counterpart start from scratch.
    pub(crate) fn adopt_damage(&mut self, previous: &mut Self) {
        for &owner in &self.surfaces {
            let adopted = previous
                .arena
                .get_mut(owner)
                .and_then(|l| l.render_surface.as_mut())
                .map(|s| core::mem::take(&mut s.damage))
                .unwrap_or_else(DamageAccumulator::new);
            if let Some(surface) = self.arena.layer_mut(owner).render_surface.as_mut() {
                surface.damage = adopted;
            }
        }
    }

    /// Damages every surface in full on the next damage update.
    pub(crate) fn force_full_damage(&mut self) {
        for &owner in &self.surfaces {
            if let Some(surface) = self.arena.layer_mut(owner).render_surface.as_mut() {
                surface.damage.force_full_damage_next_update();
            }
        }
    }
}

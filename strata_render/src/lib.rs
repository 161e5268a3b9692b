// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consumer-side drawable trees for strata.
//!
//! This crate holds everything the consumer does with a tree once a commit
//! has landed in it:
//!
//! - [`LayerArena`]: the consumer's copy of the layers, indexed by
//!   [`LayerId`](strata_core::layer::LayerId)
//! - [`compute_draw_properties`]: decides which layers own a
//!   [`RenderSurface`] and builds the surface list
//! - [`SurfaceTraversal`]: stack-free walk over the surface list
//! - [`DamageAccumulator`]: per-surface incremental damage
//! - [`OcclusionAccumulator`]: per-frame occlusion stack
//! - [`build_render_plan`]: turns the above into a [`RenderPlan`]
//!
//! # Frame shape
//!
//! ```text
//!   compute_draw_properties ──► surface list (pre-order)
//!            │
//!            ├──► update_damage       (children first)
//!            └──► build_render_plan   (front-to-back, occlusion)
//!                        │
//!                        ▼
//!                   RenderPlan ──► output surface
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod damage;
mod damage_region;
mod draw_properties;
mod layer;
mod occlusion;
mod plan;
mod surface;
mod traversal;

pub use damage::{DamageAccumulator, did_draw_damaged_areas, reset_change_tracking, update_damage};
pub use damage_region::DamageRegion;
pub use draw_properties::{DrawPropertiesInputs, compute_draw_properties};
pub use layer::{DrawProperties, Layer, LayerArena};
pub use occlusion::{Occlusion, OcclusionAccumulator, OcclusionConfig};
pub use plan::{ItemKind, RenderItem, RenderPass, RenderPlan, ResourceKey, build_render_plan};
pub use surface::RenderSurface;
pub use traversal::{StepRole, SurfaceTraversal, TraversalStep};

#[cfg(test)]
mod test_util;

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer-side layer tree.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]): a generational handle that becomes stale when
//!   the layer is destroyed. Consumer trees key their copies by the same
//!   handle, so a slot is only reused after explicit removal.
//! - Topology: parent, first-child and sibling links forming an ordered
//!   tree (children are stored back to front), plus optional mask and
//!   replica layers owned outside the child list.
//! - A [`LayerProperties`] bundle (bounds, transform, opacity, filters,
//!   content flags, scroll container).
//! - An accumulated update rect and, for scrollable layers, the producer's
//!   authoritative scroll offset.
//!
//! Layers are stored in struct-of-arrays layout with index-based handles.
//!
//! # Commits
//!
//! Mutations mark dirty channels (see [`dirty`](crate::dirty)).
//! [`SceneGraph::prepare_commit`] drains them into a [`CommitSnapshot`]:
//! structural when the topology changed, a property patch otherwise.

mod commit;
mod id;
mod properties;
mod store;
mod traverse;

pub use commit::{CommitSnapshot, LayerNode, LayerUpdate};
pub use id::{INVALID, LayerId, UiResourceId};
pub use properties::{BlendMode, LayerProperties};
pub use store::SceneGraph;
pub use traverse::Children;

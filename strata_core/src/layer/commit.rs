// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit snapshots.
//!
//! A [`CommitSnapshot`] is the layer half of what crosses from the producer
//! to the consumer at a commit. It is plain owned data: building it never
//! borrows the scene graph past [`SceneGraph::prepare_commit`], so the
//! producer can keep mutating while the consumer applies it.
//!
//! [`SceneGraph::prepare_commit`]: super::SceneGraph::prepare_commit

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

use super::id::LayerId;
use super::properties::LayerProperties;

/// One node of the full layer tree, sent with structural commits.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerNode {
    /// The layer.
    pub id: LayerId,
    /// Its parent; `None` for the root and for mask/replica layers.
    pub parent: Option<LayerId>,
    /// Children in back-to-front order.
    pub children: Vec<LayerId>,
    /// Mask layer owned by this layer.
    pub mask: Option<LayerId>,
    /// Replica layer owned by this layer.
    pub replica: Option<LayerId>,
}

/// Property push for one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerUpdate {
    /// The layer.
    pub id: LayerId,
    /// Its full property bundle.
    pub props: LayerProperties,
    /// Whether the layer (or an ancestor) changed in a way that moves or
    /// restyles its whole footprint.
    pub property_changed: bool,
    /// Invalidated part of the layer's content, in layer space.
    pub update_rect: Rect,
}

/// Layer state captured by one commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitSnapshot {
    /// Producer frame number.
    pub source_frame: u64,
    /// Root layer, if one is set.
    pub root: Option<LayerId>,
    /// Full tree in pre-order (owner, mask, replica, children), present only
    /// when the topology changed since the previous commit.
    pub structure: Option<Vec<LayerNode>>,
    /// Property pushes.
    pub updates: Vec<LayerUpdate>,
    /// Authoritative scroll offset of every scrollable layer.
    pub scroll_offsets: Vec<(LayerId, Vec2)>,
    /// Layers whose scroll offset the producer set explicitly; these
    /// override any consumer-side interaction at activation.
    pub scroll_clobbers: Vec<LayerId>,
}

impl CommitSnapshot {
    /// Returns `true` if the consumer has to resync its topology.
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.structure.is_some()
    }

    /// Returns `true` if applying the snapshot changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structure.is_none() && self.updates.is_empty() && self.scroll_clobbers.is_empty()
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer-side change channels.
//!
//! The [`SceneGraph`](crate::layer::SceneGraph) records every mutation in a
//! multi-channel dirty tracker (via [`understory_dirty`]). A commit drains
//! the channels to decide what the consumer needs to hear about.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`SUBTREE`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has dependency edges
//!   from child to parent (and from mask/replica layers to their owner).
//!   A transform, opacity, filter or visibility change moves or restyles
//!   every descendant, so all of them are pushed with their "property
//!   changed" bit set and damage their old and new footprints.
//!
//! - **Local-only**: [`LOCAL`] covers properties that only affect the layer
//!   itself (content flags, opaque rect, scroll container size).
//!   [`CONTENT`] covers display invalidations, which travel as update rects
//!   rather than full property changes. [`SCROLL`] marks producer-initiated
//!   scroll offset writes that must win over consumer interaction.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on topology mutations
//!   (add/remove child, create/destroy layer, mask or replica changes). A
//!   non-empty drain makes the commit structural: the consumer resyncs its
//!   tree from the full layer list instead of patching properties.

use understory_dirty::Channel;

/// Inherited property changed; propagates to descendants.
pub const SUBTREE: Channel = Channel::new(0);

/// Layer-local property changed.
pub const LOCAL: Channel = Channel::new(1);

/// Part of the layer's content was invalidated.
pub const CONTENT: Channel = Channel::new(2);

/// Producer wrote a scroll offset.
pub const SCROLL: Channel = Channel::new(3);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(4);

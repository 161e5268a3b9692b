// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry, synchronized values, and the producer scene graph.
//!
//! `strata_core` holds the pieces of the compositor pipeline that both sides
//! of the producer/consumer split agree on. It is `no_std` compatible (with
//! `alloc`).
//!
//! # Architecture
//!
//! The pipeline moves a scene description from a producer context to a
//! consumer context that owns the drawable trees:
//!
//! ```text
//!   SceneGraph (producer)
//!       │  prepare_commit()
//!       ▼
//!   CommitSnapshot ──► consumer tree (pending or active)
//!                           │  activation
//!                           ▼
//!   SyncedValue::push_pending_to_active() ──► draw properties ──► damage / occlusion
//!       ▲
//!       └── pull_delta_for_main_thread() reports consumer-side deltas upward
//! ```
//!
//! **[`layer`]**: Producer-side struct-of-arrays scene graph with
//! generational handles, plus the [`CommitSnapshot`](layer::CommitSnapshot)
//! it produces.
//!
//! **[`dirty`]**: Change channels (via `understory_dirty`) that decide which
//! layers a commit pushes and whether a commit is structural.
//!
//! **[`synced`]**: [`SyncedValue`](synced::SyncedValue), the two-writer
//! delta protocol used for scroll offsets, page scale, elastic overscroll and
//! the top-controls ratio.
//!
//! **[`region`]**: Disjoint-rectangle [`Region`](region::Region) used for
//! occlusion and visible-region queries.
//!
//! **[`geometry`]**: Rectangle helpers that treat empty rectangles as the
//! identity of union.
//!
//! **[`transform`]**: 4×4 transform with rect mapping and axis-alignment
//! queries.
//!
//! **[`filter`]**: Filter operation lists and their pixel outsets.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! pipeline instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-surface
//!   damage-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod filter;
pub mod geometry;
pub mod layer;
pub mod region;
pub mod synced;
pub mod trace;
pub mod transform;

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Commit and activation between a scene producer and a compositing
//! consumer.
//!
//! The producer ([`SceneHost`]) owns the authoritative
//! [`SceneGraph`](strata_core::layer::SceneGraph) and values. The consumer
//! ([`Consumer`]) owns up to three [`ConsumerTree`]s and every
//! synchronized value, and draws to an [`OutputSurface`].
//!
//! ```text
//!   producer                         consumer
//!   ────────                         ────────
//!                 BeginMainFrameState
//!   SceneHost ◄──────────────────── begin_main_frame   (pull deltas)
//!       │
//!   begin_commit ──── Commit ──────► finish_commit      (pending tree)
//!                                    activate           (pending ↔ active)
//!                                    draw ──► RenderPlan ──► OutputSurface
//! ```
//!
//! [`SingleThreadedPipeline`] runs both sides on one thread;
//! [`ThreadedPipeline`] puts the consumer on its own thread.
//!
//! ## Features
//!
//! - `trace`: forward pipeline events to a
//!   [`TraceSink`](strata_core::trace::TraceSink) installed with
//!   [`Consumer::set_trace_sink`].
//! - `trace-rich`: also report per-surface damage rectangles.

mod config;
mod consumer;
mod main_frame;
mod output;
mod producer;
mod single_threaded;
mod swap_promise;
mod synced_table;
mod synchronize;
mod threaded;
mod tree;
mod ui_resource;

pub use config::{CommitMode, PageScaleLimits, PipelineConfig};
pub use consumer::{Consumer, DrawResult};
pub use main_frame::{
    BeginMainFrameState, Commit, PageScaleAnimation, ScrollAndScaleSet, ViewportLayers,
};
pub use output::OutputSurface;
pub use producer::SceneHost;
pub use single_threaded::SingleThreadedPipeline;
pub use swap_promise::{SwapPromise, SwapPromiseList};
pub use synced_table::SyncedValues;
pub use synchronize::{SyncStats, mirror_layers, synchronize_tree};
pub use threaded::ThreadedPipeline;
pub use tree::{ConsumerTree, TreeRole};
pub use ui_resource::{
    ResourceManager, UiResourceBitmap, UiResourceRegistry, UiResourceRequest, UiResourceTable,
};

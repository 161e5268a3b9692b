// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the commit/activation pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! pipeline instrumentation calls at each stage. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`DamageRect`] events and the
//!   corresponding `TraceSink` method.

use kurbo::Rect;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the pipeline is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Copying a producer snapshot into a consumer tree.
    Commit,
    /// Promoting the pending tree to active.
    Activate,
    /// Recomputing transforms, clips and the surface list.
    DrawProperties,
    /// Updating per-surface damage.
    Damage,
    /// Front-to-back occlusion pass.
    Occlusion,
    /// Building and presenting the render plan.
    Draw,
}

/// Why an in-flight commit was abandoned before activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// The producer had nothing new to send.
    CommitNoUpdate,
    /// The drawing surface went away while the commit was in flight.
    OutputSurfaceLost,
    /// The output became invisible, so the frame is not needed.
    NotVisible,
}

impl AbortReason {
    /// The reason reported to swap promises riding on the aborted commit.
    #[must_use]
    pub fn did_not_swap_reason(self) -> DidNotSwapReason {
        match self {
            Self::CommitNoUpdate => DidNotSwapReason::CommitNoUpdate,
            Self::OutputSurfaceLost | Self::NotVisible => DidNotSwapReason::CommitFails,
        }
    }
}

/// Why a swap promise was broken instead of kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DidNotSwapReason {
    /// The frame was drawn but presenting it failed.
    SwapFails,
    /// The commit carrying the promise was aborted.
    CommitFails,
    /// The commit carried no update, so no frame was produced.
    CommitNoUpdate,
    /// The pending tree holding the promise was discarded before activation.
    ActivationFails,
}

/// Final state of a swap promise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapOutcome {
    /// The promise's frame became active.
    Activated,
    /// The promise's frame reached the screen.
    Swapped,
    /// The promise was broken.
    DidNotSwap(DidNotSwapReason),
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a commit has been consumed by the consumer.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Producer frame number the snapshot came from.
    pub source_frame: u64,
    /// Whether the layer topology was resynchronized.
    pub structural: bool,
    /// Whether the commit wrote straight into the active tree.
    pub into_active: bool,
    /// Number of layers whose properties were pushed.
    pub layers_pushed: u32,
    /// Number of synchronized values whose pending base changed.
    pub synced_values_changed: u32,
    /// Number of swap promises handed over with the commit.
    pub swap_promises: u32,
}

/// Emitted after the pending tree became active.
#[derive(Clone, Copy, Debug)]
pub struct ActivationEvent {
    /// Producer frame number of the activated snapshot.
    pub source_frame: u64,
    /// Number of synchronized values whose active value changed.
    pub synced_values_changed: u32,
    /// Number of render surfaces after the draw-properties pass.
    pub surface_count: u32,
}

/// Emitted when an in-flight commit is abandoned.
#[derive(Clone, Copy, Debug)]
pub struct AbortEvent {
    /// Producer frame number of the abandoned commit.
    pub source_frame: u64,
    /// Why it was abandoned.
    pub reason: AbortReason,
}

/// Emitted after a draw attempt.
#[derive(Clone, Copy, Debug)]
pub struct DrawEvent {
    /// Consumer frame counter.
    pub frame_index: u64,
    /// Bounding box of the root surface damage.
    pub root_damage: Rect,
    /// Number of render passes in the plan.
    pub render_passes: u32,
    /// Number of draw items across all passes.
    pub items: u32,
    /// Whether the output surface accepted the frame.
    pub presented: bool,
}

/// Emitted when a swap promise reaches a final state.
#[derive(Clone, Copy, Debug)]
pub struct SwapPromiseEvent {
    /// Producer frame number the promise was attached to.
    pub source_frame: u64,
    /// What happened to it.
    pub outcome: SwapOutcome,
}

/// Marks the beginning of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter (producer frame for commit/activation, consumer frame
    /// otherwise).
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Damage of one render surface.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DamageRect {
    /// Slot index of the layer owning the surface.
    pub surface_layer: u32,
    /// Damage in the surface's content space.
    pub rect: Rect,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a commit has been consumed.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called after activation.
    fn on_activation(&mut self, e: &ActivationEvent) {
        _ = e;
    }

    /// Called when a commit is abandoned.
    fn on_abort(&mut self, e: &AbortEvent) {
        _ = e;
    }

    /// Called after a draw attempt.
    fn on_draw(&mut self, e: &DrawEvent) {
        _ = e;
    }

    /// Called when a swap promise is kept or broken.
    fn on_swap_promise(&mut self, e: &SwapPromiseEvent) {
        _ = e;
    }

    /// Called at the beginning of a pipeline phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pipeline phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called with per-surface damage rectangles (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        _ = (frame_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates a `Tracer` method forwarding one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident, $event:ty, $sink_method:ident) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$event) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$sink_method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer from an optional sink.
    #[inline]
    #[must_use]
    pub fn from_option(sink: Option<&'a mut dyn TraceSink>) -> Self {
        match sink {
            Some(sink) => Self::new(sink),
            None => Self::none(),
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`CommitEvent`].
        commit, CommitEvent, on_commit
    );
    forward!(
        /// Emits an [`ActivationEvent`].
        activation, ActivationEvent, on_activation
    );
    forward!(
        /// Emits an [`AbortEvent`].
        abort, AbortEvent, on_abort
    );
    forward!(
        /// Emits a [`DrawEvent`].
        draw, DrawEvent, on_draw
    );
    forward!(
        /// Emits a [`SwapPromiseEvent`].
        swap_promise, SwapPromiseEvent, on_swap_promise
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin, PhaseBeginEvent, on_phase_begin
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end, PhaseEndEvent, on_phase_end
    );

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(frame_index, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit() -> CommitEvent {
        CommitEvent {
            source_frame: 3,
            structural: true,
            into_active: false,
            layers_pushed: 5,
            synced_values_changed: 1,
            swap_promises: 0,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_commit(&sample_commit());
        sink.on_abort(&AbortEvent {
            source_frame: 3,
            reason: AbortReason::OutputSurfaceLost,
        });
        sink.on_swap_promise(&SwapPromiseEvent {
            source_frame: 3,
            outcome: SwapOutcome::DidNotSwap(DidNotSwapReason::CommitFails),
        });
    }

    #[test]
    fn abort_reasons_map_to_promise_reasons() {
        assert_eq!(
            AbortReason::CommitNoUpdate.did_not_swap_reason(),
            DidNotSwapReason::CommitNoUpdate
        );
        assert_eq!(
            AbortReason::NotVisible.did_not_swap_reason(),
            DidNotSwapReason::CommitFails
        );
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.commit(&sample_commit());
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Commit,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            commits: Vec<u64>,
            phases: Vec<PhaseKind>,
        }
        impl TraceSink for RecordingSink {
            fn on_commit(&mut self, e: &CommitEvent) {
                self.commits.push(e.source_frame);
            }
            fn on_phase_end(&mut self, e: &PhaseEndEvent) {
                self.phases.push(e.phase);
            }
        }

        let mut sink = RecordingSink {
            commits: Vec::new(),
            phases: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.commit(&sample_commit());
        tracer.phase_end(&PhaseEndEvent {
            frame_index: 3,
            phase: PhaseKind::Activate,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.commits, &[3]);
        assert_eq!(sink.phases, &[PhaseKind::Activate]);
    }
}

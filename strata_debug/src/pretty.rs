// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Rectangles
//! are printed as `x0,y0..x1,y1`.

use std::io::Write;

use kurbo::Rect;
use strata_core::trace::{
    AbortEvent, AbortReason, ActivationEvent, CommitEvent, DamageRect, DidNotSwapReason, DrawEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, SwapOutcome, SwapPromiseEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

struct R(Rect);

impl std::fmt::Display for R {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}..{},{}", self.0.x0, self.0.y0, self.0.x1, self.0.y1)
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Commit => "commit",
        PhaseKind::Activate => "activate",
        PhaseKind::DrawProperties => "draw-props",
        PhaseKind::Damage => "damage",
        PhaseKind::Occlusion => "occlusion",
        PhaseKind::Draw => "draw",
    }
}

fn abort_name(reason: AbortReason) -> &'static str {
    match reason {
        AbortReason::CommitNoUpdate => "no-update",
        AbortReason::OutputSurfaceLost => "output-lost",
        AbortReason::NotVisible => "not-visible",
    }
}

fn did_not_swap_name(reason: DidNotSwapReason) -> &'static str {
    match reason {
        DidNotSwapReason::SwapFails => "swap-fails",
        DidNotSwapReason::CommitFails => "commit-fails",
        DidNotSwapReason::CommitNoUpdate => "commit-no-update",
        DidNotSwapReason::ActivationFails => "activation-fails",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_commit(&mut self, e: &CommitEvent) {
        let target = if e.into_active { "active" } else { "pending" };
        let _ = writeln!(
            self.writer,
            "[commit] frame={} structural={} into={target} layers={} synced={} promises={}",
            e.source_frame, e.structural, e.layers_pushed, e.synced_values_changed, e.swap_promises,
        );
    }

    fn on_activation(&mut self, e: &ActivationEvent) {
        let _ = writeln!(
            self.writer,
            "[activate] frame={} synced={} surfaces={}",
            e.source_frame, e.synced_values_changed, e.surface_count,
        );
    }

    fn on_abort(&mut self, e: &AbortEvent) {
        let _ = writeln!(
            self.writer,
            "[abort] frame={} reason={}",
            e.source_frame,
            abort_name(e.reason),
        );
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        let presented = if e.presented { "yes" } else { "no" };
        let _ = writeln!(
            self.writer,
            "[draw] frame={} damage={} passes={} items={} presented={presented}",
            e.frame_index,
            R(e.root_damage),
            e.render_passes,
            e.items,
        );
    }

    fn on_swap_promise(&mut self, e: &SwapPromiseEvent) {
        let outcome = match e.outcome {
            SwapOutcome::Activated => "activated",
            SwapOutcome::Swapped => "swapped",
            SwapOutcome::DidNotSwap(reason) => did_not_swap_name(reason),
        };
        let _ = writeln!(
            self.writer,
            "[promise] frame={} outcome={outcome}",
            e.source_frame,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            phase_name(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame_index,
            phase_name(e.phase),
        );
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let _ = write!(self.writer, "[damage] frame={frame_index} rects={}", rects.len());
        for r in rects {
            let _ = write!(self.writer, " {}:{}", r.surface_layer, R(r.rect));
        }
        let _ = writeln!(self.writer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).expect("sink writes UTF-8")
    }

    #[test]
    fn commit_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_commit(&CommitEvent {
            source_frame: 3,
            structural: true,
            into_active: false,
            layers_pushed: 5,
            synced_values_changed: 1,
            swap_promises: 0,
        });
        let output = text(sink);
        assert!(
            output.starts_with("[commit] frame=3 structural=true into=pending layers=5"),
            "got: {output}"
        );
        assert!(output.ends_with('\n'), "one line per event");
    }

    #[test]
    fn draw_and_promise_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_draw(&DrawEvent {
            frame_index: 7,
            root_damage: Rect::new(0.0, 0.0, 10.0, 20.0),
            render_passes: 2,
            items: 4,
            presented: true,
        });
        sink.on_swap_promise(&SwapPromiseEvent {
            source_frame: 2,
            outcome: SwapOutcome::DidNotSwap(DidNotSwapReason::CommitNoUpdate),
        });
        let output = text(sink);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            [
                "[draw] frame=7 damage=0,0..10,20 passes=2 items=4 presented=yes",
                "[promise] frame=2 outcome=commit-no-update",
            ],
            "got: {output}"
        );
    }

    #[test]
    fn damage_rects_are_listed_per_surface() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_damage_rects(
            4,
            &[
                DamageRect {
                    surface_layer: 0,
                    rect: Rect::new(0.0, 0.0, 5.0, 5.0),
                },
                DamageRect {
                    surface_layer: 3,
                    rect: Rect::ZERO,
                },
            ],
        );
        assert_eq!(
            text(sink),
            "[damage] frame=4 rects=2 0:0,0..5,5 3:0,0..0,0\n",
            "surface index then rectangle"
        );
    }

    #[test]
    fn abort_and_phase_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_abort(&AbortEvent {
            source_frame: 9,
            reason: AbortReason::NotVisible,
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Occlusion,
        });
        let output = text(sink);
        assert!(output.contains("[abort] frame=9 reason=not-visible"), "got: {output}");
        assert!(output.contains("[phase:begin] frame=1 occlusion"), "got: {output}");
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The consumer: owns the trees that are drawn.
//!
//! ## Frame lifecycle
//!
//! ```text
//! begin_main_frame ──► (producer) ──► finish_commit ──► activate ──► draw
//!        │                                  │
//!        └── pulled deltas                  └── abort_commit / no-update
//! ```
//!
//! In [`CommitMode::Threaded`] a commit fills a pending tree that is only
//! shown after [`activate`](Consumer::activate); the active tree keeps
//! drawing meanwhile. In [`CommitMode::SingleBuffered`] a commit writes into
//! the active tree and activates at once.
//!
//! The synchronized values live here and nowhere else. Interaction writes
//! them on the active side; commits write them on the pending side.

use core::mem;

use kurbo::Vec2;
use strata_core::layer::LayerId;
use strata_core::synced::TreeSide;
use strata_core::trace::{
    AbortEvent, AbortReason, ActivationEvent, CommitEvent, DidNotSwapReason, DrawEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, Tracer,
};
use strata_render::{
    RenderPlan, build_render_plan, did_draw_damaged_areas, reset_change_tracking, update_damage,
};

use crate::config::{CommitMode, PipelineConfig};
use crate::main_frame::{BeginMainFrameState, Commit, PageScaleAnimation};
use crate::output::OutputSurface;
use crate::synced_table::SyncedValues;
use crate::tree::{ConsumerTree, TreeRole};
use crate::ui_resource::UiResourceTable;

/// Outcome of [`Consumer::draw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawResult {
    /// A frame was presented.
    Swapped {
        /// The consumer frame that was presented.
        frame_index: u64,
    },
    /// Nothing changed on screen; no frame was presented.
    NoDamage,
    /// The active tree has no root.
    NothingToDraw,
    /// There is no output surface to draw to.
    NoOutputSurface,
    /// Presenting failed and the output surface was dropped.
    OutputSurfaceLost,
}

type Sink = Option<Box<dyn TraceSink + Send>>;

fn tracer(sink: &mut Sink) -> Tracer<'_> {
    match sink.as_deref_mut() {
        Some(s) => Tracer::new(s),
        None => Tracer::none(),
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Consumer-side state: trees, synchronized values, output and resources.
pub struct Consumer {
    config: PipelineConfig,
    synced: SyncedValues,
    active: ConsumerTree,
    pending: Option<ConsumerTree>,
    recycle: Option<ConsumerTree>,
    output: Option<Box<dyn OutputSurface + Send>>,
    ui_resources: UiResourceTable,
    sink: Sink,
    frame_index: u64,
    main_frame_in_flight: bool,
    ui_resources_evicted: bool,
    force_full_damage: bool,
    last_plan: RenderPlan,
}

impl core::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Consumer")
            .field("commit_mode", &self.config.commit_mode)
            .field("frame_index", &self.frame_index)
            .field("active_source_frame", &self.active.source_frame())
            .field("has_pending_tree", &self.pending.is_some())
            .field("has_output_surface", &self.output.is_some())
            .field("main_frame_in_flight", &self.main_frame_in_flight)
            .finish_non_exhaustive()
    }
}

impl Consumer {
    /// Creates a consumer with an empty active tree and no output surface.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            synced: SyncedValues::new(),
            active: ConsumerTree::new(TreeRole::Active),
            pending: None,
            recycle: None,
            output: None,
            ui_resources: UiResourceTable::new(),
            sink: None,
            frame_index: 0,
            main_frame_in_flight: false,
            ui_resources_evicted: false,
            force_full_damage: false,
            last_plan: RenderPlan::new(),
        }
    }

    /// Pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Synchronized values.
    #[must_use]
    pub fn synced(&self) -> &SyncedValues {
        &self.synced
    }

    /// The tree that is drawn.
    #[must_use]
    pub fn active_tree(&self) -> &ConsumerTree {
        &self.active
    }

    /// The tree waiting for activation, if any.
    #[must_use]
    pub fn pending_tree(&self) -> Option<&ConsumerTree> {
        self.pending.as_ref()
    }

    /// Returns `true` if a commit is waiting for activation.
    #[must_use]
    pub fn has_pending_tree(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns `true` between [`begin_main_frame`](Self::begin_main_frame)
    /// and the matching commit or abort.
    #[must_use]
    pub fn is_main_frame_in_flight(&self) -> bool {
        self.main_frame_in_flight
    }

    /// Number of frames [`draw`](Self::draw) has attempted.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The plan built by the last draw that got that far.
    #[must_use]
    pub fn last_plan(&self) -> &RenderPlan {
        &self.last_plan
    }

    /// Uploaded UI resources.
    #[must_use]
    pub fn ui_resources(&self) -> &UiResourceTable {
        &self.ui_resources
    }

    /// Returns `true` if an output surface is attached.
    #[must_use]
    pub fn has_output_surface(&self) -> bool {
        self.output.is_some()
    }

    /// Installs or removes the trace sink.
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink + Send>>) {
        self.sink = sink;
    }

    /// Attaches an output surface. The next frame is damaged in full.
    pub fn set_output_surface(&mut self, output: Box<dyn OutputSurface + Send>) {
        self.output = Some(output);
        self.force_full_damage = true;
    }

    /// Takes the page scale animation the active tree's commit requested.
    pub fn take_page_scale_animation(&mut self) -> Option<PageScaleAnimation> {
        self.active.take_page_scale_animation()
    }

    /// Asks the producer for a new frame.
    ///
    /// Pulls every interactive delta. Returns `None` while a main frame is
    /// already in flight or a pending tree awaits activation; the deltas stay
    /// where they are until then.
    pub fn begin_main_frame(&mut self) -> Option<BeginMainFrameState> {
        if self.main_frame_in_flight || self.pending.is_some() {
            return None;
        }
        self.main_frame_in_flight = true;
        Some(BeginMainFrameState {
            frame_index: self.frame_index,
            scroll_and_scale: self.synced.pull_deltas(),
            ui_resources_evicted: mem::take(&mut self.ui_resources_evicted),
        })
    }

    /// Consumes a commit from the producer.
    ///
    /// A commit without updates is aborted and its promises are broken with
    /// [`DidNotSwapReason::CommitNoUpdate`]; returns `false` in that case.
    ///
    /// # Panics
    ///
    /// In threaded mode, panics if a pending tree is still waiting for
    /// activation.
    pub fn finish_commit(&mut self, mut commit: Commit) -> bool {
        self.main_frame_in_flight = false;
        let source_frame = commit.source_frame();
        let mut tracer = tracer(&mut self.sink);

        if !commit.has_updates() {
            self.synced.abort_commit();
            commit.swap_promises.break_all(
                DidNotSwapReason::CommitNoUpdate,
                source_frame,
                &mut tracer,
            );
            tracer.abort(&AbortEvent {
                source_frame,
                reason: AbortReason::CommitNoUpdate,
            });
            return false;
        }

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase: PhaseKind::Commit,
        });

        if !commit.ui_resource_requests.is_empty() {
            match self.output.as_deref_mut() {
                Some(output) => self
                    .ui_resources
                    .process(&commit.ui_resource_requests, output.resources()),
                // Nowhere to upload; ask for everything again once an output
                // surface is back.
                None => self.ui_resources_evicted = true,
            }
        }

        let structural = commit.snapshot.is_structural();
        let promises = count(commit.swap_promises.len());
        let synced_changed = self.synced.push_commit(&commit);
        match self.config.commit_mode {
            CommitMode::Threaded => {
                assert!(
                    self.pending.is_none(),
                    "commit while a pending tree awaits activation"
                );
                let mut tree = self
                    .recycle
                    .take()
                    .unwrap_or_else(|| ConsumerTree::new(TreeRole::Recycle));
                tree.mirror_from(&self.active);
                tree.set_role(TreeRole::Pending);
                let stats = tree.apply_commit(&mut commit);
                self.pending = Some(tree);
                tracer.commit(&CommitEvent {
                    source_frame,
                    structural,
                    into_active: false,
                    layers_pushed: stats.pushed,
                    synced_values_changed: synced_changed,
                    swap_promises: promises,
                });
            }
            CommitMode::SingleBuffered => {
                commit.swap_promises.did_activate(source_frame, &mut tracer);
                let stats = self.active.apply_commit(&mut commit);
                let _ = self.synced.push_pending_to_active();
                tracer.commit(&CommitEvent {
                    source_frame,
                    structural,
                    into_active: true,
                    layers_pushed: stats.pushed,
                    synced_values_changed: synced_changed,
                    swap_promises: promises,
                });
            }
        }

        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase: PhaseKind::Commit,
        });
        true
    }

    /// Gives up on the main frame in flight.
    ///
    /// The producer breaks the promises it still holds; the consumer rolls
    /// back the deltas it had sent.
    pub fn abort_commit(&mut self, reason: AbortReason) {
        self.main_frame_in_flight = false;
        self.synced.abort_commit();
        tracer(&mut self.sink).abort(&AbortEvent {
            source_frame: self.active.source_frame(),
            reason,
        });
    }

    /// Makes the pending tree active. Returns `false` if there is none.
    ///
    /// The old active tree is kept for recycling. Its damage history moves
    /// to the new active tree, and layers that moved relative to it are
    /// flagged so the next draw repaints them.
    pub fn activate(&mut self) -> bool {
        let Some(mut incoming) = self.pending.take() else {
            return false;
        };
        let mut tracer = tracer(&mut self.sink);
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase: PhaseKind::Activate,
        });

        let synced_changed = self.synced.push_pending_to_active();
        let source_frame = incoming.source_frame();
        incoming.set_role(TreeRole::Active);
        incoming
            .swap_promises_mut()
            .did_activate(source_frame, &mut tracer);

        let baseline = self.active.footprints();
        let mut previous = mem::replace(&mut self.active, incoming);
        previous.set_role(TreeRole::Recycle);

        // Promises of the old active tree that were never presented ride on
        // the next frame, ahead of the new ones.
        let mut carried = mem::take(previous.swap_promises_mut());
        carried.append(self.active.swap_promises_mut());
        *self.active.swap_promises_mut() = carried;

        self.active
            .update_draw_properties(&self.synced, &self.config, Some(&baseline));
        self.active.adopt_damage(&mut previous);
        self.recycle = Some(previous);

        tracer.activation(&ActivationEvent {
            source_frame,
            synced_values_changed: synced_changed,
            surface_count: count(self.active.surfaces().len()),
        });
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase: PhaseKind::Activate,
        });
        true
    }

    /// Draws the active tree and presents it.
    pub fn draw(&mut self) -> DrawResult {
        self.frame_index += 1;
        let frame_index = self.frame_index;
        let Some(output) = self.output.as_deref_mut() else {
            return DrawResult::NoOutputSurface;
        };
        if self.active.arena().root().is_none() {
            return DrawResult::NothingToDraw;
        }
        let mut tracer = tracer(&mut self.sink);
        let viewport = self.config.viewport_rect();

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::DrawProperties,
        });
        self.active
            .update_draw_properties(&self.synced, &self.config, None);
        if mem::take(&mut self.force_full_damage) {
            self.active.force_full_damage();
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::DrawProperties,
        });

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Damage,
        });
        let surfaces = self.active.surfaces().to_vec();
        update_damage(self.active.arena_mut(), &surfaces);
        #[cfg(feature = "trace-rich")]
        {
            let rects: Vec<strata_core::trace::DamageRect> = surfaces
                .iter()
                .map(|&owner| strata_core::trace::DamageRect {
                    surface_layer: owner.index(),
                    rect: self
                        .active
                        .arena()
                        .surface(owner)
                        .damage
                        .current_damage_rect(),
                })
                .collect();
            tracer.damage_rects(frame_index, &rects);
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Damage,
        });

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Occlusion,
        });
        let ui_resources = &self.ui_resources;
        let plan = build_render_plan(
            self.active.arena(),
            &surfaces,
            viewport,
            self.config.occlusion,
            |id| ui_resources.resolve(id),
        );
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Occlusion,
        });

        let root_damage = plan.root_damage.bounds(viewport);
        let mut event = DrawEvent {
            frame_index,
            root_damage,
            render_passes: count(plan.passes.len()),
            items: count(plan.item_count()),
            presented: false,
        };

        if plan.root_damage.is_empty() {
            let source_frame = self.active.source_frame();
            self.active.swap_promises_mut().break_all(
                DidNotSwapReason::SwapFails,
                source_frame,
                &mut tracer,
            );
            reset_change_tracking(self.active.arena_mut());
            tracer.draw(&event);
            self.last_plan = plan;
            return DrawResult::NoDamage;
        }

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Draw,
        });
        let presented = output.swap(&plan, frame_index);
        if presented {
            self.active
                .swap_promises_mut()
                .did_swap(frame_index, &mut tracer);
            did_draw_damaged_areas(self.active.arena_mut(), &surfaces);
            reset_change_tracking(self.active.arena_mut());
        }
        event.presented = presented;
        tracer.draw(&event);
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Draw,
        });
        self.last_plan = plan;

        if presented {
            DrawResult::Swapped { frame_index }
        } else {
            self.did_lose_output_surface();
            DrawResult::OutputSurfaceLost
        }
    }

    /// Drops the output surface after it was lost.
    ///
    /// Promises waiting on the active tree are broken with
    /// [`DidNotSwapReason::SwapFails`], those on the pending tree with
    /// [`DidNotSwapReason::ActivationFails`]. Uploaded UI resources are gone
    /// with the surface; the next main frame asks the producer to re-send
    /// them. The next frame is damaged in full.
    pub fn did_lose_output_surface(&mut self) {
        self.output = None;
        let mut tracer = tracer(&mut self.sink);
        let source_frame = self.active.source_frame();
        self.active.swap_promises_mut().break_all(
            DidNotSwapReason::SwapFails,
            source_frame,
            &mut tracer,
        );
        if let Some(pending) = self.pending.as_mut() {
            let source_frame = pending.source_frame();
            pending.swap_promises_mut().break_all(
                DidNotSwapReason::ActivationFails,
                source_frame,
                &mut tracer,
            );
        }
        self.force_full_damage = true;
        if self.ui_resources.evict_all() {
            self.ui_resources_evicted = true;
        }
    }

    /// Scrolls `layer` on the active tree by up to `delta`, within its
    /// scroll range. Returns the part of `delta` that was not used.
    pub fn scroll_by(&mut self, layer: LayerId, delta: Vec2) -> Vec2 {
        let Some(max) = self
            .active
            .arena()
            .get(layer)
            .map(|l| l.props.max_scroll_offset())
        else {
            return delta;
        };
        let Some(value) = self.synced.scroll_offset(layer) else {
            return delta;
        };
        let current = value.current(TreeSide::Active);
        let wanted = current + delta;
        let next = Vec2::new(wanted.x.clamp(0.0, max.x), wanted.y.clamp(0.0, max.y));
        let _ = self.synced.set_scroll_offset(layer, next);
        delta - (next - current)
    }

    /// Sets the page scale on the active tree, clamped to the configured
    /// limits. Returns `false` if nothing changed.
    #[must_use]
    pub fn set_page_scale(&mut self, scale: f64) -> bool {
        let scale = self.config.page_scale_limits.clamp(scale);
        self.synced.set_page_scale(scale)
    }

    /// Sets the elastic overscroll on the active tree.
    #[must_use]
    pub fn set_elastic_overscroll(&mut self, overscroll: Vec2) -> bool {
        self.synced.set_elastic_overscroll(overscroll)
    }

    /// Sets how much of the top controls is shown, clamped to `0..=1`.
    #[must_use]
    pub fn set_top_controls_shown_ratio(&mut self, ratio: f64) -> bool {
        self.synced.set_top_controls_shown_ratio(ratio.clamp(0.0, 1.0))
    }
}

// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer and consumer taking turns on one thread.

use strata_core::trace::AbortReason;

use crate::config::{CommitMode, PipelineConfig};
use crate::consumer::{Consumer, DrawResult};
use crate::producer::SceneHost;

/// Drives a [`SceneHost`] and a [`Consumer`] in lockstep.
///
/// Commits are synchronous: [`commit`](Self::commit) returns once the
/// consumer has consumed the commit. Either [`CommitMode`] is honoured; in
/// threaded mode the pending tree still has to be activated.
#[derive(Debug)]
pub struct SingleThreadedPipeline {
    host: SceneHost,
    consumer: Consumer,
}

impl SingleThreadedPipeline {
    /// Creates both sides from one configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            host: SceneHost::new(&config),
            consumer: Consumer::new(config),
        }
    }

    /// The producer side.
    #[must_use]
    pub fn host(&self) -> &SceneHost {
        &self.host
    }

    /// The producer side, for mutation.
    pub fn host_mut(&mut self) -> &mut SceneHost {
        &mut self.host
    }

    /// The consumer side.
    #[must_use]
    pub fn consumer(&self) -> &Consumer {
        &self.consumer
    }

    /// The consumer side, for interaction and output management.
    pub fn consumer_mut(&mut self) -> &mut Consumer {
        &mut self.consumer
    }

    /// Starts a main frame: pulls the consumer's deltas into the host.
    /// Returns `false` if the consumer is not ready for one.
    pub fn begin_main_frame(&mut self) -> bool {
        match self.consumer.begin_main_frame() {
            Some(state) => {
                self.host.begin_main_frame(&state);
                true
            }
            None => false,
        }
    }

    /// Builds a commit and hands it to the consumer. Returns `false` if the
    /// commit carried nothing and was aborted.
    pub fn commit(&mut self) -> bool {
        let commit = self.host.begin_commit();
        self.consumer.finish_commit(commit)
    }

    /// Abandons the main frame in flight.
    pub fn abort_main_frame(&mut self, reason: AbortReason) {
        self.host.break_swap_promises(reason.did_not_swap_reason());
        self.consumer.abort_commit(reason);
    }

    /// Activates the pending tree, if any.
    pub fn activate(&mut self) -> bool {
        self.consumer.activate()
    }

    /// Draws the active tree.
    pub fn draw(&mut self) -> DrawResult {
        self.consumer.draw()
    }

    /// Runs a whole frame: main frame, commit, activation and draw.
    pub fn update_and_draw(&mut self) -> DrawResult {
        if self.begin_main_frame() {
            let committed = self.commit();
            if committed && self.consumer.config().commit_mode == CommitMode::Threaded {
                let _ = self.activate();
            }
        }
        self.draw()
    }
}

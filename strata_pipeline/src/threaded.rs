// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Producer and consumer on two threads.
//!
//! The calling thread owns the [`SceneHost`]. A spawned thread owns the
//! [`Consumer`] (and with it the output surface and every synchronized
//! value). The two sides share nothing: work for the consumer travels as
//! tasks over a channel and results come back over a one-shot reply channel.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use strata_core::trace::{AbortReason, TraceSink};

use crate::config::{CommitMode, PipelineConfig};
use crate::consumer::{Consumer, DrawResult};
use crate::output::OutputSurface;
use crate::producer::SceneHost;

type Job = Box<dyn FnOnce(&mut Consumer) + Send>;

enum Task {
    Run(Job),
    Shutdown,
}

fn consumer_loop(mut consumer: Consumer, tasks: Receiver<Task>) {
    while let Ok(task) = tasks.recv() {
        match task {
            Task::Run(job) => job(&mut consumer),
            Task::Shutdown => break,
        }
    }
}

/// Drives a [`SceneHost`] on the calling thread and a [`Consumer`] on its
/// own thread.
///
/// [`commit`](Self::commit) blocks the producer until the consumer has
/// consumed the commit; the consumer thread never waits on the producer.
pub struct ThreadedPipeline {
    host: SceneHost,
    commit_mode: CommitMode,
    tasks: Sender<Task>,
    consumer_thread: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for ThreadedPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadedPipeline")
            .field("host", &self.host)
            .field("commit_mode", &self.commit_mode)
            .field("running", &self.consumer_thread.is_some())
            .finish_non_exhaustive()
    }
}

impl ThreadedPipeline {
    /// Spawns the consumer thread.
    ///
    /// # Errors
    ///
    /// Returns the error from the OS if the thread cannot be spawned.
    pub fn new(config: PipelineConfig) -> io::Result<Self> {
        let (tasks, receiver) = unbounded();
        let consumer = Consumer::new(config);
        let consumer_thread = thread::Builder::new()
            .name("strata-consumer".to_owned())
            .spawn(move || consumer_loop(consumer, receiver))?;
        Ok(Self {
            host: SceneHost::new(&config),
            commit_mode: config.commit_mode,
            tasks,
            consumer_thread: Some(consumer_thread),
        })
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

    /// Runs `f` on the consumer thread and waits for its result.
    ///
    /// # Panics
    ///
    /// Panics if the consumer thread has exited (a task panicked).
    pub fn call<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut Consumer) -> R + Send + 'static,
    {
        let (reply, result) = bounded(1);
        self.post(move |consumer| {
            _ = reply.send(f(consumer));
        });
        match result.recv() {
            Ok(value) => value,
            Err(_) => panic!("consumer thread exited"),
        }
    }

    /// Queues `f` on the consumer thread without waiting.
    ///
    /// # Panics
    ///
    /// Panics if the consumer thread has exited.
    pub fn post(&self, f: impl FnOnce(&mut Consumer) + Send + 'static) {
        if self.tasks.send(Task::Run(Box::new(f))).is_err() {
            panic!("consumer thread exited");
        }
    }

    /// Attaches an output surface to the consumer.
    pub fn set_output_surface(&self, output: Box<dyn OutputSurface + Send>) {
        self.post(move |consumer| consumer.set_output_surface(output));
    }

    /// Installs a trace sink on the consumer.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink + Send>) {
        self.post(move |consumer| consumer.set_trace_sink(Some(sink)));
    }

    /// Starts a main frame: pulls the consumer's deltas into the host.
    /// Returns `false` if the consumer is not ready for one.
    pub fn begin_main_frame(&mut self) -> bool {
        match self.call(Consumer::begin_main_frame) {
            Some(state) => {
                self.host.begin_main_frame(&state);
                true
            }
            None => false,
        }
    }

    /// Sends a commit and blocks until the consumer has consumed it.
    /// Returns `false` if the commit carried nothing and was aborted.
    pub fn commit(&mut self) -> bool {
        let commit = self.host.begin_commit();
        self.call(move |consumer| consumer.finish_commit(commit))
    }

    /// Abandons the main frame in flight.
    pub fn abort_main_frame(&mut self, reason: AbortReason) {
        self.host.break_swap_promises(reason.did_not_swap_reason());
        self.post(move |consumer| consumer.abort_commit(reason));
    }

    /// Activates the pending tree, if any.
    pub fn activate(&self) -> bool {
        self.call(Consumer::activate)
    }

    /// Draws the active tree.
    pub fn draw(&self) -> DrawResult {
        self.call(Consumer::draw)
    }

    /// Runs a whole frame: main frame, commit, activation and draw.
    pub fn update_and_draw(&mut self) -> DrawResult {
        if self.begin_main_frame() {
            let committed = self.commit();
            if committed && self.commit_mode == CommitMode::Threaded {
                let _ = self.activate();
            }
        }
        self.draw()
    }
}

impl Drop for ThreadedPipeline {
    fn drop(&mut self) {
        _ = self.tasks.send(Task::Shutdown);
        if let Some(handle) = self.consumer_thread.take() {
            // A panic on the consumer thread already surfaced through `call`.
            _ = handle.join();
        }
    }
}

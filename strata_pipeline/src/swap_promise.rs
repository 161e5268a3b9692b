// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-completion notifications.
//!
//! A [`SwapPromise`] is queued on the producer and travels with the commit
//! that follows. It is resolved exactly once: either the frame containing the
//! commit is swapped ([`did_swap`](SwapPromise::did_swap)) or the pipeline
//! gives up on it ([`did_not_swap`](SwapPromise::did_not_swap)) with a
//! reason. [`did_activate`](SwapPromise::did_activate) may be called before
//! either.

use strata_core::trace::{DidNotSwapReason, SwapOutcome, SwapPromiseEvent, Tracer};

/// Receives the outcome of the frame that carries a commit.
pub trait SwapPromise: Send {
    /// The commit carrying this promise became the active tree.
    fn did_activate(&mut self) {}

    /// The frame containing the commit was presented.
    fn did_swap(&mut self, frame_index: u64);

    /// The commit will never be presented.
    fn did_not_swap(&mut self, reason: DidNotSwapReason);
}

/// Promises waiting on one tree.
#[derive(Default)]
pub struct SwapPromiseList {
    promises: Vec<Box<dyn SwapPromise>>,
}

impl core::fmt::Debug for SwapPromiseList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SwapPromiseList")
            .field("len", &self.promises.len())
            .finish()
    }
}

impl SwapPromiseList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unresolved promises.
    #[must_use]
    pub fn len(&self) -> usize {
        self.promises.len()
    }

    /// Returns `true` if no promise is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.promises.is_empty()
    }

    /// Queues a promise.
    pub fn push(&mut self, promise: Box<dyn SwapPromise>) {
        self.promises.push(promise);
    }

    /// Moves every promise of `other` to the end of this list.
    pub fn append(&mut self, other: &mut Self) {
        self.promises.append(&mut other.promises);
    }

    /// Notifies every promise that its commit activated. The promises stay
    /// queued.
    pub fn did_activate(&mut self, source_frame: u64, tracer: &mut Tracer<'_>) {
        for promise in &mut self.promises {
            promise.did_activate();
            tracer.swap_promise(&SwapPromiseEvent {
                source_frame,
                outcome: SwapOutcome::Activated,
            });
        }
    }

    /// Resolves every promise as swapped and empties the list.
    pub fn did_swap(&mut self, frame_index: u64, tracer: &mut Tracer<'_>) {
        for mut promise in self.promises.drain(..) {
            promise.did_swap(frame_index);
            tracer.swap_promise(&SwapPromiseEvent {
                source_frame: frame_index,
                outcome: SwapOutcome::Swapped,
            });
        }
    }

    /// Resolves every promise as broken and empties the list.
    pub fn break_all(
        &mut self,
        reason: DidNotSwapReason,
        source_frame: u64,
        tracer: &mut Tracer<'_>,
    ) {
        for mut promise in self.promises.drain(..) {
            promise.did_not_swap(reason);
            tracer.swap_promise(&SwapPromiseEvent {
                source_frame,
                outcome: SwapOutcome::DidNotSwap(reason),
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use strata_core::trace::DidNotSwapReason;

    use super::SwapPromise;

    /// What happened to a [`RecordingPromise`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum Resolution {
        Activated,
        Swapped(u64),
        NotSwapped(DidNotSwapReason),
    }

    /// A promise that appends its callbacks to a shared log.
    pub(crate) struct RecordingPromise {
        pub(crate) log: Arc<Mutex<Vec<Resolution>>>,
    }

    impl RecordingPromise {
        pub(crate) fn new() -> (Box<Self>, Arc<Mutex<Vec<Resolution>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            (Box::new(Self { log: log.clone() }), log)
        }

        fn record(&self, r: Resolution) {
            if let Ok(mut log) = self.log.lock() {
                log.push(r);
            }
        }
    }

    impl SwapPromise for RecordingPromise {
        fn did_activate(&mut self) {
            self.record(Resolution::Activated);
        }

        fn did_swap(&mut self, frame_index: u64) {
            self.record(Resolution::Swapped(frame_index));
        }

        fn did_not_swap(&mut self, reason: DidNotSwapReason) {
            self.record(Resolution::NotSwapped(reason));
        }
    }

    pub(crate) fn resolutions(log: &Arc<Mutex<Vec<Resolution>>>) -> Vec<Resolution> {
        match log.lock() {
            Ok(log) => log.clone(),
            Err(_) => panic!("promise log poisoned"),
        }
    }
}

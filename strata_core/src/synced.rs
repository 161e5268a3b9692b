// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Values written by both the producer and the consumer.
//!
//! A scroll offset is authoritative on the producer (layout may clamp or
//! jump it) but the consumer changes it every frame while the user scrolls.
//! [`SyncedValue`] keeps one base per tree plus the consumer's interactive
//! delta, and reconciles the two at commit boundaries without locks.
//!
//! # Protocol
//!
//! ```text
//!   consumer:  set_current(v)            active_delta = v ⊖ active_base
//!   consumer:  pull_delta_for_main_thread()   sent_delta = active_delta ──► producer
//!   producer:  push_from_main_thread(v)  pending_base = v      (inside a commit)
//!   consumer:  push_pending_to_active()  active_base = pending_base
//!                                        active_delta = active_delta ⊖ sent_delta
//!   consumer:  abort_commit()            active_base ⊕= sent_delta  (commit never landed)
//! ```
//!
//! Interaction that happens while a delta is in flight keeps accumulating in
//! `active_delta`; activation subtracts only the part the producer already
//! folded into its new base.
//!
//! # Discipline
//!
//! The value is not `Sync` and has no interior locking. Only the consumer
//! context owns it; the producer's `push_from_main_thread` is applied by the
//! consumer while the producer is blocked in a commit, so exactly one writer
//! exists at any instant. Debug builds track whether a delta is in flight
//! and assert that pulls and activations alternate correctly.

use core::fmt::Debug;
use core::marker::PhantomData;

use kurbo::Vec2;

/// A mathematical group over the values a [`SyncedValue`] stores.
pub trait Group {
    /// Element type.
    type Value: Copy + PartialEq + Debug;

    /// The neutral element.
    fn identity() -> Self::Value;

    /// `a ⊕ b`.
    fn combine(a: Self::Value, b: Self::Value) -> Self::Value;

    /// `a ⊖ b`, so that `combine(inverse_combine(a, b), b) == a`.
    fn inverse_combine(a: Self::Value, b: Self::Value) -> Self::Value;
}

/// Vector addition; identity is the zero vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdditiveVec2;

impl Group for AdditiveVec2 {
    type Value = Vec2;

    #[inline]
    fn identity() -> Vec2 {
        Vec2::ZERO
    }

    #[inline]
    fn combine(a: Vec2, b: Vec2) -> Vec2 {
        a + b
    }

    #[inline]
    fn inverse_combine(a: Vec2, b: Vec2) -> Vec2 {
        a - b
    }
}

/// Scalar addition; identity is `0.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdditiveScalar;

impl Group for AdditiveScalar {
    type Value = f64;

    #[inline]
    fn identity() -> f64 {
        0.0
    }

    #[inline]
    fn combine(a: f64, b: f64) -> f64 {
        a + b
    }

    #[inline]
    fn inverse_combine(a: f64, b: f64) -> f64 {
        a - b
    }
}

/// Scalar multiplication; identity is `1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Multiplicative;

impl Group for Multiplicative {
    type Value = f64;

    #[inline]
    fn identity() -> f64 {
        1.0
    }

    #[inline]
    fn combine(a: f64, b: f64) -> f64 {
        a * b
    }

    #[inline]
    fn inverse_combine(a: f64, b: f64) -> f64 {
        a / b
    }
}

/// Per-layer scroll offset.
pub type ScrollOffset = SyncedValue<AdditiveVec2>;
/// Rubber-band overscroll of the root scroller.
pub type ElasticOverscroll = SyncedValue<AdditiveVec2>;
/// Fraction of the top controls currently shown.
pub type TopControlsRatio = SyncedValue<AdditiveScalar>;
/// Page zoom factor.
pub type PageScale = SyncedValue<Multiplicative>;

/// Which consumer tree a read is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeSide {
    /// The tree built by the latest commit and not yet activated.
    Pending,
    /// The drawable tree.
    Active,
}

#[cfg(debug_assertions)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Epoch {
    Idle,
    DeltaInFlight,
}

/// A value with a producer-owned base and a consumer-owned delta.
///
/// See the [module docs](self) for the protocol.
#[derive(Clone, Debug)]
pub struct SyncedValue<G: Group> {
    pending_base: G::Value,
    active_base: G::Value,
    active_delta: G::Value,
    sent_delta: G::Value,
    clobber_active: bool,
    #[cfg(debug_assertions)]
    epoch: Epoch,
    _group: PhantomData<G>,
}

impl<G: Group> Default for SyncedValue<G> {
    fn default() -> Self {
        Self::new(G::identity())
    }
}

impl<G: Group> SyncedValue<G> {
    /// Creates a value whose bases are both `initial` and whose deltas are
    /// the identity.
    #[must_use]
    pub fn new(initial: G::Value) -> Self {
        Self {
            pending_base: initial,
            active_base: initial,
            active_delta: G::identity(),
            sent_delta: G::identity(),
            clobber_active: false,
            #[cfg(debug_assertions)]
            epoch: Epoch::Idle,
            _group: PhantomData,
        }
    }

    /// The value as seen by the given tree.
    #[must_use]
    pub fn current(&self, side: TreeSide) -> G::Value {
        match side {
            TreeSide::Active => G::combine(self.active_base, self.active_delta),
            TreeSide::Pending => G::combine(self.pending_base, self.pending_delta()),
        }
    }

    /// Consumer-side interactive write to the active value.
    ///
    /// Returns `false` if the delta did not change.
    #[must_use]
    pub fn set_current(&mut self, current: G::Value) -> bool {
        let delta = G::inverse_combine(current, self.active_base);
        if self.active_delta == delta {
            return false;
        }
        self.active_delta = delta;
        true
    }

    /// Snapshots the interactive delta for the producer and returns it.
    ///
    /// The returned delta stays recorded as "sent" until the next activation
    /// or [`abort_commit`](Self::abort_commit).
    pub fn pull_delta_for_main_thread(&mut self) -> G::Value {
        #[cfg(debug_assertions)]
        {
            assert!(
                self.epoch == Epoch::Idle || self.sent_delta == self.active_delta,
                "pulled a new delta while an earlier one is still in flight"
            );
            self.epoch = Epoch::DeltaInFlight;
        }
        self.sent_delta = self.active_delta;
        self.sent_delta
    }

    /// Producer write of the authoritative value for the pending tree.
    ///
    /// Returns `false` if the pending base is unchanged.
    #[must_use]
    pub fn push_from_main_thread(&mut self, main_thread_value: G::Value) -> bool {
        if self.pending_base == main_thread_value {
            return false;
        }
        self.pending_base = main_thread_value;
        true
    }

    /// Makes the pending base active, removing the part of the delta the
    /// producer has already absorbed.
    ///
    /// Returns `false` (and changes nothing) if there is nothing to apply.
    pub fn push_pending_to_active(&mut self) -> bool {
        #[cfg(debug_assertions)]
        {
            self.epoch = Epoch::Idle;
        }
        if self.active_base == self.pending_base && self.sent_delta == G::identity() {
            return false;
        }
        self.active_base = self.pending_base;
        self.active_delta = self.pending_delta();
        self.sent_delta = G::identity();
        self.clobber_active = false;
        true
    }

    /// Rolls back an in-flight send as if the sent delta had been committed
    /// and activated, so the producer does not need to resend it.
    pub fn abort_commit(&mut self) {
        #[cfg(debug_assertions)]
        {
            self.epoch = Epoch::Idle;
        }
        self.active_base = G::combine(self.active_base, self.sent_delta);
        self.active_delta = self.pending_delta();
        self.sent_delta = G::identity();
    }

    /// Delta the pending tree applies on top of its base.
    ///
    /// Always the identity while the clobber flag is set.
    #[must_use]
    pub fn pending_delta(&self) -> G::Value {
        if self.clobber_active {
            return G::identity();
        }
        G::inverse_combine(self.active_delta, self.sent_delta)
    }

    /// Makes the next activation discard any interactive delta.
    pub fn set_clobber_active_value(&mut self) {
        self.clobber_active = true;
    }

    /// Returns `true` if the next activation discards the interactive delta.
    #[inline]
    #[must_use]
    pub fn clobber_active_value(&self) -> bool {
        self.clobber_active
    }

    /// Base of the active tree.
    #[inline]
    #[must_use]
    pub fn active_base(&self) -> G::Value {
        self.active_base
    }

    /// Base of the pending tree.
    #[inline]
    #[must_use]
    pub fn pending_base(&self) -> G::Value {
        self.pending_base
    }

    /// Interactive delta on the active tree.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> G::Value {
        self.active_delta
    }

    /// Delta currently in flight to the producer.
    #[inline]
    #[must_use]
    pub fn sent_delta(&self) -> G::Value {
        self.sent_delta
    }
}

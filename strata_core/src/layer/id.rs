// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and UI-resource identity types.

use core::fmt;

/// Sentinel value indicating "no layer" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a layer.
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a layer is destroyed and the slot is reused. The
/// same handle names the producer's layer and every consumer copy of it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId {
    /// Slot index into the scene graph's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the scene graph's generation for this
    /// slot.
    pub(crate) generation: u32,
}

impl LayerId {
    /// Creates a handle from raw parts.
    ///
    /// Consumer-side arenas use this to rebuild handles they received in a
    /// commit; a handle made up out of thin air fails validation against the
    /// scene graph.
    #[inline]
    #[must_use]
    pub const fn from_raw(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// An opaque reference to a UI resource (a small bitmap owned by the
/// producer and uploaded by the consumer, such as a scrollbar thumb).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UiResourceId(pub u32);

impl fmt::Debug for UiResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UiResourceId({})", self.0)
    }
}

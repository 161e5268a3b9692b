// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack-free traversal of the surface list.
//!
//! The surface list is a two-level tree: each [`RenderSurface`] has a layer
//! list, and an entry in that list may itself own a surface further down the
//! list. [`SurfaceTraversal`] walks it in post-order per surface:
//!
//! ```text
//!   root ─┬─ A            back_to_front:  A, S, B, [S], (S), C, [root]
//!         ├─ S ─┬─ S      front_to_back:  C, B, S, [S], (S), A, [root]
//!         │     └─ B
//!         └─ C            [x] = target step, (x) = contributing step
//! ```
//!
//! A nested surface is fully expanded (its children, then its target step)
//! immediately before the contributing step that composites it into its
//! parent.
//!
//! The position is `(target_index, child_index)`. Instead of a stack, each
//! surface has two `Cell` fields: descending into a nested surface records
//! the parent's child index on the parent and the parent's index on the
//! child, and leaving a target step reads them back. Nested surfaces are
//! located by their stored list index, so each step is O(1) amortized and
//! the walk never allocates.

use strata_core::layer::LayerId;

use crate::layer::LayerArena;
use crate::surface::RenderSurface;

/// What a traversal step stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepRole {
    /// The target surface itself, after everything drawn into it.
    TargetSurface,
    /// A nested surface, as a single quad inside its parent target.
    ContributingSurface,
    /// A layer's own content.
    Itself,
}

/// One position of a [`SurfaceTraversal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraversalStep {
    /// Owner of the surface being drawn into (for a target step, the surface
    /// itself).
    pub target: LayerId,
    /// The layer this step is about.
    pub layer: LayerId,
    /// What the step represents.
    pub role: StepRole,
}

impl TraversalStep {
    /// Returns `true` for a target-surface step.
    #[inline]
    #[must_use]
    pub fn represents_target_surface(&self) -> bool {
        self.role == StepRole::TargetSurface
    }

    /// Returns `true` for a contributing-surface step.
    #[inline]
    #[must_use]
    pub fn represents_contributing_surface(&self) -> bool {
        self.role == StepRole::ContributingSurface
    }

    /// Returns `true` for a layer's own content.
    #[inline]
    #[must_use]
    pub fn represents_itself(&self) -> bool {
        self.role == StepRole::Itself
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    BackToFront,
    FrontToBack,
}

const TARGET: isize = -1;
const END: usize = usize::MAX;

/// Walks a surface list produced by
/// [`compute_draw_properties`](crate::compute_draw_properties).
///
/// Two traversals compare equal when they are at the same position,
/// regardless of direction.
///
/// # Panics
///
/// Stepping panics if the surface list is malformed: a listed layer that
/// owns no surface, or a nested surface whose stored list index does not
/// point back at it.
#[derive(Clone, Debug)]
pub struct SurfaceTraversal<'a> {
    arena: &'a LayerArena,
    surfaces: &'a [LayerId],
    direction: Direction,
    target_index: usize,
    child_index: isize,
}

impl PartialEq for SurfaceTraversal<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.target_index == other.target_index && self.child_index == other.child_index
    }
}

impl Eq for SurfaceTraversal<'_> {}

impl<'a> SurfaceTraversal<'a> {
    /// Starts a back-to-front walk (painting order).
    #[must_use]
    pub fn back_to_front(arena: &'a LayerArena, surfaces: &'a [LayerId]) -> Self {
        Self::begin(arena, surfaces, Direction::BackToFront)
    }

    /// Starts a front-to-back walk (occlusion order).
    #[must_use]
    pub fn front_to_back(arena: &'a LayerArena, surfaces: &'a [LayerId]) -> Self {
        Self::begin(arena, surfaces, Direction::FrontToBack)
    }

    /// The position after the last step.
    #[must_use]
    pub fn end(arena: &'a LayerArena, surfaces: &'a [LayerId]) -> Self {
        Self {
            arena,
            surfaces,
            direction: Direction::BackToFront,
            target_index: END,
            child_index: 0,
        }
    }

    fn begin(arena: &'a LayerArena, surfaces: &'a [LayerId], direction: Direction) -> Self {
        let mut t = Self {
            arena,
            surfaces,
            direction,
            target_index: END,
            child_index: 0,
        };
        if !surfaces.is_empty() {
            let first = t.first_child(0);
            t.settle(0, first);
        }
        t
    }

    /// Returns `true` once every step has been visited.
    #[inline]
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.target_index == END
    }

    /// `(target_index, child_index)`; a child index of `-1` is the target
    /// surface itself.
    #[inline]
    #[must_use]
    pub fn position(&self) -> (usize, isize) {
        (self.target_index, self.child_index)
    }

    /// The step at the current position.
    #[must_use]
    pub fn current(&self) -> Option<TraversalStep> {
        if self.is_end() {
            return None;
        }
        let target = self.surfaces[self.target_index];
        if self.child_index == TARGET {
            return Some(TraversalStep {
                target,
                layer: target,
                role: StepRole::TargetSurface,
            });
        }
        let layer = self.list(self.target_index)[self.child_index as usize];
        let role = if layer != target && self.arena.layer(layer).has_surface() {
            StepRole::ContributingSurface
        } else {
            StepRole::Itself
        };
        Some(TraversalStep {
            target,
            layer,
            role,
        })
    }

    fn surface(&self, index: usize) -> &'a RenderSurface {
        self.arena.surface(self.surfaces[index])
    }

    fn list(&self, index: usize) -> &'a [LayerId] {
        &self.surface(index).layer_list
    }

    fn first_child(&self, index: usize) -> isize {
        match self.direction {
            Direction::BackToFront => 0,
            Direction::FrontToBack => self.list(index).len() as isize - 1,
        }
    }

    fn next_child(&self, child: isize) -> isize {
        match self.direction {
            Direction::BackToFront => child + 1,
            Direction::FrontToBack => child - 1,
        }
    }

    /// The surface `layer` contributes to target `index`, if it is a nested
    /// surface rather than the target's own content.
    fn nested_surface(&self, index: usize, layer: LayerId) -> Option<&'a RenderSurface> {
        if layer == self.surfaces[index] {
            return None;
        }
        let surface = self.arena.layer(layer).render_surface.as_ref()?;
        assert!(
            self.surfaces.get(surface.list_index) == Some(&layer),
            "surface list index mismatch for {layer:?}"
        );
        Some(surface)
    }

    /// Moves to the first step at or after child `child` of target `index`,
    /// descending into nested surfaces.
    fn settle(&mut self, mut index: usize, mut child: isize) {
        loop {
            let list = self.list(index);
            if child < 0 || child as usize >= list.len() {
                self.target_index = index;
                self.child_index = TARGET;
                return;
            }
            let layer = list[child as usize];
            match self.nested_surface(index, layer) {
                Some(nested) => {
                    self.surface(index).child_index_history.set(child);
                    nested.parent_index_history.set(index);
                    index = nested.list_index;
                    child = self.first_child(index);
                }
                None => {
                    self.target_index = index;
                    self.child_index = child;
                    return;
                }
            }
        }
    }

    fn advance(&mut self) {
        if self.is_end() {
            return;
        }
        if self.child_index == TARGET {
            if self.target_index == 0 {
                self.target_index = END;
                self.child_index = 0;
                return;
            }
            let parent = self.surface(self.target_index).parent_index_history.get();
            self.child_index = self.surface(parent).child_index_history.get();
            self.target_index = parent;
            return;
        }
        let next = self.next_child(self.child_index);
        self.settle(self.target_index, next);
    }
}

impl Iterator for SurfaceTraversal<'_> {
    type Item = TraversalStep;

    fn next(&mut self) -> Option<TraversalStep> {
        let step = self.current()?;
        self.advance();
        Some(step)
    }
}

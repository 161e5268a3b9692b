// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The consumer's connection to the display.

use strata_render::RenderPlan;

use crate::ui_resource::ResourceManager;

/// Presents render plans and owns the uploads they reference.
///
/// Implementations turn a [`RenderPlan`] into pixels (a GPU backend, a test
/// double). Losing the surface also loses every upload made through
/// [`resources`](Self::resources).
pub trait OutputSurface {
    /// Draws and presents `plan`. Returns `false` if presenting failed; the
    /// consumer then treats the surface as lost.
    fn swap(&mut self, plan: &RenderPlan, frame_index: u64) -> bool;

    /// The resource manager uploads go through.
    fn resources(&mut self) -> &mut dyn ResourceManager;
}

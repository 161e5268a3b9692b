// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable diagnostics for strata pipelines.
//!
//! [`pretty::PrettyPrintSink`] is a
//! [`TraceSink`](strata_core::trace::TraceSink) that writes one line per
//! pipeline event. Install it on a consumer with
//! `Consumer::set_trace_sink` (the `trace` feature of `strata_pipeline` must
//! be on for events to be emitted).

pub mod pretty;

//! Span helpers for the process and for individual runs.
//!
//! # Design
//! - Provides an application-level span guard so every log line carries mode/build info.
//! - Run spans carry the run and flow identifiers for correlation.

use tracing::{Span, span::Entered};
use uuid::Uuid;

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Build the span wrapping a single flow run.
#[must_use]
pub fn run_span(run_id: Uuid, flow_id: Uuid) -> Span {
    tracing::info_span!("run", run_id = %run_id, flow_id = %flow_id)
}

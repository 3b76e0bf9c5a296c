//! Run pipeline stages and their metric labels.

/// Stages every run moves through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunStep {
    /// Flow lookup, connector acquisition, and connectivity probes.
    Preflight,
    /// Template resolution and container get-or-create.
    ResolveDestination,
    /// Source listing.
    ListItems,
    /// Per-item filtering and attachment transfer.
    ProcessItems,
    /// Persisting the terminal record.
    Finalise,
}

impl RunStep {
    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::ResolveDestination => "resolve_destination",
            Self::ListItems => "list_items",
            Self::ProcessItems => "process_items",
            Self::Finalise => "finalise",
        }
    }
}

/// Progress of a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// The step began.
    Started,
    /// The step finished successfully.
    Completed,
    /// The step aborted the run.
    Failed,
}

impl StepStatus {
    /// Metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

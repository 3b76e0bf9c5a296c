#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Flow execution engine.
//!
//! Layout:
//! - `filter`: trigger filter predicates over candidate items.
//! - `path`: destination templating and container get-or-create.
//! - `engine`: the run state machine producing execution records.
//! - `scheduler`: periodic runs of enabled flows.

pub mod engine;
pub mod error;
pub mod filter;
pub mod path;
pub mod scheduler;
pub mod step;

pub use engine::{EngineDeps, FlowEngine, RunHandle};
pub use error::{EngineError, EngineResult};
pub use filter::{eligible_attachments, matches};
pub use path::{AUTO_PATH_TEMPLATE, PathContext, ensure_exists, normalize_path, resolve, template_for};
pub use scheduler::FlowScheduler;
pub use step::{RunStep, StepStatus};

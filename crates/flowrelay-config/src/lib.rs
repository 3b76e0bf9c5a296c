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

//! Flow definitions, engine settings, and the flow catalog.
//!
//! Layout: `model.rs` (flow and trigger filter types), `validate.rs`
//! (normalisation and parsing helpers), `settings.rs` (engine tuning read from
//! the environment), `catalog.rs` (read-only flow lookup).

pub mod catalog;
pub mod error;
pub mod model;
pub mod settings;
pub mod validate;

pub use catalog::{FileFlowCatalog, FlowCatalog, MemoryFlowCatalog};
pub use error::{ConfigError, ConfigResult};
pub use model::{DuplicatePolicy, FlowConfig, TriggerFilter};
pub use settings::EngineSettings;
pub use validate::{normalize_extension, validate_flow};

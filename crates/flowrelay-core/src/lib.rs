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

//! Connector-agnostic flow interfaces and DTOs.
//!
//! Layout: `model/` (items, containers, uploads), `record.rs` (execution
//! records and the run ledger), `service/` (connector traits), `error.rs`
//! (connector error taxonomy).

pub mod error;
pub mod model;
pub mod record;
pub mod service;

pub use error::{ConnectorError, ConnectorResult};
pub use model::{
    Attachment, CandidateItem, DestinationContainer, SourceQuery, UploadDisposition,
    UploadRequest, UploadedFile, suffixed_filename,
};
pub use record::{ExecutionRecord, LogEntry, LogLevel, RunLedger, RunStatus};
pub use service::{
    ConnectorProvider, ConnectorSet, DestinationConnector, SourceConnector, StaticConnectors,
};

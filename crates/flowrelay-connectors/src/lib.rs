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

//! Connectors backed by the local filesystem.
//!
//! - [`SpoolSource`] reads messages dropped into a spool directory.
//! - [`LocalDestination`] stores payloads in a directory tree.

mod local;
mod paths;
mod spool;

pub use local::LocalDestination;
pub use spool::{MESSAGE_MANIFEST, SpoolSource};

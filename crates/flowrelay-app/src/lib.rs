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

//! Flowrelay application wiring.
//!
//! Layout: `bootstrap.rs` (environment and service wiring), `cli.rs`
//! (command dispatch), `error.rs` (application errors).

/// Environment loading and service wiring.
pub mod bootstrap;
/// Command-line entry points.
pub mod cli;
/// Application error types.
pub mod error;

pub use bootstrap::{AppEnv, Services, build_services};
pub use cli::run;
pub use error::{AppError, AppResult};

//! Checklist Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the checklist workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`ClbError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: rank vocabulary, node labels and relation types
//! - **Fingerprints**: digests of imported source files
//!
//! # Example
//!
//! ```no_run
//! use clb_common::{Result, fingerprint::Fingerprint};
//!
//! fn describe(path: &str) -> Result<()> {
//!     let fp = Fingerprint::of_file(path)?;
//!     tracing::info!(%fp, "Source file");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ClbError, Result};
pub use types::{Label, Rank, RankKey, RelType};

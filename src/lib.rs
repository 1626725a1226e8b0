//! # insights-export
//!
//! Exports a digital assistant's insights data: starts the export task over
//! the service's REST API, polls the task with exponential backoff until it
//! reaches a terminal status, and downloads the resulting ZIP artifacts to a
//! local directory.
//!
//! The interesting parts are the request-signing scheme ([`signer`]) the
//! service requires on every call, and the polling state machine ([`poller`])
//! that turns a fire-and-forget export request into a reliably observed
//! terminal result. Everything else is thin I/O glue around one
//! start-poll-download workflow per invocation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use insights_export::{Credentials, ExportParams, Exporter, Profile, RetryConfig, Transport};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = Profile::load(Path::new("config.json"))?;
//!     let credentials = Credentials::from_profile(&profile)?;
//!     let transport = Transport::new(&profile.base_url(), credentials)?;
//!     let exporter = Exporter::new(transport, RetryConfig::default());
//!
//!     let outcome = exporter
//!         .run(&ExportParams {
//!             bot_id: "my-bot".to_string(),
//!             task_name: None,
//!             begin_date: Some("2024-01-01".to_string()),
//!             end_date: Some("2024-01-31".to_string()),
//!             output_dir: "./exports".into(),
//!         })
//!         .await?;
//!
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types (profile file, retry schedule)
pub mod config;
/// Error types
pub mod error;
/// Export workflow orchestration
pub mod export;
/// Task status polling with backoff
pub mod poller;
/// Backoff schedule and retryability classification
pub mod retry;
/// HTTP request signing
pub mod signer;
/// Signed HTTP transport
pub mod transport;

// Re-export commonly used types
pub use config::{Profile, RetryConfig};
pub use error::{Error, Result};
pub use export::{ExportOutcome, ExportParams, ExportTask, Exporter, TaskStatus};
pub use poller::{PollOutcome, TaskPoller};
pub use retry::{Backoff, IsRetryable};
pub use signer::{Credentials, RequestDescriptor, Signer};
pub use transport::{ResponseBody, Transport};

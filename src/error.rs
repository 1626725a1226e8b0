//! Error types for insights-export
//!
//! Every failure in the workflow funnels into a single [`Error`] enum so the
//! binary can apply one fatal-error policy: print the diagnostic, exit
//! non-zero. Retryability classification lives in [`crate::retry`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for insights-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for insights-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "privateKeyPath")
        key: Option<String>,
    },

    /// Bad local input (dates, output directory), caught before any network call
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection-level failure (DNS, reset, timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the service
    ///
    /// `title` and `detail` are populated when the service returned a
    /// structured JSON error body, otherwise `title` carries the canonical
    /// status reason.
    #[error("API error {status}: {title}{}", .detail.as_deref().map(|d| format!(" - {d}")).unwrap_or_default())]
    Api {
        /// HTTP status code of the failed response
        status: u16,
        /// Error title (from the JSON body, or the canonical reason phrase)
        title: String,
        /// Additional detail from a structured JSON error body
        detail: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request signing failed
    #[error("signing error: {0}")]
    Signing(String),

    /// Retry budget exhausted while the export task was still active
    #[error(
        "export task {task_id} still active after {attempts} status checks; \
         check back later and retrieve the results using this task id"
    )]
    PollTimeout {
        /// Server-assigned identifier of the still-active task
        task_id: String,
        /// Number of status checks performed before giving up
        attempts: u32,
    },

    /// Failure downloading one of the export's output files
    #[error("failed to download {file} to {}: {source}", .dest.display())]
    Download {
        /// The output file that failed to download
        file: String,
        /// Local destination path of the failed download
        dest: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Shorthand for a `Config` error without a key
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Shorthand for a `Config` error naming the offending key
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

//! Operation error taxonomy.
//!
//! Every fatal condition the run can hit maps to one variant here, so the
//! CLI can turn any error into a single structured failure payload. Expected
//! alternate outcomes (304, content already identical) are not errors; they
//! are `TransferOutcome` / `ReconcileResult` states.

use std::path::PathBuf;
use thiserror::Error;

/// Sentinel status code reported when no HTTP status was obtained
/// (DNS failure, connection refused, TLS failure).
pub const NO_STATUS: i64 = -1;

#[derive(Error, Debug)]
pub enum GrabError {
    /// Transport-level failure with no HTTP status (DNS, connect, TLS).
    #[error("Request failed: {message}")]
    Transport { message: String },

    /// Server answered with a status that is neither 200-class nor 304.
    #[error("Request failed: HTTP Error {status}: {message}")]
    HttpStatus { status: u32, message: String },

    /// Temp-file creation, streaming, copy, or removal failure.
    #[error("{context}: {source}")]
    LocalIo {
        context: String,
        source: std::io::Error,
    },

    /// Destination or containing directory lacks a needed permission.
    #[error("{path} is not {needed}")]
    Permission { path: PathBuf, needed: &'static str },

    /// Caller-supplied checksum does not match the final destination file.
    #[error("checksum mismatch: expected sha256 `{expected}`, got `{actual}`")]
    Integrity { expected: String, actual: String },

    /// Unusable invocation parameters (bad URL, bad mode string).
    #[error("{0}")]
    Configuration(String),
}

impl GrabError {
    pub fn local_io(context: impl Into<String>, source: std::io::Error) -> Self {
        GrabError::LocalIo {
            context: context.into(),
            source,
        }
    }

    /// Status code carried in the failure payload, when one applies.
    pub fn status_code(&self) -> Option<i64> {
        match self {
            GrabError::Transport { .. } => Some(NO_STATUS),
            GrabError::HttpStatus { status, .. } => Some(i64::from(*status)),
            _ => None,
        }
    }
}

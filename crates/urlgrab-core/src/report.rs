//! Structured result payloads, one JSON document per run.

use serde::Serialize;

use crate::error::GrabError;

/// Success-side payload. Field presence varies by outcome: a full download
/// carries `src`/`md5sum`, a not-modified or already-exists run does not.
#[derive(Debug, Serialize)]
pub struct TaskReport {
    pub url: String,
    pub dest: String,
    pub changed: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256sum: Option<String>,
}

impl TaskReport {
    /// The force=false short-circuit: destination already present with the
    /// expected checksum.
    pub fn already_exists(url: &str, dest: &str, changed: bool, sha256sum: Option<&str>) -> Self {
        TaskReport {
            url: url.to_string(),
            dest: dest.to_string(),
            changed,
            msg: "file already exists".to_string(),
            src: None,
            md5sum: None,
            sha256sum: sha256sum.map(str::to_string),
        }
    }
}

/// Failure payload; the run exits non-zero after emitting it.
#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl FailureReport {
    pub fn from_error(err: &GrabError) -> Self {
        let response = match err {
            GrabError::HttpStatus { message, .. } => Some(message.clone()),
            _ => None,
        };
        FailureReport {
            msg: err.to_string(),
            status_code: err.status_code(),
            response,
        }
    }
}

//! URL fetch: conditional request, credential handling, streaming to a
//! staged temp file.
//!
//! Uses the curl crate (libcurl) with one `Easy` handle per invocation, so
//! basic auth and proxy bypass are per-call configuration with no ambient
//! transport state. Response classification is explicit: 304 and non-200
//! statuses come back as `TransferOutcome` variants, not errors; only
//! transport-level failures with no status and local I/O failures are fatal.

use chrono::{DateTime, Utc};
use curl::easy::{Auth, Easy, List};
use std::cell::{Cell, RefCell};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

use crate::config::GrabConfig;
use crate::error::{GrabError, NO_STATUS};
use crate::request::TransferRequest;

/// Fixed identifying user-agent, kept for compatibility with servers that
/// special-case it.
pub const USER_AGENT: &str = "ansible-httpget";

/// Exclusively-owned staged download file. Removed on drop, so no exit path
/// can leak it; `remove` exists for the explicit success-path cleanup.
#[derive(Debug)]
pub struct StagedFile {
    inner: NamedTempFile,
}

impl StagedFile {
    pub fn create() -> Result<Self, GrabError> {
        let inner = tempfile::Builder::new()
            .prefix("urlgrab-")
            .tempfile()
            .map_err(|e| GrabError::local_io("create staged temp file", e))?;
        Ok(StagedFile { inner })
    }

    /// Staged file pre-filled with `bytes`. Test construction helper.
    pub fn with_content(bytes: &[u8]) -> Result<Self, GrabError> {
        let staged = Self::create()?;
        fs::write(staged.path(), bytes)
            .map_err(|e| GrabError::local_io(format!("write {}", staged.path().display()), e))?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub(crate) fn as_file(&self) -> &fs::File {
        self.inner.as_file()
    }

    /// Explicitly remove the staged file. Drop does the same; this variant
    /// logs a removal failure instead of swallowing it.
    pub fn remove(self) {
        if let Err(e) = self.inner.close() {
            tracing::warn!("failed to remove staged file: {}", e);
        }
    }
}

/// Outcome of a single fetch, consumed once by the reconciler.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Server said the destination's copy is current (304).
    NotModified { message: String },
    /// Body was streamed into `staged`.
    Fetched {
        staged: StagedFile,
        content_length: Option<u64>,
        status_message: String,
    },
    /// Error response with a status, or transport failure (`status_code` -1).
    Failed { status_code: i64, message: String },
}

/// Format a filesystem mtime for `If-Modified-Since` (UTC, RFC-1123 shape).
pub(crate) fn http_date(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// Parse an HTTP status line like `HTTP/1.1 200 OK` into (code, reason).
pub(crate) fn parse_status_line(line: &str) -> Option<(u32, String)> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.splitn(3, ' ');
    let _version = parts.next()?;
    let code = parts.next()?.parse::<u32>().ok()?;
    let reason = parts.next().unwrap_or("").trim().to_string();
    Some((code, reason))
}

fn setup_err(e: curl::Error) -> GrabError {
    GrabError::Configuration(format!("transfer setup failed: {}", e))
}

/// Fetch the request's URL, streaming the body into a fresh staged file.
///
/// Attaches `If-Modified-Since` from the destination mtime when the
/// destination exists and force is off. Creates exactly one temp file on the
/// 200 path and none otherwise.
pub fn fetch(req: &TransferRequest, cfg: &GrabConfig) -> Result<TransferOutcome, GrabError> {
    let mut easy = Easy::new();
    easy.url(&req.url).map_err(setup_err)?;
    easy.useragent(USER_AGENT).map_err(setup_err)?;
    easy.follow_location(true).map_err(setup_err)?;
    easy.max_redirections(cfg.max_redirects).map_err(setup_err)?;
    if let Some(secs) = cfg.connect_timeout_secs {
        easy.connect_timeout(Duration::from_secs(secs))
            .map_err(setup_err)?;
    }

    // Proxy bypass is scoped to this handle; the process environment is
    // never mutated.
    if !req.use_proxy {
        easy.noproxy("*").map_err(setup_err)?;
    }

    if let Some(creds) = &req.credentials {
        easy.username(&creds.user).map_err(setup_err)?;
        easy.password(creds.password.as_deref().unwrap_or(""))
            .map_err(setup_err)?;
        easy.http_auth(Auth::new().basic(true)).map_err(setup_err)?;
    }

    let mut headers = List::new();
    if req.dest.is_file() && !req.force {
        if let Ok(mtime) = fs::metadata(&req.dest).and_then(|m| m.modified()) {
            headers
                .append(&format!("If-Modified-Since: {}", http_date(mtime)))
                .map_err(setup_err)?;
        }
    }
    easy.http_headers(headers).map_err(setup_err)?;

    let staged = StagedFile::create()?;
    let mut out = staged
        .as_file()
        .try_clone()
        .map_err(|e| GrabError::local_io("clone staged file handle", e))?;

    // Shared across the header and body callbacks; single-threaded transfer.
    let status: RefCell<Option<(u32, String)>> = RefCell::new(None);
    let written: Cell<u64> = Cell::new(0);
    let write_err: RefCell<Option<std::io::Error>> = RefCell::new(None);

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = std::str::from_utf8(data) {
                    if let Some(parsed) = parse_status_line(s.trim_end()) {
                        *status.borrow_mut() = Some(parsed);
                    }
                }
                true
            })
            .map_err(setup_err)?;
        transfer
            .write_function(|data| {
                // Error-response bodies are drained, not staged; without an
                // HTTP status line (FTP) everything is body.
                let success = status
                    .borrow()
                    .as_ref()
                    .map_or(true, |(code, _)| (200..300).contains(code));
                if !success {
                    return Ok(data.len());
                }
                match out.write_all(data) {
                    Ok(()) => {
                        written.set(written.get() + data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        *write_err.borrow_mut() = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(setup_err)?;

        if let Err(e) = transfer.perform() {
            // Staged file (partial or empty) is removed when `staged` drops.
            if let Some(io_err) = write_err.borrow_mut().take() {
                return Err(GrabError::local_io(
                    format!("write {}", staged.path().display()),
                    io_err,
                ));
            }
            tracing::debug!("transfer failed without a status: {}", e);
            return Ok(TransferOutcome::Failed {
                status_code: NO_STATUS,
                message: e.to_string(),
            });
        }
    }

    if let Some(io_err) = write_err.borrow_mut().take() {
        return Err(GrabError::local_io(
            format!("write {}", staged.path().display()),
            io_err,
        ));
    }

    let code = easy
        .response_code()
        .map_err(|e| GrabError::Transport {
            message: format!("no response code: {}", e),
        })?;
    let reason = status
        .into_inner()
        .map(|(_, r)| r)
        .unwrap_or_default();

    match code {
        304 => Ok(TransferOutcome::NotModified {
            message: if reason.is_empty() {
                "Not Modified".to_string()
            } else {
                reason
            },
        }),
        200..=299 => {
            let content_length = easy
                .content_length_download()
                .ok()
                .filter(|len| *len >= 0.0)
                .map(|len| len as u64);
            let status_message = format!(
                "{} ({} bytes)",
                if reason.is_empty() { "OK" } else { &reason },
                written.get()
            );
            tracing::info!(url = %req.url, bytes = written.get(), "fetched");
            Ok(TransferOutcome::Fetched {
                staged,
                content_length,
                status_message,
            })
        }
        other => Ok(TransferOutcome::Failed {
            status_code: i64::from(other),
            message: if reason.is_empty() {
                format!("HTTP Error {}", other)
            } else {
                reason
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn http_date_epoch() {
        assert_eq!(
            http_date(SystemTime::UNIX_EPOCH),
            "Thu, 01 Jan 1970 00:00:00 +0000"
        );
    }

    #[test]
    fn http_date_known_instant() {
        // 2015-10-21 07:28:00 UTC
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_445_412_480);
        assert_eq!(http_date(t), "Wed, 21 Oct 2015 07:28:00 +0000");
    }

    #[test]
    fn parse_status_line_with_reason() {
        assert_eq!(
            parse_status_line("HTTP/1.1 404 Not Found"),
            Some((404, "Not Found".to_string()))
        );
    }

    #[test]
    fn parse_status_line_http2_no_reason() {
        assert_eq!(parse_status_line("HTTP/2 200"), Some((200, String::new())));
    }

    #[test]
    fn parse_status_line_rejects_non_status() {
        assert!(parse_status_line("Content-Length: 5").is_none());
    }

    #[test]
    fn staged_file_removed_on_drop() {
        let staged = StagedFile::with_content(b"abc").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.is_file());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn staged_file_removed_explicitly() {
        let staged = StagedFile::with_content(b"abc").unwrap();
        let path = staged.path().to_path_buf();
        staged.remove();
        assert!(!path.exists());
    }
}

//! Decides whether the destination must be replaced and performs the
//! replacement.
//!
//! Content identity is an MD5 fingerprint comparison between the staged file
//! and any existing destination; the caller-supplied SHA-256 gate runs
//! against the final destination file after the copy decision, so a stale
//! destination with a wrong checksum is caught even when no copy happened.
//! The staged file never outlives the call: explicit removal on the success
//! path, drop-based removal on every error path.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::error::GrabError;
use crate::fetcher::{StagedFile, TransferOutcome};
use crate::request::{parent_dir, TransferRequest};

/// Terminal result of a reconcile. `fingerprint` and `staged_path` are
/// present only when a body was actually fetched.
#[derive(Debug)]
pub struct ReconcileResult {
    pub changed: bool,
    pub final_path: PathBuf,
    pub fingerprint: Option<String>,
    pub checksum_verified: Option<bool>,
    pub staged_path: Option<PathBuf>,
    pub message: String,
}

/// Consume a fetch outcome and bring the destination in line with it.
///
/// `expected_sha256` must already be sanitized (see
/// [`checksum::sanitize_checksum`]); `None` skips the gate.
pub fn reconcile(
    outcome: TransferOutcome,
    req: &TransferRequest,
    expected_sha256: Option<&str>,
) -> Result<ReconcileResult, GrabError> {
    match outcome {
        TransferOutcome::NotModified { message } => Ok(ReconcileResult {
            changed: false,
            final_path: req.dest.clone(),
            fingerprint: None,
            checksum_verified: None,
            staged_path: None,
            message,
        }),
        TransferOutcome::Failed {
            status_code,
            message,
        } => {
            if status_code < 0 {
                Err(GrabError::Transport { message })
            } else {
                Err(GrabError::HttpStatus {
                    status: status_code as u32,
                    message,
                })
            }
        }
        TransferOutcome::Fetched {
            staged,
            status_message,
            ..
        } => reconcile_fetched(staged, req, expected_sha256, status_message),
    }
}

fn reconcile_fetched(
    staged: StagedFile,
    req: &TransferRequest,
    expected_sha256: Option<&str>,
    message: String,
) -> Result<ReconcileResult, GrabError> {
    let dest = &req.dest;

    // Any `?` from here on drops `staged`, which removes the temp file.
    if !staged.path().is_file() {
        return Err(GrabError::local_io(
            format!("staged file {} vanished", staged.path().display()),
            std::io::Error::new(ErrorKind::NotFound, "no such file"),
        ));
    }
    let new_fingerprint = checksum::md5_path(staged.path())?;

    let mut changed = false;
    if dest.exists() {
        check_read_write(dest)?;
        let old_fingerprint = checksum::md5_path(dest)?;
        if old_fingerprint != new_fingerprint {
            copy_over(staged.path(), dest)?;
            changed = true;
        } else {
            tracing::debug!(dest = %dest.display(), "content identical, destination untouched");
        }
    } else {
        check_dir_writable(parent_dir(dest))?;
        copy_over(staged.path(), dest)?;
        changed = true;
    }

    let mut checksum_verified = None;
    if let Some(expected) = expected_sha256 {
        let actual = checksum::sha256_path(dest)?;
        if actual != expected {
            if let Err(e) = fs::remove_file(dest) {
                tracing::warn!("failed to remove {} after checksum mismatch: {}", dest.display(), e);
            }
            return Err(GrabError::Integrity {
                expected: expected.to_string(),
                actual,
            });
        }
        checksum_verified = Some(true);
    }

    let staged_path = staged.path().to_path_buf();
    staged.remove();

    Ok(ReconcileResult {
        changed,
        final_path: dest.clone(),
        fingerprint: Some(new_fingerprint),
        checksum_verified,
        staged_path: Some(staged_path),
        message,
    })
}

fn copy_over(src: &Path, dest: &Path) -> Result<(), GrabError> {
    fs::copy(src, dest)
        .map_err(|e| GrabError::local_io(format!("copy to {}", dest.display()), e))?;
    Ok(())
}

/// The existing destination must be both readable (for the fingerprint) and
/// writable (for the copy). Checked by opening, which also honors ACLs.
fn check_read_write(path: &Path) -> Result<(), GrabError> {
    File::open(path).map_err(|e| classify_access(e, path, "readable"))?;
    OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| classify_access(e, path, "writable"))?;
    Ok(())
}

/// Probe directory writability by creating an anonymous temp file in it.
fn check_dir_writable(dir: &Path) -> Result<(), GrabError> {
    tempfile::tempfile_in(dir).map_err(|e| classify_access(e, dir, "writable"))?;
    Ok(())
}

fn classify_access(e: std::io::Error, path: &Path, needed: &'static str) -> GrabError {
    if e.kind() == ErrorKind::PermissionDenied {
        GrabError::Permission {
            path: path.to_path_buf(),
            needed,
        }
    } else {
        GrabError::local_io(format!("access {}", path.display()), e)
    }
}

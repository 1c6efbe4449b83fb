//! The single-shot operation: validate, maybe short-circuit, fetch,
//! reconcile, apply attributes, report.
//!
//! Control flow: when the destination already exists, force is off, and the
//! caller supplied a checksum, a matching destination ends the run without
//! touching the network; a mismatching one promotes the run to a forced
//! download (the conditional header would otherwise let a stale-but-recent
//! file survive). Everything else goes through fetch + reconcile.

use crate::attributes::FileAttributes;
use crate::checksum;
use crate::config::GrabConfig;
use crate::error::GrabError;
use crate::fetcher;
use crate::reconcile;
use crate::report::TaskReport;
use crate::request::TransferRequest;

/// Validated invocation parameters, as supplied by the CLI harness.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub url: String,
    pub dest: String,
    pub force: bool,
    pub sha256sum: Option<String>,
    pub use_proxy: bool,
    pub attributes: FileAttributes,
}

impl Default for RunParams {
    fn default() -> Self {
        RunParams {
            url: String::new(),
            dest: String::new(),
            force: false,
            sha256sum: None,
            use_proxy: true,
            attributes: FileAttributes::default(),
        }
    }
}

/// Execute one fetch-verify-replace run. Exactly one of `Ok(report)` or
/// `Err(error)` comes back; no partial state is reported.
pub fn run(params: &RunParams, cfg: &GrabConfig) -> Result<TaskReport, GrabError> {
    let mut req = TransferRequest::new(&params.url, &params.dest, params.force, params.use_proxy)?;
    let expected = params
        .sha256sum
        .as_deref()
        .map(checksum::sanitize_checksum)
        .filter(|s| !s.is_empty());

    if req.dest.is_file() && !req.force {
        if let Some(exp) = expected.as_deref() {
            let actual = checksum::sha256_path(&req.dest)?;
            if actual == exp {
                let changed = params.attributes.apply(&req.dest)?;
                return Ok(TaskReport::already_exists(
                    &req.url,
                    &req.dest.to_string_lossy(),
                    changed,
                    Some(exp),
                ));
            }
            tracing::info!(dest = %req.dest.display(), "existing checksum stale, forcing download");
            req.force = true;
        }
    }

    let outcome = fetcher::fetch(&req, cfg)?;
    let rec = reconcile::reconcile(outcome, &req, expected.as_deref())?;

    let mut changed = rec.changed;
    // The 304-after-deletion gap is accepted: skip attributes when the
    // destination is gone rather than inventing a recreate.
    if rec.final_path.exists() {
        changed |= params.attributes.apply(&rec.final_path)?;
    }

    Ok(TaskReport {
        url: req.url.clone(),
        dest: rec.final_path.to_string_lossy().into_owned(),
        changed,
        msg: rec.message,
        src: rec
            .staged_path
            .map(|p| p.to_string_lossy().into_owned()),
        md5sum: rec.fingerprint,
        sha256sum: expected,
    })
}

//! CLI for the urlgrab transfer tool.
//!
//! Parses the invocation parameters, runs the single-shot operation, and
//! prints exactly one JSON document: the success payload on exit 0, the
//! failure payload on exit 1.

use clap::Parser;
use urlgrab_core::attributes::FileAttributes;
use urlgrab_core::config;
use urlgrab_core::error::GrabError;
use urlgrab_core::operation::{self, RunParams};
use urlgrab_core::report::FailureReport;

/// Fetch a remote resource over HTTP/HTTPS/FTP and idempotently place it at
/// a local path, verifying content and avoiding needless writes.
#[derive(Debug, Parser)]
#[command(name = "urlgrab")]
#[command(about = "Fetch a URL to a local path, verify it, replace only on change", long_about = None)]
pub struct Cli {
    /// URL to fetch (may embed user:pass@ credentials).
    pub url: String,

    /// Destination file, or an existing directory to place the file in.
    pub dest: String,

    /// Download even if the destination is already up to date.
    #[arg(long, alias = "thirsty")]
    pub force: bool,

    /// Expected SHA-256 of the destination; on mismatch the file is removed
    /// and the run fails.
    #[arg(long, value_name = "HEX")]
    pub sha256sum: Option<String>,

    /// Ignore proxy environment variables for this request.
    #[arg(long)]
    pub no_use_proxy: bool,

    /// Owner (name or uid) to set on the destination.
    #[arg(long, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Group (name or gid) to set on the destination.
    #[arg(long, value_name = "GROUP")]
    pub group: Option<String>,

    /// Permission bits for the destination, octal (e.g. 0644).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,
}

impl Cli {
    fn into_params(self) -> Result<RunParams, GrabError> {
        let mode = self
            .mode
            .as_deref()
            .map(FileAttributes::parse_mode)
            .transpose()?;
        Ok(RunParams {
            url: self.url,
            dest: self.dest,
            force: self.force,
            sha256sum: self.sha256sum,
            use_proxy: !self.no_use_proxy,
            attributes: FileAttributes {
                owner: self.owner,
                group: self.group,
                mode,
            },
        })
    }
}

/// Parse arguments, run the operation, emit the result. Returns the exit code.
pub fn run_from_args() -> i32 {
    let cli = Cli::parse();
    let cfg = match config::load_or_init() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("config unavailable, using defaults: {:#}", e);
            Default::default()
        }
    };
    tracing::debug!("loaded config: {:?}", cfg);

    let result = cli.into_params().and_then(|params| operation::run(&params, &cfg));
    match result {
        Ok(report) => {
            emit(&report);
            0
        }
        Err(err) => {
            tracing::error!("run failed: {}", err);
            emit(&FailureReport::from_error(&err));
            1
        }
    }
}

fn emit<T: serde::Serialize>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("urlgrab error: failed to serialize result: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["urlgrab", "http://h/f", "/tmp/f"]).unwrap();
        assert_eq!(cli.url, "http://h/f");
        assert_eq!(cli.dest, "/tmp/f");
        assert!(!cli.force);
        assert!(!cli.no_use_proxy);
        let params = cli.into_params().unwrap();
        assert!(params.use_proxy);
        assert!(params.attributes.is_empty());
    }

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "urlgrab",
            "http://h/f",
            "/tmp/f",
            "--force",
            "--sha256sum",
            "deadbeef",
            "--no-use-proxy",
            "--owner",
            "root",
            "--group",
            "wheel",
            "--mode",
            "0644",
        ])
        .unwrap();
        let params = cli.into_params().unwrap();
        assert!(params.force);
        assert!(!params.use_proxy);
        assert_eq!(params.sha256sum.as_deref(), Some("deadbeef"));
        assert_eq!(params.attributes.owner.as_deref(), Some("root"));
        assert_eq!(params.attributes.group.as_deref(), Some("wheel"));
        assert_eq!(params.attributes.mode, Some(0o644));
    }

    #[test]
    fn legacy_force_alias_is_recognized() {
        let cli = Cli::try_parse_from(["urlgrab", "http://h/f", "/tmp/f", "--thirsty"]).unwrap();
        assert!(cli.force);
    }

    #[test]
    fn bad_mode_is_rejected_at_param_build() {
        let cli =
            Cli::try_parse_from(["urlgrab", "http://h/f", "/tmp/f", "--mode", "banana"]).unwrap();
        assert!(cli.into_params().is_err());
    }

    #[test]
    fn missing_dest_is_a_parse_error() {
        assert!(Cli::try_parse_from(["urlgrab", "http://h/f"]).is_err());
    }
}

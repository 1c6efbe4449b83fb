//! File-attribute application for the final destination.
//!
//! Applies owner, group, and permission bits once the correct bytes are in
//! place, and reports whether anything actually changed so the caller can
//! OR the result into the run's `changed` flag. Owner and group accept a
//! name or a numeric id.

use std::fs;
use std::path::Path;

use crate::error::GrabError;

#[derive(Debug, Clone, Default)]
pub struct FileAttributes {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<u32>,
}

impl FileAttributes {
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.group.is_none() && self.mode.is_none()
    }

    /// Parse an octal mode string such as `0644` or `644`.
    pub fn parse_mode(raw: &str) -> Result<u32, GrabError> {
        u32::from_str_radix(raw, 8)
            .map_err(|_| GrabError::Configuration(format!("invalid mode: {}", raw)))
            .and_then(|m| {
                if m > 0o7777 {
                    Err(GrabError::Configuration(format!("invalid mode: {}", raw)))
                } else {
                    Ok(m)
                }
            })
    }

    /// Apply the attributes to `path`. Returns true if any attribute was
    /// actually modified.
    #[cfg(unix)]
    pub fn apply(&self, path: &Path) -> Result<bool, GrabError> {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        if self.is_empty() {
            return Ok(false);
        }
        let meta = fs::metadata(path)
            .map_err(|e| GrabError::local_io(format!("stat {}", path.display()), e))?;
        let mut changed = false;

        if let Some(mode) = self.mode {
            if meta.mode() & 0o7777 != mode {
                fs::set_permissions(path, fs::Permissions::from_mode(mode))
                    .map_err(|e| GrabError::local_io(format!("chmod {}", path.display()), e))?;
                changed = true;
            }
        }

        let uid = self.owner.as_deref().map(resolve_uid).transpose()?;
        let gid = self.group.as_deref().map(resolve_gid).transpose()?;
        let want_uid = uid.filter(|u| *u != meta.uid());
        let want_gid = gid.filter(|g| *g != meta.gid());
        if want_uid.is_some() || want_gid.is_some() {
            chown(path, want_uid, want_gid)?;
            changed = true;
        }

        if changed {
            tracing::debug!(path = %path.display(), "attributes updated");
        }
        Ok(changed)
    }

    #[cfg(not(unix))]
    pub fn apply(&self, _path: &Path) -> Result<bool, GrabError> {
        Ok(false)
    }
}

#[cfg(unix)]
fn chown(path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), GrabError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| GrabError::Configuration(format!("path contains NUL: {}", path.display())))?;
    // -1 leaves the corresponding id untouched.
    let uid = uid.map(|u| u as libc::uid_t).unwrap_or(libc::uid_t::MAX);
    let gid = gid.map(|g| g as libc::gid_t).unwrap_or(libc::gid_t::MAX);
    let rc = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
    if rc != 0 {
        let e = std::io::Error::last_os_error();
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            return Err(GrabError::Permission {
                path: path.to_path_buf(),
                needed: "chownable by this user",
            });
        }
        return Err(GrabError::local_io(format!("chown {}", path.display()), e));
    }
    Ok(())
}

#[cfg(unix)]
fn resolve_uid(owner: &str) -> Result<u32, GrabError> {
    use std::ffi::CString;

    if let Ok(n) = owner.parse::<u32>() {
        return Ok(n);
    }
    let c_name = CString::new(owner)
        .map_err(|_| GrabError::Configuration(format!("invalid owner: {}", owner)))?;
    // Single-threaded invocation; the static result buffer is not shared.
    let pw = unsafe { libc::getpwnam(c_name.as_ptr()) };
    if pw.is_null() {
        return Err(GrabError::Configuration(format!("unknown user: {}", owner)));
    }
    Ok(unsafe { (*pw).pw_uid })
}

#[cfg(unix)]
fn resolve_gid(group: &str) -> Result<u32, GrabError> {
    use std::ffi::CString;

    if let Ok(n) = group.parse::<u32>() {
        return Ok(n);
    }
    let c_name = CString::new(group)
        .map_err(|_| GrabError::Configuration(format!("invalid group: {}", group)))?;
    let gr = unsafe { libc::getgrnam(c_name.as_ptr()) };
    if gr.is_null() {
        return Err(GrabError::Configuration(format!("unknown group: {}", group)));
    }
    Ok(unsafe { (*gr).gr_gid })
}

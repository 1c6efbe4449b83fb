//! File digests and checksum normalization.
//!
//! SHA-256 backs the caller-supplied integrity gate; MD5 is the internal
//! content fingerprint used to decide whether the destination needs to be
//! replaced. Both read in chunks to keep memory use bounded.

use digest::Digest;
use md5::Md5;
use sha2::Sha256;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::GrabError;

const BUF_SIZE: usize = 64 * 1024;

fn file_digest<D: Digest>(path: &Path) -> Result<String, GrabError> {
    let mut f = File::open(path)
        .map_err(|e| GrabError::local_io(format!("open {}", path.display()), e))?;
    let mut hasher = D::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .map_err(|e| GrabError::local_io(format!("read {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
pub fn sha256_path(path: &Path) -> Result<String, GrabError> {
    file_digest::<Sha256>(path)
}

/// Compute MD5 of a file and return the digest as lowercase hex.
/// Used only for content-identity comparison, not for integrity.
pub fn md5_path(path: &Path) -> Result<String, GrabError> {
    file_digest::<Md5>(path)
}

/// Normalize a caller-supplied checksum: keep ASCII alphanumerics only,
/// lowercased. Strips whitespace and invisible characters (zero-width
/// spaces and the like) that survive a copy-paste.
pub fn sanitize_checksum(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_path_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn md5_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = md5_path(f.path()).unwrap();
        assert_eq!(digest, "b1946ac92492d2347c6235b4d2611184");
    }

    #[test]
    fn digest_missing_file_is_local_io() {
        let err = sha256_path(Path::new("/nonexistent/surely-missing")).unwrap_err();
        assert!(matches!(err, GrabError::LocalIo { .. }));
    }

    #[test]
    fn sanitize_strips_whitespace_and_invisible_chars() {
        let messy = " 5891b5b522d5df086d0ff0b110fbd9d2\u{200b}1bb4fc7163af34d08286a2e846f6be03\n";
        assert_eq!(
            sanitize_checksum(messy),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn sanitize_lowercases() {
        assert_eq!(sanitize_checksum("DEADBEEF"), "deadbeef");
    }

    #[test]
    fn sanitize_empty_stays_empty() {
        assert_eq!(sanitize_checksum(" \t\u{feff}"), "");
    }
}

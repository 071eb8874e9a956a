//! MD5 verification of downloaded artifacts.

use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use crate::error::{Result, ServiceError};

/// Lowercase hex MD5 digest of a file, read in fixed-size blocks.
pub fn md5_hex(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare the file's digest to `expected`. The comparison is
/// case-sensitive.
pub fn verify(path: &Path, expected: &str) -> Result<()> {
    let actual = md5_hex(path)?;
    if actual != expected {
        return Err(ServiceError::ChecksumMismatch {
            expected: expected.to_owned(),
            actual,
        });
    }
    Ok(())
}

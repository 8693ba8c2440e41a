//! The `latest-stage3-*.txt` pointer document.
//!
//! ```text
//! # Latest as of Sun, 13 Oct 2024 17:03:23 +0000
//! # ts=1728838403
//! 20241013T170323Z/stage3-amd64-openrc-20241013T170323Z.tar.xz 264758976
//! ```
//!
//! Published copies are usually PGP clear-signed, so armor lines are skipped
//! along with comments and blank lines.

use crate::error::{InstallError, Result};

/// Return the image path (relative to the autobuilds directory) named by the
/// first data line.
pub fn parse_latest(document: &str) -> Result<String> {
    document
        .lines()
        .map(str::trim)
        .filter(|line| !is_noise(line))
        .find_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| {
            InstallError::NetworkResolution("pointer document has no image entry".to_string())
        })
}

fn is_noise(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("-----")
        || line.starts_with("Hash:")
}

//! Gentoo `.DIGESTS` manifests.
//!
//! ```text
//! # BLAKE2B HASH
//! 3e0a...  stage3-amd64-openrc-20241013T170323Z.tar.xz
//! # SHA512 HASH
//! 9f86...  stage3-amd64-openrc-20241013T170323Z.tar.xz
//! ```

use std::path::Path;

use tracing::info;

use crate::error::{InstallError, Result};
use crate::host::Host;

/// One checksum line, tagged with the section it appeared under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub algorithm: String,
    pub hash: String,
    pub file: String,
}

/// Parse every `<hex>  <file>` line that sits under a `# <ALG> HASH` header.
/// Anything else (signature armor, stray text) is ignored.
pub fn parse_digests(manifest: &str) -> Vec<DigestEntry> {
    let mut algorithm: Option<String> = None;
    let mut entries = Vec::new();

    for line in manifest.lines().map(str::trim) {
        if let Some(comment) = line.strip_prefix('#') {
            let words: Vec<&str> = comment.split_whitespace().collect();
            if let [alg, "HASH"] = words.as_slice() {
                algorithm = Some(alg.to_ascii_uppercase());
            }
            continue;
        }

        let Some(alg) = &algorithm else { continue };
        let mut fields = line.split_whitespace();
        let (Some(hash), Some(file), None) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        entries.push(DigestEntry {
            algorithm: alg.clone(),
            hash: hash.to_ascii_lowercase(),
            file: file.to_string(),
        });
    }

    entries
}

/// The SHA512 hash recorded for `file_name`, if any.
pub fn sha512_for<'a>(entries: &'a [DigestEntry], file_name: &str) -> Option<&'a str> {
    entries
        .iter()
        .find(|e| e.algorithm == "SHA512" && e.file == file_name)
        .map(|e| e.hash.as_str())
}

/// Check `image` against its SHA512 entry in `manifest`.
pub fn verify_image(host: &dyn Host, image: &Path, manifest: &Path) -> Result<()> {
    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let entries = parse_digests(&host.read_to_string(manifest)?);
    let expected = sha512_for(&entries, &file_name).ok_or_else(|| {
        InstallError::IntegrityVerification {
            file: file_name.clone(),
            expected: format!("a SHA512 entry in {}", manifest.display()),
            actual: "none".to_string(),
        }
    })?;

    println!("Verifying SHA512 of {}...", file_name);
    let actual = host.sha512_file(image)?;
    if actual != expected {
        return Err(InstallError::IntegrityVerification {
            file: file_name,
            expected: expected.to_string(),
            actual,
        });
    }

    info!(file = %file_name, "digest verified");
    println!("Checksum verified OK");
    Ok(())
}

//! Stage3 base image: resolve, download, verify, extract.
//!
//! "Latest" moves over time, so the image reference is resolved fresh on
//! every run and nothing is cached between runs.

pub mod digests;
pub mod pointer;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::{InstallError, Result};
use crate::host::Host;
use crate::process::Cmd;

/// Everything known about the image once the pointer is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImageRef {
    pub pointer_url: String,
    /// Path relative to the autobuilds directory, as the pointer states it.
    pub resolved_name: String,
    pub tarball_url: String,
    pub digests_url: String,
    pub local_tarball: PathBuf,
    pub local_digests: PathBuf,
}

impl BaseImageRef {
    pub fn new(config: &Config, resolved_name: &str) -> Result<Self> {
        let file_name = Path::new(resolved_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| n != "..")
            .ok_or_else(|| {
                InstallError::NetworkResolution(format!(
                    "pointer entry '{}' does not name a file",
                    resolved_name
                ))
            })?;

        let tarball_url = format!("{}/{}", config.autobuilds_url(), resolved_name);
        Ok(Self {
            pointer_url: config.pointer_url(),
            resolved_name: resolved_name.to_string(),
            digests_url: format!("{}{}", tarball_url, config.digests_suffix),
            tarball_url,
            local_tarball: config.target.join(&file_name),
            local_digests: config
                .target
                .join(format!("{}{}", file_name, config.digests_suffix)),
        })
    }
}

fn download_command(url: &str, dest: &Path) -> Cmd {
    Cmd::new("curl")
        .args(["--fail", "--location", "--progress-bar", "--output"])
        .arg_path(dest)
        .arg(url)
}

/// Archive extraction into the target root.
///
/// `p` keeps permission bits, `--numeric-owner` keeps the image's UIDs/GIDs
/// instead of mapping them through the host's passwd.
pub fn extract_command(tarball: &Path, target: &Path) -> Cmd {
    Cmd::new("tar")
        .arg("xpvf")
        .arg_path(tarball)
        .args(["--xattrs-include=*.*", "--numeric-owner", "-C"])
        .arg_path(target)
}

/// Fetch the pointer document and build the image reference.
pub fn resolve(host: &dyn Host, config: &Config) -> Result<BaseImageRef> {
    let url = config.pointer_url();
    println!("Resolving latest stage3 from {}...", url);

    let cmd = Cmd::new("curl").args([
        "--fail",
        "--silent",
        "--show-error",
        "--location",
        url.as_str(),
    ]);
    let document = host.capture(&cmd).map_err(|e| match e {
        InstallError::ExternalTool { detail, .. } => {
            InstallError::NetworkResolution(format!("{}: {}", url, detail))
        }
        other => other,
    })?;

    let name = pointer::parse_latest(&document).map_err(|e| match e {
        InstallError::NetworkResolution(msg) => {
            InstallError::NetworkResolution(format!("{} ({})", msg, url))
        }
        other => other,
    })?;
    info!(image = %name, "resolved stage3");
    BaseImageRef::new(config, &name)
}

pub fn download_image(host: &dyn Host, image: &BaseImageRef) -> Result<()> {
    println!("Downloading {}...", image.tarball_url);
    host.run(&download_command(&image.tarball_url, &image.local_tarball))
}

pub fn download_digests(host: &dyn Host, image: &BaseImageRef) -> Result<()> {
    println!("Downloading {}...", image.digests_url);
    host.run(&download_command(&image.digests_url, &image.local_digests))
}

pub fn verify(host: &dyn Host, image: &BaseImageRef) -> Result<()> {
    digests::verify_image(host, &image.local_tarball, &image.local_digests)
}

pub fn extract(host: &dyn Host, image: &BaseImageRef, target: &Path) -> Result<()> {
    println!("Extracting {} into {}...", image.resolved_name, target.display());
    host.run(&extract_command(&image.local_tarball, target))
}

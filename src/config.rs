//! Run configuration.
//!
//! Built from command-line flags only; nothing is read from the environment
//! or from files, so every run starts from the same defaults.

use std::path::PathBuf;

/// Default Gentoo distfiles mirror.
pub const DEFAULT_MIRROR: &str = "https://distfiles.gentoo.org";

/// Installer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Mirror base URL, without trailing slash.
    pub mirror: String,
    /// Gentoo architecture directory (e.g. `amd64`, `arm64`).
    pub arch: String,
    /// Stage3 flavor; selects the `latest-<flavor>.txt` pointer.
    pub stage3: String,
    /// Appended to the image URL to get its digest manifest.
    pub digests_suffix: String,
    /// Where the new root is mounted.
    pub target: PathBuf,
    /// Host DNS resolver configuration copied into the target.
    pub host_resolv_conf: PathBuf,
    /// Host Portage configuration copied into the target.
    pub host_make_conf: PathBuf,
    /// Sysfs block class directory used to tell disks from partitions.
    pub sys_class_block: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirror: DEFAULT_MIRROR.to_string(),
            arch: "amd64".to_string(),
            stage3: "stage3-amd64-openrc".to_string(),
            digests_suffix: ".DIGESTS".to_string(),
            target: PathBuf::from("/mnt/gentoo"),
            host_resolv_conf: PathBuf::from("/etc/resolv.conf"),
            host_make_conf: PathBuf::from("/etc/portage/make.conf"),
            sys_class_block: PathBuf::from("/sys/class/block"),
        }
    }
}

impl Config {
    /// Directory holding the stage3 autobuilds for this architecture.
    pub fn autobuilds_url(&self) -> String {
        format!(
            "{}/releases/{}/autobuilds",
            self.mirror.trim_end_matches('/'),
            self.arch
        )
    }

    /// The "latest image" pointer document.
    pub fn pointer_url(&self) -> String {
        format!("{}/latest-{}.txt", self.autobuilds_url(), self.stage3)
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Mirror:          {}", self.mirror);
        println!("  Architecture:    {}", self.arch);
        println!("  Stage3 flavor:   {}", self.stage3);
        println!("  Pointer:         {}", self.pointer_url());
        println!("  Digests suffix:  {}", self.digests_suffix);
        println!("  Target root:     {}", self.target.display());
        println!("  Host resolv.conf: {}", self.host_resolv_conf.display());
        println!("  Host make.conf:  {}", self.host_make_conf.display());
    }
}

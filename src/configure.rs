//! Target environment configuration, run after the stage3 is in place.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::host::Host;

/// Copy the host's DNS resolver configuration so name resolution works in the
/// chroot before networking is set up there.
pub fn copy_resolv_conf(host: &dyn Host, host_resolv_conf: &Path, target: &Path) -> Result<()> {
    host.copy_file(host_resolv_conf, &target.join("etc/resolv.conf"))
}

/// The target starts out with the host's mirrors and build flags.
pub fn copy_make_conf(host: &dyn Host, host_make_conf: &Path, target: &Path) -> Result<()> {
    host.copy_file(host_make_conf, &target.join("etc/portage/make.conf"))
}

/// Zoneinfo file for `timezone`, as seen from inside the target.
pub fn zoneinfo_path(timezone: &str) -> PathBuf {
    Path::new("/usr/share/zoneinfo").join(timezone)
}

/// Point `/etc/localtime` at the chosen zone.
pub fn set_timezone(host: &dyn Host, target: &Path, timezone: &str) -> Result<()> {
    host.symlink(&zoneinfo_path(timezone), &target.join("etc/localtime"))
}

pub fn write_hostname(host: &dyn Host, target: &Path, hostname: &str) -> Result<()> {
    host.write_file(&target.join("etc/hostname"), &format!("{}\n", hostname))
}

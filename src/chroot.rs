//! Hand-off into the new root.

use std::path::Path;

use crate::error::Result;
use crate::host::Host;
use crate::process::Cmd;

/// Run inside the target by its own bash: refresh the environment, sync the
/// Portage tree and bring @world up to date.
pub const UPDATE_SCRIPT: &str =
    "env-update && source /etc/profile && emerge-webrsync && emerge --update --deep --newuse @world";

pub fn chroot_command(target: &Path) -> Cmd {
    Cmd::new("chroot")
        .arg_path(target)
        .args(["/bin/bash", "-c", UPDATE_SCRIPT])
}

/// Only the aggregate exit status of the chrooted shell is visible here; a
/// failed package build surfaces as a non-zero exit.
pub fn run_update(host: &dyn Host, target: &Path) -> Result<()> {
    println!("Entering {} to update the system...", target.display());
    host.run(&chroot_command(target))
}

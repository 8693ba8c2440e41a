//! Mounting the target root, the boot partition and the chroot pseudo
//! filesystems.
//!
//! Every successful mount is recorded in a [`MountTable`] so an aborted run
//! can unmount in reverse order instead of leaving stale mounts behind.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::host::Host;
use crate::process::Cmd;

/// What gets mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// A block device with an on-disk filesystem.
    Device(String),
    /// A host directory bound into the target.
    Bind(PathBuf),
    /// A kernel filesystem of the given type (`proc`, `sysfs`).
    Kernel(&'static str),
}

/// One mount into the target tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub target: PathBuf,
    pub source: MountSource,
}

impl MountPoint {
    pub fn device(device: &str, target: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
            source: MountSource::Device(device.to_string()),
        }
    }

    pub fn proc(root: &Path) -> Self {
        Self {
            target: root.join("proc"),
            source: MountSource::Kernel("proc"),
        }
    }

    pub fn dev(root: &Path) -> Self {
        Self {
            target: root.join("dev"),
            source: MountSource::Bind(PathBuf::from("/dev")),
        }
    }

    pub fn sys(root: &Path) -> Self {
        Self {
            target: root.join("sys"),
            source: MountSource::Kernel("sysfs"),
        }
    }

    /// The three mounts a chroot needs, in the order they are applied.
    pub fn pseudo(root: &Path) -> [Self; 3] {
        [Self::proc(root), Self::dev(root), Self::sys(root)]
    }

    pub fn command(&self) -> Cmd {
        let cmd = Cmd::new("mount");
        let cmd = match &self.source {
            MountSource::Device(device) => cmd.arg(device),
            MountSource::Bind(source) => cmd.arg("--bind").arg_path(source),
            MountSource::Kernel(fstype) => cmd.args(["-t", *fstype, *fstype]),
        };
        cmd.arg_path(&self.target)
    }
}

/// Mounts made during this run, oldest first.
#[derive(Debug, Default)]
pub struct MountTable {
    mounted: Vec<PathBuf>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the mount point exists, mount, and record it.
    pub fn mount(&mut self, host: &dyn Host, point: &MountPoint) -> Result<()> {
        host.create_dir_all(&point.target)?;
        host.run(&point.command())?;
        info!(path = %point.target.display(), "mounted");
        self.mounted.push(point.target.clone());
        Ok(())
    }

    pub fn mounted(&self) -> &[PathBuf] {
        &self.mounted
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// Unmount everything in reverse order. Failures are logged and the rest
    /// are still attempted.
    pub fn release(&mut self, host: &dyn Host) {
        while let Some(target) = self.mounted.pop() {
            let cmd = Cmd::new("umount").arg_path(&target);
            match host.run(&cmd) {
                Ok(()) => info!(path = %target.display(), "unmounted"),
                Err(e) => warn!(path = %target.display(), error = %e, "unmount failed"),
            }
        }
    }

    /// Stop tracking the current mounts; they stay in place.
    pub fn keep(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.mounted)
    }
}

/// Mount the root partition at the target path.
pub fn mount_root(
    host: &dyn Host,
    table: &mut MountTable,
    device: &str,
    target: &Path,
) -> Result<()> {
    table.mount(host, &MountPoint::device(device, target))
}

/// Mount proc, /dev and sysfs under the target so the chroot works.
pub fn mount_pseudo(host: &dyn Host, table: &mut MountTable, target: &Path) -> Result<()> {
    for point in MountPoint::pseudo(target) {
        table.mount(host, &point)?;
    }
    Ok(())
}

//! Host tool availability checks.

use crate::plan::FilesystemKind;
use crate::process;

use super::types::CheckResult;

/// Tools every run needs, with the package that ships them.
const REQUIRED_TOOLS: &[(&str, &str, &str)] = &[
    ("parted", "sys-block/parted", "Required to write the partition table"),
    ("mkfs.vfat", "sys-fs/dosfstools", "Required for the boot partition"),
    ("mkswap", "sys-apps/util-linux", "Required for the swap partition"),
    ("mount", "sys-apps/util-linux", "Required to mount the target"),
    ("umount", "sys-apps/util-linux", "Required to clean up after a failed run"),
    ("findmnt", "sys-apps/util-linux", "Required to generate fstab"),
    ("blkid", "sys-apps/util-linux", "Required to look up the swap UUID"),
    ("curl", "net-misc/curl", "Required to download the stage3"),
    ("tar", "app-arch/tar", "Required to extract the stage3"),
    ("xz", "app-arch/xz-utils", "Required to decompress the stage3"),
    ("chroot", "sys-apps/coreutils", "Required for the final system update"),
];

/// Check host tools are installed.
pub fn check_host_tools() -> Vec<CheckResult> {
    REQUIRED_TOOLS
        .iter()
        .map(|(tool, package, purpose)| check_tool_exists(tool, package, purpose, true))
        .chain(FilesystemKind::ALL.iter().map(|kind| {
            check_tool_exists(
                &kind.mkfs_program(),
                mkfs_package(*kind),
                "Needed only for that root filesystem",
                false,
            )
        }))
        .collect()
}

fn mkfs_package(kind: FilesystemKind) -> &'static str {
    match kind {
        FilesystemKind::Ext4 => "sys-fs/e2fsprogs",
        FilesystemKind::Btrfs => "sys-fs/btrfs-progs",
        FilesystemKind::Xfs => "sys-fs/xfsprogs",
    }
}

/// Hard check for the chosen root filesystem, run once the operator picked it.
pub fn check_filesystem_tool(kind: FilesystemKind) -> CheckResult {
    check_tool_exists(
        &kind.mkfs_program(),
        mkfs_package(kind),
        "Required for the chosen root filesystem",
        true,
    )
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => {
            let msg = format!("Not found. Install '{}'. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}

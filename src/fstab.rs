//! `/etc/fstab` generation from what is actually mounted under the target.

use std::path::Path;

use crate::error::{InstallError, Result};
use crate::host::Host;
use crate::process::Cmd;

const PSEUDO_FSTYPES: &[&str] = &["proc", "sysfs", "devtmpfs", "devpts", "tmpfs", "cgroup2"];

/// One filesystem reported by findmnt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedFs {
    pub uuid: String,
    pub mountpoint: String,
    pub fstype: String,
}

/// One fstab line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabEntry {
    pub spec: String,
    pub file: String,
    pub vfstype: String,
    pub options: String,
    pub dump: u8,
    pub pass: u8,
}

impl FstabEntry {
    fn line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.spec, self.file, self.vfstype, self.options, self.dump, self.pass
        )
    }
}

/// Real filesystems at or below `target`, one row each.
pub fn findmnt_command(target: &Path) -> Cmd {
    Cmd::new("findmnt")
        .args([
            "--real",
            "--list",
            "--noheadings",
            "--submounts",
            "--output",
            "UUID,TARGET,FSTYPE",
        ])
        .arg_path(target)
}

pub fn swap_uuid_command(device: &str) -> Cmd {
    Cmd::new("blkid").args(["-s", "UUID", "-o", "value", device])
}

/// Parse findmnt list output. Rows without a UUID and kernel filesystems are
/// dropped.
pub fn parse_findmnt(output: &str) -> Vec<MountedFs> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [uuid, mountpoint, fstype] = fields.as_slice() else {
                return None;
            };
            if PSEUDO_FSTYPES.contains(fstype) {
                return None;
            }
            Some(MountedFs {
                uuid: uuid.to_string(),
                mountpoint: mountpoint.to_string(),
                fstype: fstype.to_string(),
            })
        })
        .collect()
}

/// `mountpoint` as seen from inside the target (`/mnt/gentoo/boot` -> `/boot`).
pub fn relative_mountpoint(target: &Path, mountpoint: &str) -> Option<String> {
    let rest = Path::new(mountpoint).strip_prefix(target).ok()?;
    Some(format!("/{}", rest.to_string_lossy()))
}

/// Build entries for the mounted filesystems plus swap, sorted so parents come
/// before children.
pub fn entries(target: &Path, mounted: &[MountedFs], swap_uuid: Option<&str>) -> Vec<FstabEntry> {
    let mut entries: Vec<FstabEntry> = mounted
        .iter()
        .filter_map(|fs| {
            let file = relative_mountpoint(target, &fs.mountpoint)?;
            let pass = if file == "/" { 1 } else { 2 };
            Some(FstabEntry {
                spec: format!("UUID={}", fs.uuid),
                file,
                vfstype: fs.fstype.clone(),
                options: "defaults".to_string(),
                dump: 0,
                pass,
            })
        })
        .collect();
    entries.sort_by(|a, b| a.file.cmp(&b.file));

    if let Some(uuid) = swap_uuid {
        entries.push(FstabEntry {
            spec: format!("UUID={}", uuid),
            file: "none".to_string(),
            vfstype: "swap".to_string(),
            options: "defaults".to_string(),
            dump: 0,
            pass: 0,
        });
    }
    entries
}

pub fn render(entries: &[FstabEntry]) -> String {
    let mut out = String::from("# <fs>\t<mountpoint>\t<type>\t<opts>\t<dump>\t<pass>\n");
    for entry in entries {
        out.push_str(&entry.line());
        out.push('\n');
    }
    out
}

/// Enumerate the target's mounts and write `<target>/etc/fstab`.
pub fn generate(host: &dyn Host, target: &Path, swap_device: &str) -> Result<()> {
    let mounted = parse_findmnt(&host.capture(&findmnt_command(target))?);
    if !mounted
        .iter()
        .any(|fs| relative_mountpoint(target, &fs.mountpoint).as_deref() == Some("/"))
    {
        return Err(InstallError::tool(
            "findmnt",
            format!("no filesystem with a UUID mounted at {}", target.display()),
        ));
    }

    let swap_uuid = host.capture(&swap_uuid_command(swap_device))?;
    let swap_uuid = swap_uuid.trim();
    let swap_uuid = (!swap_uuid.is_empty()).then_some(swap_uuid);

    let fstab = render(&entries(target, &mounted, swap_uuid));
    host.write_file(&target.join("etc/fstab"), &fstab)
}

//! GPT layout, partition table creation and formatting.
//!
//! The layout is always boot (fat32), root (operator's choice), swap, in that
//! order on disk. Offsets are kept symbolic as a sum of the sizes before them
//! and only resolved when rendered for parted.

use std::fmt;

use tracing::info;

use crate::error::{InstallError, Result};
use crate::host::Host;
use crate::plan::{FilesystemKind, InstallPlan, SizeSpec};
use crate::process::Cmd;

/// A position on disk: the sum of the sizes that precede it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Offset(Vec<SizeSpec>);

impl Offset {
    /// Start of the disk.
    pub fn start() -> Self {
        Self(Vec::new())
    }

    /// This offset advanced by `size`.
    pub fn after(&self, size: &SizeSpec) -> Self {
        let mut terms = self.0.clone();
        terms.push(size.clone());
        Self(terms)
    }

    pub fn terms(&self) -> &[SizeSpec] {
        &self.0
    }

    pub fn is_start(&self) -> bool {
        self.0.is_empty()
    }

    /// Render for parted.
    ///
    /// The disk start becomes `0%` so parted picks an aligned first sector.
    /// A single size is passed through untouched. Sums are resolved to bytes
    /// and written in the coarsest unit that represents them exactly.
    pub fn to_parted(&self) -> Result<String> {
        match self.0.as_slice() {
            [] => Ok("0%".to_string()),
            [single] => Ok(single.as_str().to_string()),
            terms => {
                let mut total: u64 = 0;
                for term in terms {
                    let bytes = term.bytes().ok_or_else(|| {
                        InstallError::InputValidation(format!(
                            "size '{}' must be a number with a K/M/G/T unit \
                             to compute partition offsets",
                            term
                        ))
                    })?;
                    total = total.checked_add(bytes).ok_or_else(|| {
                        InstallError::InputValidation(format!(
                            "partition offsets overflow at '{}'",
                            self
                        ))
                    })?;
                }
                Ok(render_bytes(total))
            }
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("0");
        }
        let terms: Vec<&str> = self.0.iter().map(SizeSpec::as_str).collect();
        f.write_str(&terms.join("+"))
    }
}

fn render_bytes(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1 << 20, "MiB"),
        (1_000_000, "MB"),
        (1 << 10, "KiB"),
        (1_000, "kB"),
    ];
    for (size, unit) in UNITS {
        if bytes % size == 0 {
            return format!("{}{}", bytes / size, unit);
        }
    }
    format!("{}B", bytes)
}

/// One partition of the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    /// 1-based partition number.
    pub number: u32,
    /// GPT partition name.
    pub name: &'static str,
    /// Filesystem type as parted spells it.
    pub fs_type: String,
    pub start: Offset,
    pub end: Offset,
}

/// Boot, root and swap, in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    pub boot: PartitionSpec,
    pub root: PartitionSpec,
    pub swap: PartitionSpec,
}

impl PartitionLayout {
    pub fn new(
        boot: &SizeSpec,
        root: &SizeSpec,
        swap: &SizeSpec,
        filesystem: FilesystemKind,
    ) -> Self {
        let boot_end = Offset::start().after(boot);
        let root_end = boot_end.after(root);
        let swap_end = root_end.after(swap);

        Self {
            boot: PartitionSpec {
                number: 1,
                name: "boot",
                fs_type: "fat32".to_string(),
                start: Offset::start(),
                end: boot_end.clone(),
            },
            root: PartitionSpec {
                number: 2,
                name: "root",
                fs_type: filesystem.as_str().to_string(),
                start: boot_end,
                end: root_end.clone(),
            },
            swap: PartitionSpec {
                number: 3,
                name: "swap",
                fs_type: "linux-swap".to_string(),
                start: root_end,
                end: swap_end,
            },
        }
    }

    pub fn from_plan(plan: &InstallPlan) -> Self {
        Self::new(plan.boot_size(), plan.root_size(), plan.swap_size(), plan.filesystem())
    }

    pub fn partitions(&self) -> [&PartitionSpec; 3] {
        [&self.boot, &self.root, &self.swap]
    }

    /// The single parted invocation that writes the whole table.
    pub fn parted_command(&self, disk: &str) -> Result<Cmd> {
        let mut cmd = Cmd::new("parted").args(["--script", disk, "mklabel", "gpt"]);
        for part in self.partitions() {
            cmd = cmd
                .args(["mkpart", part.name, part.fs_type.as_str()])
                .arg(part.start.to_parted()?)
                .arg(part.end.to_parted()?);
        }
        Ok(cmd.args(["set", "1", "boot", "on"]))
    }
}

/// Device node for partition `number` of `disk`.
///
/// Disks whose name ends in a digit (`nvme0n1`, `mmcblk0`, `loop0`) separate
/// the partition number with `p`.
pub fn partition_device(disk: &str, number: u32) -> String {
    if disk.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{}p{}", disk, number)
    } else {
        format!("{}{}", disk, number)
    }
}

/// Block devices of the three partitions once the table exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDevices {
    pub boot: String,
    pub root: String,
    pub swap: String,
}

impl PartitionDevices {
    pub fn for_disk(disk: &str, layout: &PartitionLayout) -> Self {
        Self {
            boot: partition_device(disk, layout.boot.number),
            root: partition_device(disk, layout.root.number),
            swap: partition_device(disk, layout.swap.number),
        }
    }
}

/// mkfs invocations, boot then root then swap.
pub fn format_commands(devices: &PartitionDevices, filesystem: FilesystemKind) -> [Cmd; 3] {
    [
        Cmd::new("mkfs.vfat").args(["-F", "32", devices.boot.as_str()]),
        Cmd::new(filesystem.mkfs_program()).args([filesystem.force_flag(), devices.root.as_str()]),
        Cmd::new("mkswap").arg(&devices.swap),
    ]
}

/// Write the GPT table. Never retried: a half-written table needs the
/// operator's eyes, not another attempt.
pub fn create_layout(host: &dyn Host, plan: &InstallPlan) -> Result<PartitionDevices> {
    let layout = PartitionLayout::from_plan(plan);
    let cmd = layout.parted_command(plan.disk())?;
    info!(disk = plan.disk(), "writing partition table");
    host.run(&cmd)?;
    Ok(PartitionDevices::for_disk(plan.disk(), &layout))
}

/// Create the boot, root and swap filesystems.
pub fn format_partitions(
    host: &dyn Host,
    devices: &PartitionDevices,
    filesystem: FilesystemKind,
) -> Result<()> {
    for cmd in format_commands(devices, filesystem) {
        host.run(&cmd)?;
    }
    Ok(())
}

//! Operator choices, validated before anything destructive runs.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::error::{InstallError, Result};

/// Filesystem for the root partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemKind {
    Ext4,
    Btrfs,
    Xfs,
}

impl FilesystemKind {
    pub const ALL: [FilesystemKind; 3] = [Self::Ext4, Self::Btrfs, Self::Xfs];

    /// Map a numbered menu answer (`1`-`3`) to a filesystem.
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Self::Ext4),
            "2" => Some(Self::Btrfs),
            "3" => Some(Self::Xfs),
            _ => None,
        }
    }

    /// Name as understood by parted, mkfs and fstab.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ext4 => "ext4",
            Self::Btrfs => "btrfs",
            Self::Xfs => "xfs",
        }
    }

    /// `mkfs.<kind>` program name.
    pub fn mkfs_program(self) -> String {
        format!("mkfs.{}", self.as_str())
    }

    /// Flag that lets mkfs overwrite an existing signature.
    pub fn force_flag(self) -> &'static str {
        match self {
            Self::Ext4 => "-F",
            Self::Btrfs | Self::Xfs => "-f",
        }
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partition size in the partitioning tool's own notation (`512M`, `10GiB`).
///
/// Kept as text. It is only interpreted when offsets have to be summed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSpec(String);

impl SizeSpec {
    pub fn new(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(InstallError::InputValidation(
                "partition size must not be empty".to_string(),
            ));
        }
        if spec.contains(char::is_whitespace) {
            return Err(InstallError::InputValidation(format!(
                "partition size '{}' must be a single token",
                spec
            )));
        }
        Ok(Self(spec.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Size in bytes, using parted's unit rules: decimal for `K`/`M`/`G`/`T`
    /// (with or without `B`), binary for the `iB` forms, `MB` when no unit is
    /// given. A fractional part (`1.5G`) is accepted when it comes to whole
    /// bytes. Returns `None` for anything else (percentages, sectors).
    pub fn bytes(&self) -> Option<u64> {
        let s = self.0.as_str();
        let split = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() || number.ends_with('.') {
            return None;
        }

        let multiplier: u128 = match unit.to_ascii_lowercase().as_str() {
            "" | "m" | "mb" => 1_000_000,
            "b" => 1,
            "k" | "kb" => 1_000,
            "g" | "gb" => 1_000_000_000,
            "t" | "tb" => 1_000_000_000_000,
            "kib" => 1 << 10,
            "mib" => 1 << 20,
            "gib" => 1 << 30,
            "tib" => 1 << 40,
            _ => return None,
        };

        let scale = 10u128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
        let mantissa: u128 = format!("{}{}", whole, fraction).parse().ok()?;
        let scaled = mantissa.checked_mul(multiplier)?;
        if scaled % scale != 0 {
            return None;
        }
        u64::try_from(scaled / scale).ok()
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the operator chose for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    disk: String,
    boot_size: SizeSpec,
    root_size: SizeSpec,
    swap_size: SizeSpec,
    filesystem: FilesystemKind,
    timezone: String,
    hostname: String,
}

impl InstallPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        disk: &str,
        boot_size: &str,
        root_size: &str,
        swap_size: &str,
        filesystem: FilesystemKind,
        timezone: &str,
        hostname: &str,
    ) -> Result<Self> {
        Ok(Self {
            disk: validate_disk_path(disk)?,
            boot_size: SizeSpec::new(boot_size)?,
            root_size: SizeSpec::new(root_size)?,
            swap_size: SizeSpec::new(swap_size)?,
            filesystem,
            timezone: validate_timezone(timezone)?,
            hostname: validate_hostname(hostname)?,
        })
    }

    pub fn disk(&self) -> &str {
        &self.disk
    }

    pub fn boot_size(&self) -> &SizeSpec {
        &self.boot_size
    }

    pub fn root_size(&self) -> &SizeSpec {
        &self.root_size
    }

    pub fn swap_size(&self) -> &SizeSpec {
        &self.swap_size
    }

    pub fn filesystem(&self) -> FilesystemKind {
        self.filesystem
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// Syntactic check: an absolute path under `/dev/`.
pub fn validate_disk_path(disk: &str) -> Result<String> {
    let disk = disk.trim();
    let name = disk.strip_prefix("/dev/").unwrap_or_default();
    if name.is_empty() || name.ends_with('/') {
        return Err(InstallError::InputValidation(format!(
            "'{}' is not a device path (expected e.g. /dev/sda)",
            disk
        )));
    }
    Ok(disk.to_string())
}

/// Require that `disk` names a whole disk, not a partition, and return the
/// device node it resolves to.
///
/// `sys_class_block` is normally `/sys/class/block`; every block device has
/// an entry there, and partitions additionally carry a `partition` attribute.
/// Links such as `/dev/disk/by-id/...` are followed, so partition names are
/// derived from the real node (`/dev/sda`), never from the link.
pub fn check_whole_disk(disk: &str, sys_class_block: &Path) -> Result<String> {
    whole_disk_node(Path::new(disk), Path::new("/dev"), sys_class_block)
}

fn whole_disk_node(disk: &Path, dev_dir: &Path, sys_class_block: &Path) -> Result<String> {
    let dev_dir = std::fs::canonicalize(dev_dir).unwrap_or_else(|_| dev_dir.to_path_buf());
    let node = match std::fs::canonicalize(disk) {
        Ok(resolved) => resolved,
        // Not present on this host; only a direct child of the device
        // directory can be looked up by name.
        Err(_) if disk.parent() == Some(dev_dir.as_path()) => disk.to_path_buf(),
        Err(e) => {
            return Err(InstallError::InputValidation(format!(
                "{} cannot be resolved: {}",
                disk.display(),
                e
            )));
        }
    };
    if node.parent() != Some(dev_dir.as_path()) {
        return Err(InstallError::InputValidation(format!(
            "{} resolves to {}, which is not a device node under {}",
            disk.display(),
            node.display(),
            dev_dir.display()
        )));
    }
    let name = node.file_name().ok_or_else(|| {
        InstallError::InputValidation(format!("'{}' has no device name", disk.display()))
    })?;

    let entry = sys_class_block.join(name);
    if !entry.exists() {
        return Err(InstallError::InputValidation(format!(
            "{} is not a block device",
            disk.display()
        )));
    }
    if entry.join("partition").exists() {
        return Err(InstallError::InputValidation(format!(
            "{} is a partition; choose the whole disk",
            disk.display()
        )));
    }
    Ok(node.to_string_lossy().into_owned())
}

/// Zoneinfo identifier such as `UTC` or `Europe/Berlin`.
pub fn validate_timezone(timezone: &str) -> Result<String> {
    let timezone = timezone.trim();
    let pattern = Regex::new(r"^[A-Za-z0-9_+-]+(/[A-Za-z0-9_+-]+)*$")
        .map_err(|e| InstallError::InputValidation(e.to_string()))?;
    if !pattern.is_match(timezone) {
        return Err(InstallError::InputValidation(format!(
            "'{}' is not a timezone identifier (expected e.g. Europe/Berlin)",
            timezone
        )));
    }
    Ok(timezone.to_string())
}

/// RFC 1123 host name.
pub fn validate_hostname(hostname: &str) -> Result<String> {
    let hostname = hostname.trim();
    let label = r"[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?";
    let pattern = Regex::new(&format!(r"^{label}(\.{label})*$"))
        .map_err(|e| InstallError::InputValidation(e.to_string()))?;
    if hostname.len() > 253 || !pattern.is_match(hostname) {
        return Err(InstallError::InputValidation(format!(
            "'{}' is not a valid hostname",
            hostname
        )));
    }
    Ok(hostname.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_menu_choices() {
        assert_eq!(FilesystemKind::from_menu_choice("1"), Some(FilesystemKind::Ext4));
        assert_eq!(FilesystemKind::from_menu_choice("2"), Some(FilesystemKind::Btrfs));
        assert_eq!(FilesystemKind::from_menu_choice("3 "), Some(FilesystemKind::Xfs));
        for bad in ["", "0", "4", "ext4", "1.", "one"] {
            assert_eq!(FilesystemKind::from_menu_choice(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn test_size_bytes() {
        let bytes = |s: &str| SizeSpec::new(s).unwrap().bytes();
        assert_eq!(bytes("512M"), Some(512_000_000));
        assert_eq!(bytes("512"), Some(512_000_000));
        assert_eq!(bytes("10G"), Some(10_000_000_000));
        assert_eq!(bytes("2GiB"), Some(2 << 30));
        assert_eq!(bytes("4096B"), Some(4096));
        assert_eq!(bytes("1tb"), Some(1_000_000_000_000));
        assert_eq!(bytes("50%"), None);
        assert_eq!(bytes("G"), None);
        assert_eq!(bytes("10X"), None);
    }

    #[test]
    fn test_fractional_size_bytes() {
        let bytes = |s: &str| SizeSpec::new(s).unwrap().bytes();
        assert_eq!(bytes("1.5G"), Some(1_500_000_000));
        assert_eq!(bytes("0.5GiB"), Some(1 << 29));
        assert_eq!(bytes("2.25"), Some(2_250_000));
        assert_eq!(bytes("1.5B"), None);
        assert_eq!(bytes("1."), None);
        assert_eq!(bytes(".5G"), None);
        assert_eq!(bytes("1.2.3G"), None);
    }

    #[test]
    fn test_empty_size_rejected() {
        assert!(matches!(
            SizeSpec::new("  "),
            Err(InstallError::InputValidation(_))
        ));
        assert!(SizeSpec::new("10 G").is_err());
    }

    #[test]
    fn test_disk_path() {
        assert_eq!(validate_disk_path(" /dev/sda\n").unwrap(), "/dev/sda");
        assert!(validate_disk_path("sda").is_err());
        assert!(validate_disk_path("/dev/").is_err());
        assert!(validate_disk_path("/tmp/sda").is_err());
    }

    #[test]
    fn test_whole_disk_check() {
        let sys = TempDir::new().unwrap();
        fs::create_dir_all(sys.path().join("sda")).unwrap();
        fs::create_dir_all(sys.path().join("sda2")).unwrap();
        fs::write(sys.path().join("sda2/partition"), "2\n").unwrap();

        assert_eq!(check_whole_disk("/dev/sda", sys.path()).unwrap(), "/dev/sda");
        let err = check_whole_disk("/dev/sda2", sys.path()).unwrap_err();
        assert!(err.to_string().contains("is a partition"));
        let err = check_whole_disk("/dev/sdz", sys.path()).unwrap_err();
        assert!(err.to_string().contains("not a block device"));
    }

    #[test]
    fn test_whole_disk_follows_links_to_the_node() {
        let root = TempDir::new().unwrap();
        let dev = root.path().join("dev");
        let sys = root.path().join("sys");
        fs::create_dir_all(dev.join("disk/by-id")).unwrap();
        fs::create_dir_all(sys.join("sda")).unwrap();
        fs::write(dev.join("sda"), "").unwrap();
        std::os::unix::fs::symlink("../../sda", dev.join("disk/by-id/ata-X")).unwrap();

        let node = whole_disk_node(&dev.join("disk/by-id/ata-X"), &dev, &sys).unwrap();
        let expected = fs::canonicalize(dev.join("sda")).unwrap();
        assert_eq!(node, expected.to_string_lossy());
    }

    #[test]
    fn test_whole_disk_rejects_links_leaving_dev() {
        let root = TempDir::new().unwrap();
        let dev = root.path().join("dev");
        let sys = root.path().join("sys");
        fs::create_dir_all(&dev).unwrap();
        fs::create_dir_all(root.path().join("proc/self/fd")).unwrap();
        fs::create_dir_all(sys.join("fd")).unwrap();
        std::os::unix::fs::symlink("../proc/self/fd", dev.join("fd")).unwrap();

        let err = whole_disk_node(&dev.join("fd"), &dev, &sys).unwrap_err();
        assert!(err.to_string().contains("not a device node"), "{err}");

        let err = whole_disk_node(&dev.join("disk/by-id/missing"), &dev, &sys).unwrap_err();
        assert!(err.to_string().contains("cannot be resolved"), "{err}");
    }

    #[test]
    fn test_timezone() {
        assert_eq!(validate_timezone("UTC").unwrap(), "UTC");
        assert!(validate_timezone("America/Argentina/Buenos_Aires").is_ok());
        assert!(validate_timezone("Etc/GMT+5").is_ok());
        assert!(validate_timezone("").is_err());
        assert!(validate_timezone("/etc/passwd").is_err());
        assert!(validate_timezone("../../etc/shadow").is_err());
    }

    #[test]
    fn test_hostname() {
        assert!(validate_hostname("gentoo-box").is_ok());
        assert!(validate_hostname("box.example.org").is_ok());
        assert!(validate_hostname("-box").is_err());
        assert!(validate_hostname("box-").is_err());
        assert!(validate_hostname("my box").is_err());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_plan_rejects_bad_values() {
        let ok = InstallPlan::new(
            "/dev/sda", "512M", "10G", "2G", FilesystemKind::Ext4, "UTC", "gentoo-box",
        );
        assert!(ok.is_ok());

        let bad = InstallPlan::new(
            "/dev/sda", "", "10G", "2G", FilesystemKind::Ext4, "UTC", "gentoo-box",
        );
        assert!(matches!(bad, Err(InstallError::InputValidation(_))));
    }
}

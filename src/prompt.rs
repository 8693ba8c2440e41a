//! Interactive collection of the install plan.
//!
//! Free-form answers are validated as they are read; an invalid answer is
//! reported and the same question is asked again. End of input cancels.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::InstallError;
use crate::partition::PartitionLayout;
use crate::plan::{self, FilesystemKind, InstallPlan, SizeSpec};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    /// Print `question` on its own line and read one answer.
    pub fn ask(&mut self, question: &str) -> io::Result<String> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;
        self.read_line()
    }

    /// Ask until `validate` accepts the answer.
    pub fn ask_valid<T>(
        &mut self,
        question: &str,
        validate: impl Fn(&str) -> Result<T, InstallError>,
    ) -> io::Result<T> {
        loop {
            let answer = self.ask(question)?;
            match validate(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
    }

    pub fn welcome(&mut self) -> io::Result<()> {
        writeln!(self.output, "Welcome to the Gentoo installer!")?;
        writeln!(
            self.output,
            "This program will guide you through the process of installing Gentoo."
        )?;
        writeln!(self.output, "Press Enter to continue, or Ctrl+C to exit.")?;
        self.output.flush()?;
        self.read_line().map(|_| ())
    }

    /// Numbered filesystem menu; anything but 1-3 is asked again.
    pub fn choose_filesystem(&mut self) -> io::Result<FilesystemKind> {
        writeln!(self.output, "Please choose the filesystem for the root partition:")?;
        for (i, kind) in FilesystemKind::ALL.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, kind)?;
        }
        loop {
            write!(self.output, "Enter your choice (1-3): ")?;
            self.output.flush()?;
            let choice = self.read_line()?;
            match FilesystemKind::from_menu_choice(&choice) {
                Some(kind) => return Ok(kind),
                None => writeln!(self.output, "Invalid choice, please try again.")?,
            }
        }
    }

    fn ask_sizes(&mut self) -> io::Result<(SizeSpec, SizeSpec, SizeSpec)> {
        let boot = self.ask_valid(
            "Please enter the size of the boot partition (e.g. 512M):",
            SizeSpec::new,
        )?;
        let root = self.ask_valid(
            "Please enter the size of the root partition (e.g. 10G):",
            SizeSpec::new,
        )?;
        let swap = self.ask_valid(
            "Please enter the size of the swap partition (e.g. 2G):",
            SizeSpec::new,
        )?;
        Ok((boot, root, swap))
    }

    /// Collect and validate every choice. `sys_class_block` is where whole
    /// disks are told apart from partitions.
    pub fn collect_plan(&mut self, sys_class_block: &Path) -> io::Result<InstallPlan> {
        let disk = self.ask_valid(
            "Please enter the disk you would like to install Gentoo on (e.g. /dev/sda):",
            |answer| {
                let disk = plan::validate_disk_path(answer)?;
                plan::check_whole_disk(&disk, sys_class_block)
            },
        )?;

        let (boot, root, swap) = loop {
            let (boot, root, swap) = self.ask_sizes()?;
            let layout = PartitionLayout::new(&boot, &root, &swap, FilesystemKind::Ext4);
            match layout.parted_command(&disk) {
                Ok(_) => break (boot, root, swap),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        };

        let filesystem = self.choose_filesystem()?;
        let timezone = self.ask_valid(
            "Please enter the timezone (e.g. Europe/Berlin, UTC):",
            plan::validate_timezone,
        )?;
        let hostname = self.ask_valid("Please enter the hostname:", plan::validate_hostname)?;

        InstallPlan::new(
            &disk,
            boot.as_str(),
            root.as_str(),
            swap.as_str(),
            filesystem,
            &timezone,
            &hostname,
        )
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    }

    /// Last chance before the disk is wiped. Only `yes` proceeds.
    pub fn confirm_wipe(&mut self, plan: &InstallPlan) -> io::Result<bool> {
        writeln!(self.output)?;
        writeln!(self.output, "Disk:        {}", plan.disk())?;
        writeln!(
            self.output,
            "Partitions:  boot {}, root {} ({}), swap {}",
            plan.boot_size(),
            plan.root_size(),
            plan.filesystem(),
            plan.swap_size()
        )?;
        writeln!(self.output, "Timezone:    {}", plan.timezone())?;
        writeln!(self.output, "Hostname:    {}", plan.hostname())?;
        let answer = self.ask(&format!(
            "ALL DATA ON {} WILL BE DESTROYED. Type 'yes' to continue:",
            plan.disk()
        ))?;
        Ok(answer == "yes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_menu_maps_each_choice() {
        for (input, kind) in [
            ("1\n", FilesystemKind::Ext4),
            ("2\n", FilesystemKind::Btrfs),
            ("3\n", FilesystemKind::Xfs),
        ] {
            assert_eq!(prompter(input).choose_filesystem().unwrap(), kind);
        }
    }

    #[test]
    fn test_menu_reprompts_on_invalid() {
        let mut p = prompter("7\nxfs\n\n2\n");
        assert_eq!(p.choose_filesystem().unwrap(), FilesystemKind::Btrfs);
        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out.matches("Invalid choice, please try again.").count(), 3);
        assert_eq!(out.matches("Enter your choice (1-3): ").count(), 4);
    }

    #[test]
    fn test_menu_eof_is_error() {
        let err = prompter("9\n").choose_filesystem().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_ask_valid_reprompts() {
        let mut p = prompter("\n\n512M\n");
        let size = p.ask_valid("size?", SizeSpec::new).unwrap();
        assert_eq!(size.as_str(), "512M");
        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out.matches("size?").count(), 3);
    }

    #[test]
    fn test_confirm_requires_yes() {
        let plan = InstallPlan::new(
            "/dev/sda", "512M", "10G", "2G", FilesystemKind::Ext4, "UTC", "gentoo-box",
        )
        .unwrap();
        assert!(prompter("yes\n").confirm_wipe(&plan).unwrap());
        assert!(!prompter("y\n").confirm_wipe(&plan).unwrap());
        assert!(!prompter("YES please\n").confirm_wipe(&plan).unwrap());
    }

    #[test]
    fn test_collect_plan_rejects_partition_and_bad_answers() {
        let sys = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(sys.path().join("sda")).unwrap();
        std::fs::create_dir_all(sys.path().join("sda2")).unwrap();
        std::fs::write(sys.path().join("sda2/partition"), "2\n").unwrap();

        let mut p = prompter(
            "/dev/sda2\n/dev/sda\n512M\n10G\n2G\n4\n2\n../etc/passwd\nUTC\n-bad-\ngentoo-box\n",
        );
        let plan = p.collect_plan(sys.path()).unwrap();
        assert_eq!(plan.disk(), "/dev/sda");
        assert_eq!(plan.filesystem(), FilesystemKind::Btrfs);
        assert_eq!(plan.timezone(), "UTC");
        assert_eq!(plan.hostname(), "gentoo-box");

        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out.matches("Please enter the disk").count(), 2);
        assert_eq!(out.matches("Invalid choice").count(), 1);
        assert_eq!(out.matches("Please enter the timezone").count(), 2);
        assert_eq!(out.matches("Please enter the hostname").count(), 2);
    }

    #[test]
    fn test_collect_plan_stores_the_resolved_disk() {
        let sys = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(sys.path().join("fd")).unwrap();
        std::fs::create_dir_all(sys.path().join("sda")).unwrap();

        // /dev/fd is a link into /proc, so partitions named after it would
        // not exist.
        let mut p = prompter("/dev/fd\n/dev/sda\n512M\n10G\n2G\n1\nUTC\ngentoo-box\n");
        let plan = p.collect_plan(sys.path()).unwrap();
        assert_eq!(plan.disk(), "/dev/sda");

        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out.matches("Please enter the disk").count(), 2);
        assert!(out.contains("not a device node under /dev"));
    }

    #[test]
    fn test_collect_plan_reasks_sizes_that_cannot_be_summed() {
        let sys = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(sys.path().join("sda")).unwrap();

        let mut p = prompter(
            "/dev/sda\n50%\n10G\n2G\n1.5G\n10G\n2G\n1\nUTC\ngentoo-box\n",
        );
        let plan = p.collect_plan(sys.path()).unwrap();
        assert_eq!(plan.boot_size().as_str(), "1.5G");
        assert_eq!(plan.root_size().as_str(), "10G");
        assert_eq!(plan.swap_size().as_str(), "2G");

        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out.matches("size of the boot partition").count(), 2);
        assert_eq!(out.matches("size of the root partition").count(), 2);
        assert_eq!(out.matches("size of the swap partition").count(), 2);
        assert!(out.contains("invalid input"));
    }
}

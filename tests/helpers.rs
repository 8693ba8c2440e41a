//! Shared test utilities: a fake host that records every operation.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::path::Path;
use std::rc::Rc;

use gentoo_install::host::Host;
use gentoo_install::plan::{FilesystemKind, InstallPlan};
use gentoo_install::process::Cmd;
use gentoo_install::InstallError;

pub const IMAGE_PATH: &str = "20241013T170323Z/stage3-amd64-openrc-20241013T170323Z.tar.xz";
pub const IMAGE_FILE: &str = "stage3-amd64-openrc-20241013T170323Z.tar.xz";
pub const ROOT_UUID: &str = "0b6f6a7e-3f2d-4c55-9d7a-3a1f1e1c2b11";
pub const BOOT_UUID: &str = "9C4D-1A2B";
pub const SWAP_UUID: &str = "5d2c0e61-8a0f-4f0e-b1b6-6f3c2a9e0d44";

pub fn image_sha512() -> String {
    "ab".repeat(64)
}

pub fn pointer_document() -> String {
    format!(
        "# Latest as of Sun, 13 Oct 2024 17:03:23 +0000\n# ts=1728838403\n{} 264758976\n",
        IMAGE_PATH
    )
}

pub fn digests_manifest() -> String {
    format!(
        "# BLAKE2B HASH\n{b}  {f}\n# SHA512 HASH\n{s}  {f}\n",
        b = "cd".repeat(64),
        s = image_sha512(),
        f = IMAGE_FILE
    )
}

pub fn findmnt_output() -> String {
    format!(
        "{} /mnt/gentoo ext4\n{} /mnt/gentoo/boot vfat\n",
        ROOT_UUID, BOOT_UUID
    )
}

/// The plan used by the end-to-end scenarios.
pub fn sample_plan() -> InstallPlan {
    InstallPlan::new(
        "/dev/sda",
        "512M",
        "10G",
        "2G",
        FilesystemKind::Ext4,
        "UTC",
        "gentoo-box",
    )
    .expect("sample plan is valid")
}

type Matcher = Box<dyn Fn(&str) -> bool>;

/// Fake [`Host`] that logs each call as a line of text and answers captures
/// with canned output.
///
/// Log lines look like `run: <cmd>`, `capture: <cmd>`, `mkdir: <path>`,
/// `copy: <from> -> <to>`, `symlink: <link> -> <original>`, `write: <path>`,
/// `read: <path>`, `sha512: <path>`.
pub struct RecordingHost {
    log: Rc<RefCell<Vec<String>>>,
    writes: Rc<RefCell<Vec<(String, String)>>>,
    fail_on: Option<Matcher>,
    panic_on: Option<Matcher>,
    fired: Cell<bool>,
    pointer: String,
    digests: String,
    computed_sha512: String,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            log: Rc::default(),
            writes: Rc::default(),
            fail_on: None,
            panic_on: None,
            fired: Cell::new(false),
            pointer: pointer_document(),
            digests: digests_manifest(),
            computed_sha512: image_sha512(),
        }
    }

    /// Fail the first call whose log line matches.
    pub fn fail_on(mut self, matcher: impl Fn(&str) -> bool + 'static) -> Self {
        self.fail_on = Some(Box::new(matcher));
        self
    }

    /// Panic on the first call whose log line matches.
    pub fn panic_on(mut self, matcher: impl Fn(&str) -> bool + 'static) -> Self {
        self.panic_on = Some(Box::new(matcher));
        self
    }

    pub fn with_pointer(mut self, document: &str) -> Self {
        self.pointer = document.to_string();
        self
    }

    /// Digest the fake reports for any file it is asked to hash.
    pub fn with_computed_sha512(mut self, hex: &str) -> Self {
        self.computed_sha512 = hex.to_string();
        self
    }

    /// Shared handle to the log, still readable after the host is dropped.
    pub fn log_handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Contents passed to `write_file`, by path.
    pub fn written(&self, path: &str) -> Option<String> {
        self.writes
            .borrow()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
    }

    fn record(&self, line: String) -> Result<(), ()> {
        if let Some(matcher) = &self.panic_on {
            if matcher(&line) {
                panic!("injected panic at {}", line);
            }
        }
        let fail = !self.fired.get() && self.fail_on.as_ref().is_some_and(|m| m(&line));
        self.log.borrow_mut().push(line);
        if fail {
            self.fired.set(true);
            return Err(());
        }
        Ok(())
    }

    fn tool_call(&self, kind: &str, cmd: &Cmd) -> Result<(), InstallError> {
        self.record(format!("{}: {}", kind, cmd))
            .map_err(|()| InstallError::tool(cmd.program(), "exit code 1: injected failure"))
    }

    fn fs_call(&self, line: String, path: &Path) -> Result<(), InstallError> {
        self.record(line).map_err(|()| {
            InstallError::fs(path, io::Error::new(io::ErrorKind::Other, "injected failure"))
        })
    }
}

impl Host for RecordingHost {
    fn run(&self, cmd: &Cmd) -> Result<(), InstallError> {
        self.tool_call("run", cmd)
    }

    fn capture(&self, cmd: &Cmd) -> Result<String, InstallError> {
        self.tool_call("capture", cmd)?;
        Ok(match cmd.program() {
            "curl" => self.pointer.clone(),
            "findmnt" => findmnt_output(),
            "blkid" => format!("{}\n", SWAP_UUID),
            _ => String::new(),
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), InstallError> {
        self.fs_call(format!("mkdir: {}", path.display()), path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), InstallError> {
        self.fs_call(format!("copy: {} -> {}", from.display(), to.display()), from)
    }

    fn symlink(&self, original: &Path, link: &Path) -> Result<(), InstallError> {
        self.fs_call(
            format!("symlink: {} -> {}", link.display(), original.display()),
            link,
        )
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<(), InstallError> {
        self.fs_call(format!("write: {}", path.display()), path)?;
        self.writes
            .borrow_mut()
            .push((path.display().to_string(), contents.to_string()));
        Ok(())
    }

    fn read_to_string(&self, path: &Path) -> Result<String, InstallError> {
        self.fs_call(format!("read: {}", path.display()), path)?;
        Ok(self.digests.clone())
    }

    fn sha512_file(&self, path: &Path) -> Result<String, InstallError> {
        self.fs_call(format!("sha512: {}", path.display()), path)?;
        Ok(self.computed_sha512.clone())
    }
}

/// Mount targets in the order they were mounted, taken from a call log.
pub fn mounted_targets(calls: &[String]) -> Vec<String> {
    calls
        .iter()
        .filter(|c| c.starts_with("run: mount "))
        .filter_map(|c| c.rsplit(' ').next())
        .map(str::to_string)
        .collect()
}

pub fn unmounted_targets(calls: &[String]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|c| c.strip_prefix("run: umount "))
        .map(str::to_string)
        .collect()
}

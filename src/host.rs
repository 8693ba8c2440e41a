//! The boundary between the pipeline and the machine it mutates.
//!
//! Pipeline code never touches processes or the filesystem directly; it asks
//! a [`Host`]. [`SystemHost`] is the real implementation. Tests substitute a
//! recording host to check call order and inject failures.

use std::fs;
use std::io::Read;
use std::os::unix::fs::symlink;
use std::path::Path;

use sha2::{Digest, Sha512};

use crate::error::{InstallError, Result};
use crate::process::Cmd;

pub trait Host {
    /// Run a tool with its output streamed to the terminal.
    fn run(&self, cmd: &Cmd) -> Result<()>;

    /// Run a tool and return its stdout.
    fn capture(&self, cmd: &Cmd) -> Result<String>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy a file, following symlinks on the source side.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Point `link` at `original`, replacing whatever `link` was (`ln -sf`).
    fn symlink(&self, original: &Path, link: &Path) -> Result<()>;

    fn write_file(&self, path: &Path, contents: &str) -> Result<()>;

    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Lowercase hex SHA-512 of a file's contents.
    fn sha512_file(&self, path: &Path) -> Result<String>;
}

/// The live system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl Host for SystemHost {
    fn run(&self, cmd: &Cmd) -> Result<()> {
        cmd.run_interactive()
    }

    fn capture(&self, cmd: &Cmd) -> Result<String> {
        Ok(cmd.run()?.stdout)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| InstallError::fs(path, e))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent)?;
        }
        fs::copy(from, to).map_err(|e| InstallError::fs(from, e))?;
        Ok(())
    }

    fn symlink(&self, original: &Path, link: &Path) -> Result<()> {
        match fs::remove_file(link) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(InstallError::fs(link, e)),
        }
        symlink(original, link).map_err(|e| InstallError::fs(link, e))
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).map_err(|e| InstallError::fs(path, e))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| InstallError::fs(path, e))
    }

    fn sha512_file(&self, path: &Path) -> Result<String> {
        let file = fs::File::open(path).map_err(|e| InstallError::fs(path, e))?;
        let mut reader = std::io::BufReader::with_capacity(1024 * 1024, file);
        let mut hasher = Sha512::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| InstallError::fs(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

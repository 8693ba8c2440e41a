//! Interactive Gentoo installer.
//!
//! Partitions a disk, creates filesystems, installs a verified stage3 and
//! prepares the new root for the first in-chroot update. The provisioning
//! steps are sequenced by [`pipeline::Installer`]; everything that touches
//! the machine goes through [`host::Host`].

pub mod chroot;
pub mod commands;
pub mod config;
pub mod configure;
pub mod error;
pub mod fstab;
pub mod host;
pub mod logging;
pub mod mount;
pub mod partition;
pub mod pipeline;
pub mod plan;
pub mod preflight;
pub mod process;
pub mod prompt;
pub mod stage3;
pub mod timing;

pub use error::{InstallError, Result};

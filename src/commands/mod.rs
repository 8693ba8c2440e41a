//! CLI command handlers.
//!
//! - `install` - Interactive installation
//! - `preflight` - Host readiness checks
//! - `show-config` - Print the effective configuration

mod install;
mod preflight;

pub use install::cmd_install;
pub use preflight::cmd_preflight;

//! Install command - preflight, questions, confirmation, pipeline.

use std::io;

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::host::SystemHost;
use crate::pipeline::Installer;
use crate::preflight::{self, CheckStatus};
use crate::prompt::Prompter;

/// Execute the install command.
pub fn cmd_install(config: &Config) -> Result<()> {
    preflight::run_preflight_or_fail(config)?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    prompter.welcome().context("Input closed")?;
    let plan = prompter
        .collect_plan(&config.sys_class_block)
        .context("Input closed before all choices were made")?;

    let fs_tool = preflight::check_filesystem_tool(plan.filesystem());
    if fs_tool.status == CheckStatus::Fail {
        bail!(
            "{}: {}",
            fs_tool.name,
            fs_tool.details.unwrap_or_default()
        );
    }

    if !prompter.confirm_wipe(&plan).context("Input closed")? {
        println!("Cancelled. {} was not modified.", plan.disk());
        return Ok(());
    }

    let mut installer = Installer::new(SystemHost, config.clone());
    if let Err(aborted) = installer.run(&plan) {
        eprintln!(
            "\nInstallation aborted. Steps that completed before '{}' were not undone; \
             inspect {} before re-running.",
            aborted.step,
            plan.disk()
        );
        bail!("{}", aborted);
    }

    println!("\nInstallation complete.");
    for mount in installer.handed_off_mounts() {
        println!("  still mounted: {}", mount.display());
    }
    println!("Finish configuring the system in the chroot, then reboot into your new Gentoo system.");
    Ok(())
}

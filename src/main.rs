//! gentoo-install - interactive Gentoo installer.
//!
//! Walks the operator through disk selection and partition sizes, then:
//! - writes a GPT table (boot, root, swap) and creates filesystems
//! - downloads the latest stage3, verifies its SHA512 and extracts it
//! - copies host DNS and Portage config, sets timezone, hostname and fstab
//! - chroots in to sync Portage and update @world

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use gentoo_install::commands;
use gentoo_install::config::{Config, DEFAULT_MIRROR};
use gentoo_install::logging::{self, LogLevel};

#[derive(Parser)]
#[command(name = "gentoo-install")]
#[command(about = "Interactive Gentoo installer")]
#[command(
    after_help = "QUICK START:\n  gentoo-install preflight  Check the host is ready\n  gentoo-install            Run the interactive install"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: Options,
}

#[derive(Args)]
struct Options {
    /// Gentoo mirror to download the stage3 from
    #[arg(long, global = true, default_value = DEFAULT_MIRROR)]
    mirror: String,

    /// Architecture directory under releases/
    #[arg(long, global = true, default_value = "amd64")]
    arch: String,

    /// Stage3 flavor, selects latest-<flavor>.txt
    #[arg(long, global = true, default_value = "stage3-amd64-openrc")]
    stage3: String,

    /// Suffix of the digest manifest next to the stage3
    #[arg(long, global = true, default_value = ".DIGESTS")]
    digests_suffix: String,

    /// Mount point for the new root
    #[arg(long, global = true, default_value = "/mnt/gentoo")]
    target: PathBuf,

    /// Diagnostic log level (written to stderr)
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive installation (default)
    Install,

    /// Check host tools, privileges and files before installing
    Preflight {
        /// Exit non-zero if any check fails
        #[arg(long)]
        strict: bool,
    },

    /// Show the effective configuration
    ShowConfig,
}

impl Options {
    fn into_config(self) -> Config {
        Config {
            mirror: self.mirror,
            arch: self.arch,
            stage3: self.stage3,
            digests_suffix: self.digests_suffix,
            target: self.target,
            ..Config::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.options.log_level)?;
    let config = cli.options.into_config();

    match cli.command.unwrap_or(Commands::Install) {
        Commands::Install => commands::cmd_install(&config)?,
        Commands::Preflight { strict } => commands::cmd_preflight(&config, strict)?,
        Commands::ShowConfig => config.print(),
    }

    Ok(())
}

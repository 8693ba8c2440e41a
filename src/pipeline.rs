//! The install pipeline: a linear state machine over the provisioning steps.
//!
//! Each step runs only if every step before it succeeded. The first failure
//! moves the machine to [`State::Aborted`], unmounts whatever this run
//! mounted, and returns [`Aborted`] naming the step. Nothing is retried and
//! nothing else is undone.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chroot;
use crate::config::Config;
use crate::configure;
use crate::error::{InstallError, Result};
use crate::fstab;
use crate::host::Host;
use crate::mount::{self, MountPoint, MountTable};
use crate::partition;
use crate::plan::InstallPlan;
use crate::stage3;
use crate::timing::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Collecting,
    Partitioning,
    Mounting,
    Provisioning,
    Configuring,
    Chrooting,
    Done,
    Aborted,
}

impl State {
    fn banner(self) -> &'static str {
        match self {
            Self::Collecting => "Collecting choices",
            Self::Partitioning => "Partitioning disk and creating filesystems",
            Self::Mounting => "Mounting root filesystem",
            Self::Provisioning => "Installing stage3",
            Self::Configuring => "Configuring target environment",
            Self::Chrooting => "Updating system inside chroot",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Individual pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Partition,
    Format,
    MountRoot,
    ResolveImage,
    DownloadImage,
    DownloadDigests,
    Verify,
    Extract,
    MountBoot,
    MountPseudo,
    CopyResolvConf,
    CopyMakeConf,
    SetTimezone,
    WriteHostname,
    GenerateFstab,
    Chroot,
}

impl Step {
    pub const ALL: [Step; 16] = [
        Self::Partition,
        Self::Format,
        Self::MountRoot,
        Self::ResolveImage,
        Self::DownloadImage,
        Self::DownloadDigests,
        Self::Verify,
        Self::Extract,
        Self::MountBoot,
        Self::MountPseudo,
        Self::CopyResolvConf,
        Self::CopyMakeConf,
        Self::SetTimezone,
        Self::WriteHostname,
        Self::GenerateFstab,
        Self::Chroot,
    ];

    /// The state this step belongs to.
    pub fn state(self) -> State {
        match self {
            Self::Partition | Self::Format => State::Partitioning,
            Self::MountRoot => State::Mounting,
            Self::ResolveImage
            | Self::DownloadImage
            | Self::DownloadDigests
            | Self::Verify
            | Self::Extract => State::Provisioning,
            Self::MountBoot
            | Self::MountPseudo
            | Self::CopyResolvConf
            | Self::CopyMakeConf
            | Self::SetTimezone
            | Self::WriteHostname
            | Self::GenerateFstab => State::Configuring,
            Self::Chroot => State::Chrooting,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Partition => "write partition table",
            Self::Format => "create filesystems",
            Self::MountRoot => "mount root filesystem",
            Self::ResolveImage => "resolve latest stage3",
            Self::DownloadImage => "download stage3",
            Self::DownloadDigests => "download digest manifest",
            Self::Verify => "verify stage3 digest",
            Self::Extract => "extract stage3",
            Self::MountBoot => "mount boot partition",
            Self::MountPseudo => "mount proc, dev and sys",
            Self::CopyResolvConf => "copy resolv.conf",
            Self::CopyMakeConf => "copy make.conf",
            Self::SetTimezone => "set timezone",
            Self::WriteHostname => "write hostname",
            Self::GenerateFstab => "generate fstab",
            Self::Chroot => "update system in chroot",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step: Step,
    /// `None` on success, the error text otherwise.
    pub error: Option<String>,
}

impl StepResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Why the run stopped.
#[derive(Debug, Error)]
#[error("{state}: {step} failed: {source}")]
pub struct Aborted {
    pub state: State,
    pub step: Step,
    #[source]
    pub source: InstallError,
}

/// Drives one install run against a [`Host`].
pub struct Installer<H: Host> {
    host: H,
    config: Config,
    state: State,
    results: Vec<StepResult>,
    mounts: MountTable,
    handed_off: Vec<PathBuf>,
    timer: Option<Timer>,
}

impl<H: Host> Installer<H> {
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            config,
            state: State::Collecting,
            results: Vec::new(),
            mounts: MountTable::new(),
            handed_off: Vec::new(),
            timer: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mounts this run currently owns and will release on abort.
    pub fn mounts(&self) -> &[PathBuf] {
        self.mounts.mounted()
    }

    /// Mounts left in place for the operator after a successful run.
    pub fn handed_off_mounts(&self) -> &[PathBuf] {
        &self.handed_off
    }

    /// Run every step for `plan`. On success the mounts stay in place for the
    /// operator to keep working in the chroot.
    pub fn run(&mut self, plan: &InstallPlan) -> std::result::Result<(), Aborted> {
        let config = self.config.clone();
        let target = config.target.clone();

        let devices = self.step(Step::Partition, |host, _| partition::create_layout(host, plan))?;
        self.step(Step::Format, |host, _| {
            partition::format_partitions(host, &devices, plan.filesystem())
        })?;

        self.step(Step::MountRoot, |host, mounts| {
            mount::mount_root(host, mounts, &devices.root, &target)
        })?;

        let image = self.step(Step::ResolveImage, |host, _| stage3::resolve(host, &config))?;
        self.step(Step::DownloadImage, |host, _| stage3::download_image(host, &image))?;
        self.step(Step::DownloadDigests, |host, _| stage3::download_digests(host, &image))?;
        self.step(Step::Verify, |host, _| stage3::verify(host, &image))?;
        self.step(Step::Extract, |host, _| stage3::extract(host, &image, &target))?;

        self.step(Step::MountBoot, |host, mounts| {
            mounts.mount(host, &MountPoint::device(&devices.boot, &target.join("boot")))
        })?;
        self.step(Step::MountPseudo, |host, mounts| {
            mount::mount_pseudo(host, mounts, &target)
        })?;
        self.step(Step::CopyResolvConf, |host, _| {
            configure::copy_resolv_conf(host, &config.host_resolv_conf, &target)
        })?;
        self.step(Step::CopyMakeConf, |host, _| {
            configure::copy_make_conf(host, &config.host_make_conf, &target)
        })?;
        self.step(Step::SetTimezone, |host, _| {
            configure::set_timezone(host, &target, plan.timezone())
        })?;
        self.step(Step::WriteHostname, |host, _| {
            configure::write_hostname(host, &target, plan.hostname())
        })?;
        self.step(Step::GenerateFstab, |host, _| {
            fstab::generate(host, &target, &devices.swap)
        })?;

        self.step(Step::Chroot, |host, _| chroot::run_update(host, &target))?;

        self.enter(State::Done);
        self.handed_off = self.mounts.keep();
        info!(mounts = self.handed_off.len(), "install complete");
        Ok(())
    }

    fn enter(&mut self, state: State) {
        if self.state == state {
            return;
        }
        if let Some(timer) = self.timer.take() {
            timer.finish();
        }
        info!(from = %self.state, to = %state, "transition");
        self.state = state;
        if state != State::Done {
            println!("\n{}...", state.banner());
            self.timer = Some(Timer::start(state.banner()));
        }
    }

    fn step<T>(
        &mut self,
        step: Step,
        f: impl FnOnce(&dyn Host, &mut MountTable) -> Result<T>,
    ) -> std::result::Result<T, Aborted> {
        self.enter(step.state());
        debug!(%step, "running");

        match f(&self.host, &mut self.mounts) {
            Ok(value) => {
                self.results.push(StepResult { step, error: None });
                Ok(value)
            }
            Err(source) => {
                self.results.push(StepResult {
                    step,
                    error: Some(source.to_string()),
                });
                let state = self.state;
                self.state = State::Aborted;
                self.timer = None;
                warn!(%step, error = %source, "aborting");
                self.mounts.release(&self.host);
                Err(Aborted { state, step, source })
            }
        }
    }
}

impl<H: Host> Drop for Installer<H> {
    fn drop(&mut self) {
        if !self.mounts.is_empty() {
            warn!(mounts = self.mounts.mounted().len(), "installer dropped mid-run, unmounting");
            self.mounts.release(&self.host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_follow_state_order() {
        let order = [
            State::Partitioning,
            State::Mounting,
            State::Provisioning,
            State::Configuring,
            State::Chrooting,
        ];
        let rank = |s: State| order.iter().position(|o| *o == s).unwrap();
        let ranks: Vec<usize> = Step::ALL.iter().map(|s| rank(s.state())).collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_aborted_message_names_stage_and_step() {
        let err = Aborted {
            state: State::Provisioning,
            step: Step::Verify,
            source: InstallError::IntegrityVerification {
                file: "stage3.tar.xz".to_string(),
                expected: "aa".to_string(),
                actual: "bb".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Provisioning: verify stage3 digest failed: integrity check failed for stage3.tar.xz: expected aa, got bb"
        );
    }
}

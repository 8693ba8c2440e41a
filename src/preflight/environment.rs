//! Host environment checks: privileges, files copied into the target, and
//! the state of the target mount point.

use std::path::Path;

use crate::config::Config;

use super::types::CheckResult;

pub fn check_environment(config: &Config) -> Vec<CheckResult> {
    let mut results = vec![check_root()];

    results.push(check_host_file("resolv.conf", &config.host_resolv_conf));
    results.push(check_host_file("make.conf", &config.host_make_conf));

    match std::fs::read_to_string("/proc/self/mountinfo") {
        Ok(mountinfo) => results.push(check_target_unmounted(&mountinfo, &config.target)),
        Err(e) => results.push(CheckResult::warn(
            "target mount point",
            &format!("Cannot read /proc/self/mountinfo: {}", e),
        )),
    }

    results
}

fn check_root() -> CheckResult {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        CheckResult::pass("running as root")
    } else {
        CheckResult::fail(
            "running as root",
            &format!("Effective UID is {}. Partitioning and mounting need root.", euid),
        )
    }
}

fn check_host_file(name: &str, path: &Path) -> CheckResult {
    if path.is_file() {
        CheckResult::pass_with(name, &path.display().to_string())
    } else {
        CheckResult::fail(
            name,
            &format!("{} not found; it is copied into the target", path.display()),
        )
    }
}

/// Warn when something is already mounted at or below the target.
pub fn check_target_unmounted(mountinfo: &str, target: &Path) -> CheckResult {
    let busy: Vec<&str> = mountinfo
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .filter(|mountpoint| Path::new(mountpoint).starts_with(target))
        .collect();

    if busy.is_empty() {
        CheckResult::pass_with("target mount point", &target.display().to_string())
    } else {
        CheckResult::warn(
            "target mount point",
            &format!("Already mounted: {}", busy.join(", ")),
        )
    }
}

//! Constants for the BOSH Process Manager.
//!
//! Centralized location for hard-coded directory segments, environment
//! variable names, and the stop-escalation timeouts. These stay named
//! constants rather than operator-configurable fields: the grace windows
//! are a fixed policy, not something a `bpm.yml` author should tune.

/// Environment variables BPM reads at entry.
pub mod envs {
    /// Absolute path to the BOSH root directory. Required.
    pub const BPM_BOSH_ROOT: &str = "BPM_BOSH_ROOT";
}

/// Directory segments under `BPM_BOSH_ROOT`.
pub mod dirs {
    pub const JOBS_DIR: &str = "jobs";
    pub const CONFIG_DIR: &str = "config";
    pub const PACKAGES_DIR: &str = "packages";
    pub const DATA_DIR: &str = "data";
    pub const BPM_DIR: &str = "bpm";
    pub const BUNDLES_DIR: &str = "bundles";
    pub const RUNC_STATE_DIR: &str = "runc";
    pub const LOCKS_DIR: &str = "locks";
    pub const SYS_DIR: &str = "sys";
    pub const LOG_DIR: &str = "log";
    pub const RUN_DIR: &str = "run";
    pub const STORE_DIR: &str = "store";
}

/// File naming conventions.
pub mod filenames {
    pub const BUNDLE_SPEC: &str = "config.json";
    pub const BPM_LOG: &str = "bpm.log";
    pub const STDOUT_LOG_SUFFIX: &str = "out.log";
    pub const STDERR_LOG_SUFFIX: &str = "err.log";
    pub const PID_SUFFIX: &str = "pid";
    pub const LOCK_SUFFIX: &str = "lock";
}

/// Names of the OCI runtime binary BPM looks for.
pub mod runtime_binary {
    /// Preferred location, packaged alongside BPM itself.
    pub const PACKAGED_RELATIVE_PATH: &[&str] = &["packages", "bpm", "bin", "runc"];
    /// Fallback name resolved against `PATH`.
    pub const PATH_FALLBACK: &str = "runc";
}

/// Stop-sequence timing.
pub mod timeouts {
    use std::time::Duration;

    /// Grace period after SIGTERM before escalating to SIGQUIT.
    pub const STOP_GRACE: Duration = Duration::from_secs(15);
    /// Grace period after SIGQUIT before escalating to SIGKILL.
    pub const QUIT_GRACE: Duration = Duration::from_secs(5);
    /// Poll backoff floor while waiting for the container to reach `stopped`.
    pub const POLL_FLOOR: Duration = Duration::from_millis(50);
    /// Poll backoff ceiling while waiting for the container to reach `stopped`.
    pub const POLL_CEILING: Duration = Duration::from_secs(1);
    /// Window within which the advisory lock must be acquired.
    pub const LOCK_RETRY_WINDOW: Duration = Duration::from_secs(5);
    /// Interval between lock acquisition attempts.
    pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);
}

/// Contractual supervisor-log event names.
pub mod events {
    pub const START_STARTING: &str = "bpm.start.starting";
    pub const START_COMPLETE: &str = "bpm.start.complete";
    pub const STOP_STARTING: &str = "bpm.stop.starting";
    pub const STOP_COMPLETE: &str = "bpm.stop.complete";
}

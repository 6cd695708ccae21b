//! Container lifecycle engine for the BOSH Process Manager.
//!
//! Translates a job's `ProcessConfig` into an OCI runtime bundle, drives an
//! external OCI runtime (`runc`) through its lifecycle, and maintains the
//! pidfile/log/lock discipline a BOSH job process depends on.

pub mod bundle;
pub mod config;
pub mod constants;
pub mod error;
pub mod layout;
pub mod lock;
pub mod logs;
pub mod orchestrator;
pub mod pidfile;
pub mod runtime;
pub mod telemetry;

pub use config::ProcessConfig;
pub use error::{BpmError, BpmResult};
pub use layout::Layout;
pub use orchestrator::{ListEntry, Orchestrator};

use std::path::PathBuf;

use crate::constants::envs;

/// Read `BPM_BOSH_ROOT` once at entry and thread it as a value through
/// every component, per the design note against re-reading ambient state.
pub fn bosh_root_from_env() -> Result<PathBuf, BpmError> {
    std::env::var(envs::BPM_BOSH_ROOT)
        .map(PathBuf::from)
        .map_err(|_| BpmError::InvalidUsage(format!("{} is not set", envs::BPM_BOSH_ROOT)))
}

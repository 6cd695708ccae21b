//! Error taxonomy for the BOSH Process Manager.
//!
//! One top-level error type with sub-enums for layers that have their own
//! recovery semantics (config parsing vs. runtime-state preconditions).

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by any `bpm` component.
#[derive(Debug, Error)]
pub enum BpmError {
    /// Missing or malformed CLI flag.
    #[error("{0}")]
    InvalidUsage(String),

    /// Config layer failures.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An unsafe or malformed job/process name.
    #[error("invalid name {0:?}: job and process names must be non-empty and contain no path separators or leading dots")]
    InvalidName(String),

    /// Runtime-state precondition failures.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The Bundle Builder could not assemble a valid OCI runtime spec.
    #[error("failed to build container bundle: {0}")]
    Bundle(String),

    /// On-disk state BPM itself wrote (pidfile, bundle spec) is corrupt.
    #[error("{0}")]
    Corrupt(String),

    /// Could not acquire the advisory lock within the retry window.
    #[error("could not acquire lock for {0}: another bpm invocation is in progress")]
    Busy(String),

    /// `pid`/`trace` invoked against a container that has no running process.
    #[error("no pid for job")]
    NoPid,

    /// Filesystem failure, wrapped with the path that failed.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BpmError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BpmError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the Config Loader & Validator.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("configuration file {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("configuration field {field:?} is invalid: {reason}")]
    Invalid { field: String, reason: String },
}

/// Errors from the Runtime Adapter and Lifecycle Orchestrator's
/// interactions with container state.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container {0} is already running")]
    AlreadyRunning(String),

    #[error("container {0} does not exist")]
    ContainerNotFound(String),

    #[error("container {0} already exists")]
    ContainerExists(String),

    #[error("oci runtime failed: {0}")]
    RuntimeFailed(String),
}

pub type BpmResult<T> = Result<T, BpmError>;

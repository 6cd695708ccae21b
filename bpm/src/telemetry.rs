//! Supervisor log setup: stderr for operator-facing diagnostics (honouring
//! `RUST_LOG`), plus a newline-delimited JSON layer writing to the job's
//! `bpm.log` via a non-blocking appender, mirroring stderr at whatever
//! verbosity the operator chose.

use std::path::Path;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{dirs, filenames};
use crate::error::BpmError;
use crate::logs;

/// Must be kept alive for the lifetime of the process; dropping it flushes
/// and stops the non-blocking JSON writer.
pub struct TelemetryGuard {
    _appender_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global `tracing` subscriber. `job`, when known, selects the
/// job-scoped `bpm.log` destination for the JSON layer; commands that span
/// jobs (`list`) get stderr diagnostics only.
pub fn init(root: &Path, job: Option<&str>) -> Result<TelemetryGuard, BpmError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (json_layer, guard) = match job {
        Some(job) => {
            let log_path = root
                .join(dirs::SYS_DIR)
                .join(dirs::LOG_DIR)
                .join(job)
                .join(filenames::BPM_LOG);
            let file = logs::open_file(&log_path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(TelemetryGuard { _appender_guard: guard })
}

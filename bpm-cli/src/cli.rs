//! Argument parsing for the `bpm` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bpm", about = "BOSH Process Manager", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the OCI bundle and start the process.
    Start(JobConfigArgs),
    /// Gracefully stop the process and tear down its bundle.
    Stop(JobConfigArgs),
    /// List every known process and its runtime status.
    List,
    /// Print the running process's PID.
    Pid(JobConfigArgs),
    /// Attach `strace` to the running process.
    Trace(JobConfigArgs),
    /// Open an interactive shell inside the container.
    Shell(JobConfigArgs),
}

/// `-j/--job` and `-c/--config`, left optional here so the CLI can surface
/// the two documented hand-written messages instead of clap's generic
/// "required argument" error.
#[derive(Args, Debug)]
pub struct JobConfigArgs {
    #[arg(short, long)]
    pub job: Option<String>,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl JobConfigArgs {
    pub fn require_job(&self) -> anyhow::Result<&str> {
        self.job.as_deref().ok_or_else(|| anyhow::anyhow!("must specify a job"))
    }

    pub fn require_config(&self) -> anyhow::Result<&std::path::Path> {
        self.config
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("must specify a configuration file"))
    }
}

//! `bpm` — the BOSH Process Manager CLI.

mod cli;
mod commands;

use clap::Parser;

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprint!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = bpm::bosh_root_from_env()?;

    let job = match &cli.command {
        Command::Start(args) | Command::Stop(args) | Command::Pid(args) | Command::Trace(args) | Command::Shell(args) => {
            Some(args.require_job()?.to_string())
        }
        Command::List => None,
    };

    let _telemetry = bpm::telemetry::init(&root, job.as_deref())?;
    let orchestrator = bpm::Orchestrator::new(root);

    match cli.command {
        Command::Start(args) => commands::start::execute(&args, &orchestrator).await,
        Command::Stop(args) => commands::stop::execute(&args, &orchestrator).await,
        Command::List => commands::list::execute(&orchestrator).await,
        Command::Pid(args) => commands::pid::execute(&args, &orchestrator).await,
        Command::Trace(args) => commands::trace::execute(&args, &orchestrator).await,
        Command::Shell(args) => commands::shell::execute(&args, &orchestrator).await,
    }
}

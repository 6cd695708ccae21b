use bpm::Orchestrator;

use crate::cli::JobConfigArgs;

pub async fn execute(args: &JobConfigArgs, orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let job = args.require_job()?;
    let config = args.require_config()?;

    // An invalid interactive command is the shell's own problem; bpm never
    // re-prints its usage once the user is inside it.
    orchestrator.shell(job, config).await?;
    Ok(())
}

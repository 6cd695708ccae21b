use bpm::Orchestrator;

use crate::cli::JobConfigArgs;

pub async fn execute(args: &JobConfigArgs, orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let job = args.require_job()?;
    let config = args.require_config()?;

    orchestrator.start(job, config).await?;
    Ok(())
}

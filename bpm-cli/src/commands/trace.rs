use bpm::Orchestrator;

use crate::cli::JobConfigArgs;

pub async fn execute(args: &JobConfigArgs, orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let job = args.require_job()?;
    let config = args.require_config()?;

    let status = orchestrator.trace(job, config).await?;
    if !status.success() {
        anyhow::bail!("strace exited with {status}");
    }
    Ok(())
}

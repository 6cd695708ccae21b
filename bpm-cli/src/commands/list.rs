use bpm::Orchestrator;
use tabled::Tabled;

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Pid")]
    pid: i64,
    #[tabled(rename = "Status")]
    status: String,
}

pub async fn execute(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let entries = orchestrator.list().await?;
    if entries.is_empty() {
        return Ok(());
    }

    let rows: Vec<Row> = entries
        .into_iter()
        .map(|e| Row { name: e.name, pid: e.pid, status: e.status })
        .collect();

    println!("{}", tabled::Table::new(rows));
    Ok(())
}

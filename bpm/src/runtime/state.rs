//! The subset of `runc state`'s JSON output the Orchestrator cares about.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Stopped,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContainerState {
    pub id: String,
    pub status: ContainerStatus,
    pub pid: i64,
    #[serde(default)]
    pub bundle: String,
}

/// One line of `runc events`' newline-delimited JSON stream.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: String,
}

impl RuntimeEvent {
    pub fn is_oom(&self) -> bool {
        self.kind == "oom"
    }
}

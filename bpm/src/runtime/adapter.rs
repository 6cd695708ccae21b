//! Runtime Adapter: a thin wrapper around the external OCI runtime binary
//! (`runc`), driven entirely through `tokio::process::Command`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::constants::runtime_binary;
use crate::error::{BpmError, RuntimeError};
use crate::layout::Layout;

use super::state::{ContainerState, RuntimeEvent};

/// Locate the OCI runtime binary: the packaged copy under the BOSH root if
/// present, otherwise whatever `runc` is first on `PATH`.
fn resolve_binary(root: &Path) -> PathBuf {
    let packaged = runtime_binary::PACKAGED_RELATIVE_PATH
        .iter()
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment));
    if packaged.is_file() {
        packaged
    } else {
        PathBuf::from(runtime_binary::PATH_FALLBACK)
    }
}

/// Wraps `runc`, always injecting `--root=<root>/data/bpm/runc` so its
/// state never collides with a system-wide runtime invocation.
pub struct RuntimeAdapter {
    binary: PathBuf,
    state_root: PathBuf,
}

impl RuntimeAdapter {
    pub fn new(layout: &Layout) -> Self {
        RuntimeAdapter {
            binary: resolve_binary(layout.root()),
            state_root: layout.runtime_state_dir(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--root").arg(&self.state_root);
        cmd
    }

    /// Map a failed `runc` invocation's stderr onto the error taxonomy.
    fn classify_failure(id: &str, stderr: &str) -> BpmError {
        if stderr.contains("does not exist") {
            RuntimeError::ContainerNotFound(id.to_string()).into()
        } else if stderr.contains("already exists") {
            RuntimeError::ContainerExists(id.to_string()).into()
        } else {
            RuntimeError::RuntimeFailed(stderr.trim().to_string()).into()
        }
    }

    /// `runc create --bundle <bundle_dir> <id>`, with the container's stdio
    /// wired directly to the Log Pipe's already-open handles.
    pub async fn create(
        &self,
        bundle_dir: &Path,
        id: &str,
        stdout: File,
        stderr: File,
    ) -> Result<(), BpmError> {
        let status = self
            .command()
            .arg("create")
            .arg("--bundle")
            .arg(bundle_dir)
            .arg(id)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .await
            .map_err(|e| BpmError::io(&self.binary, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::RuntimeFailed(format!(
                "runc create exited with {status}; see the process's stderr log"
            ))
            .into())
        }
    }

    /// `runc start <id>`.
    pub async fn start(&self, id: &str) -> Result<(), BpmError> {
        self.run_captured(id, &["start", id]).await.map(|_| ())
    }

    /// `runc state <id>`, parsed into a [`ContainerState`].
    pub async fn state(&self, id: &str) -> Result<ContainerState, BpmError> {
        let stdout = self.run_captured(id, &["state", id]).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            RuntimeError::RuntimeFailed(format!("malformed state output for {id}: {e}")).into()
        })
    }

    /// `runc kill <id> <signal>`.
    pub async fn kill(&self, id: &str, signal: &str) -> Result<(), BpmError> {
        self.run_captured(id, &["kill", id, signal]).await.map(|_| ())
    }

    /// `runc delete [--force] <id>`.
    pub async fn delete(&self, id: &str, force: bool) -> Result<(), BpmError> {
        let mut args = vec!["delete"];
        if force {
            args.push("--force");
        }
        args.push(id);
        self.run_captured(id, &args).await.map(|_| ())
    }

    /// `runc exec <id> <cmd...>`, inheriting the caller's TTY. Used for
    /// `shell` and ad-hoc inspection; blocks until the exec'd process exits.
    pub async fn exec(&self, id: &str, cmd: &[String]) -> Result<std::process::ExitStatus, BpmError> {
        self.command()
            .arg("exec")
            .arg("--tty")
            .arg(id)
            .args(cmd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| BpmError::io(&self.binary, e))
    }

    /// Spawn `runc events <id>` on a background task, invoking `on_event`
    /// for every parsed line until the stream EOFs or `token` is cancelled.
    pub fn watch_events(
        &self,
        id: &str,
        token: CancellationToken,
        on_event: impl Fn(RuntimeEvent) + Send + 'static,
    ) -> Result<tokio::task::JoinHandle<()>, BpmError> {
        let mut child = self
            .command()
            .arg("events")
            .arg(id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BpmError::io(&self.binary, e))?;

        let stdout = child.stdout.take().expect("events stdout was piped");
        let id = id.to_string();

        Ok(tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(text)) => {
                                if let Ok(event) = serde_json::from_str::<RuntimeEvent>(&text) {
                                    on_event(event);
                                }
                            }
                            _ => break,
                        }
                    }
                }
            }
            let _ = child.kill().await;
            tracing::debug!(container_id = %id, "events watcher stopped");
        }))
    }

    async fn run_captured(&self, id: &str, args: &[&str]) -> Result<String, BpmError> {
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BpmError::io(&self.binary, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(Self::classify_failure(id, &String::from_utf8_lossy(&output.stderr)))
        }
    }
}

//! Lifecycle Orchestrator: the state machine driving `start`, `stop`,
//! `list`, `pid`, `trace`, and `shell` as short, deterministic
//! transactions over the lower-level components.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{self, ProcessConfig};
use crate::constants::{events, timeouts};
use crate::error::{BpmError, RuntimeError};
use crate::layout::Layout;
use crate::lock::{LockMode, ProcessLock};
use crate::logs;
use crate::runtime::{ContainerState, ContainerStatus, RuntimeAdapter};
use crate::{bundle, pidfile};

/// One row of `list`'s output.
#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    pub name: String,
    pub pid: i64,
    pub status: String,
}

/// Ties the lower-level components together against one BOSH root.
pub struct Orchestrator {
    root: PathBuf,
}

impl Orchestrator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Orchestrator { root: root.into() }
    }

    fn load_and_resolve(&self, job: &str, config_path: &Path) -> Result<(ProcessConfig, Layout), BpmError> {
        let cfg = config::load(config_path, self.root.as_path())?;
        let layout = Layout::new(self.root.as_path(), job, cfg.name.clone())?;
        Ok((cfg, layout))
    }

    /// `start`: load → resolve → lock → log pipe → bundle → create/start
    /// → pidfile → release, rolling back everything from the bundle build
    /// onward on failure.
    pub async fn start(&self, job: &str, config_path: &Path) -> Result<(), BpmError> {
        let (cfg, layout) = self.load_and_resolve(job, config_path)?;
        let adapter = RuntimeAdapter::new(&layout);
        let id = layout.container_id();

        match adapter.state(&id).await {
            Ok(_) => return Err(RuntimeError::AlreadyRunning(id).into()),
            Err(BpmError::Runtime(RuntimeError::ContainerNotFound(_))) => {}
            Err(e) => return Err(e),
        }

        let lock = ProcessLock::acquire(&layout.lock_path(), LockMode::Exclusive)?;
        let result = self.start_transaction(&layout, &cfg, &adapter).await;
        drop(lock);
        result
    }

    async fn start_transaction(
        &self,
        layout: &Layout,
        cfg: &ProcessConfig,
        adapter: &RuntimeAdapter,
    ) -> Result<(), BpmError> {
        let pipe = logs::open(layout)?;
        tracing::info!(
            event = events::START_STARTING,
            job = layout.job(),
            proc = layout.proc(),
            "starting container"
        );

        if let Err(err) = self.build_and_launch(layout, cfg, adapter, pipe).await {
            self.rollback(layout, adapter).await;
            return Err(err);
        }

        tracing::info!(
            event = events::START_COMPLETE,
            job = layout.job(),
            proc = layout.proc(),
            "container started"
        );
        Ok(())
    }

    async fn build_and_launch(
        &self,
        layout: &Layout,
        cfg: &ProcessConfig,
        adapter: &RuntimeAdapter,
        pipe: logs::LogPipe,
    ) -> Result<(), BpmError> {
        bundle::build(layout, cfg)?;

        let id = layout.container_id();
        adapter.create(&layout.bundle_dir(), &id, pipe.stdout, pipe.stderr).await?;
        adapter.start(&id).await?;

        let state = adapter.state(&id).await?;
        if state.pid <= 0 {
            return Err(RuntimeError::RuntimeFailed(
                "runtime reported no pid after start".to_string(),
            )
            .into());
        }

        pidfile::write(layout, state.pid)
    }

    /// Best-effort teardown of whatever `start` managed to create; never
    /// fails the caller's original error.
    async fn rollback(&self, layout: &Layout, adapter: &RuntimeAdapter) {
        let id = layout.container_id();
        if adapter.delete(&id, true).await.is_err() {
            tracing::debug!(container_id = %id, "rollback: no container to delete");
        }
        if layout.bundle_dir().exists() {
            let _ = std::fs::remove_dir_all(layout.bundle_dir());
        }
    }

    /// `stop`: idempotent — a missing container is a no-op success.
    pub async fn stop(&self, job: &str, config_path: &Path) -> Result<(), BpmError> {
        let (_cfg, layout) = self.load_and_resolve(job, config_path)?;
        let adapter = RuntimeAdapter::new(&layout);
        let id = layout.container_id();

        match adapter.state(&id).await {
            Err(BpmError::Runtime(RuntimeError::ContainerNotFound(_))) => return Ok(()),
            Err(e) => return Err(e),
            Ok(_) => {}
        }

        let lock = ProcessLock::acquire(&layout.lock_path(), LockMode::Exclusive)?;
        let result = self.stop_transaction(&layout, &adapter).await;
        drop(lock);
        result
    }

    async fn stop_transaction(&self, layout: &Layout, adapter: &RuntimeAdapter) -> Result<(), BpmError> {
        let id = layout.container_id();
        tracing::info!(
            event = events::STOP_STARTING,
            job = layout.job(),
            proc = layout.proc(),
            "stopping container"
        );

        self.escalate_to_stopped(&id, adapter).await;

        if adapter.delete(&id, false).await.is_err() {
            adapter.delete(&id, true).await?;
        }

        if layout.bundle_dir().exists() {
            std::fs::remove_dir_all(layout.bundle_dir()).map_err(|e| BpmError::io(layout.bundle_dir(), e))?;
        }
        pidfile::remove(layout)?;

        tracing::info!(
            event = events::STOP_COMPLETE,
            job = layout.job(),
            proc = layout.proc(),
            "container stopped"
        );
        Ok(())
    }

    /// SIGTERM → 15s grace → SIGQUIT → 5s grace → SIGKILL, polling `state`
    /// with exponential backoff bounded at [`timeouts::POLL_CEILING`].
    async fn escalate_to_stopped(&self, id: &str, adapter: &RuntimeAdapter) {
        let _ = adapter.kill(id, "TERM").await;
        if Self::wait_for_stopped(id, adapter, timeouts::STOP_GRACE).await {
            return;
        }

        let _ = adapter.kill(id, "QUIT").await;
        if Self::wait_for_stopped(id, adapter, timeouts::QUIT_GRACE).await {
            return;
        }

        let _ = adapter.kill(id, "KILL").await;
    }

    async fn wait_for_stopped(id: &str, adapter: &RuntimeAdapter, grace: std::time::Duration) -> bool {
        let deadline = Instant::now() + grace;
        let mut backoff = timeouts::POLL_FLOOR;

        loop {
            match adapter.state(id).await {
                Ok(ContainerState { status: ContainerStatus::Stopped, .. }) => return true,
                Err(BpmError::Runtime(RuntimeError::ContainerNotFound(_))) => return true,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(backoff.min(timeouts::POLL_CEILING)).await;
            backoff = (backoff * 2).min(timeouts::POLL_CEILING);
        }
    }

    /// `list`: one row per discovered bundle, `Status=failed` when the
    /// runtime has no matching state.
    pub async fn list(&self) -> Result<Vec<ListEntry>, BpmError> {
        let bundles = Layout::discover_bundles(&self.root).map_err(|e| BpmError::io(&self.root, e))?;
        let mut entries = Vec::with_capacity(bundles.len());

        for (job, proc) in bundles {
            let layout = Layout::new(self.root.as_path(), job, proc)?;
            let adapter = RuntimeAdapter::new(&layout);
            let entry = match adapter.state(&layout.container_id()).await {
                Ok(state) => ListEntry {
                    name: layout.container_id(),
                    pid: state.pid,
                    status: format!("{:?}", state.status).to_lowercase(),
                },
                Err(_) => ListEntry {
                    name: layout.container_id(),
                    pid: 0,
                    status: "failed".to_string(),
                },
            };
            entries.push(entry);
        }
        Ok(entries)
    }

    /// `pid`.
    pub async fn pid(&self, job: &str, config_path: &Path) -> Result<u32, BpmError> {
        let (_cfg, layout) = self.load_and_resolve(job, config_path)?;
        let _lock = ProcessLock::acquire(&layout.lock_path(), LockMode::Shared)?;
        let adapter = RuntimeAdapter::new(&layout);
        let state = adapter.state(&layout.container_id()).await?;

        if state.status != ContainerStatus::Running || state.pid <= 0 {
            return Err(BpmError::NoPid);
        }
        Ok(state.pid as u32)
    }

    /// `trace`: `strace -s 100 -p <pid> -f -y`, inheriting the user's
    /// controlling terminal.
    pub async fn trace(&self, job: &str, config_path: &Path) -> Result<std::process::ExitStatus, BpmError> {
        let pid = self.pid(job, config_path).await?;
        tokio::process::Command::new("strace")
            .args(["-s", "100", "-p", &pid.to_string(), "-f", "-y"])
            .status()
            .await
            .map_err(|e| BpmError::io("strace", e))
    }

    /// `shell`: `runtime.exec(id, ["/bin/bash"], tty=true)`.
    pub async fn shell(&self, job: &str, config_path: &Path) -> Result<std::process::ExitStatus, BpmError> {
        let (_cfg, layout) = self.load_and_resolve(job, config_path)?;
        let _lock = ProcessLock::acquire(&layout.lock_path(), LockMode::Shared)?;
        let adapter = RuntimeAdapter::new(&layout);
        let id = layout.container_id();

        let state = adapter.state(&id).await?;
        if state.status != ContainerStatus::Running {
            return Err(RuntimeError::ContainerNotFound(id).into());
        }

        adapter.exec(&id, &["/bin/bash".to_string()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn write_config(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join("bpm.yml");
        std::fs::write(
            &path,
            format!("name: {name}\nexecutable: /bin/true\nargs: []\n"),
        )
        .unwrap();
        path
    }

    fn install_fake_runc(root: &Path, script: &str) {
        let bin_dir = root.join("packages/bpm/bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let path = bin_dir.join("runc");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    #[tokio::test]
    async fn start_is_rejected_when_already_running() {
        let tmp = tempfile::tempdir().unwrap();
        install_fake_runc(
            tmp.path(),
            r#"echo '{"id":"nginx-web","status":"running","pid":10,"bundle":"/b"}'"#,
        );
        let config_path = write_config(&tmp, "web");
        let orchestrator = Orchestrator::new(tmp.path());

        let err = orchestrator.start("nginx", &config_path).await.unwrap_err();
        assert!(matches!(
            err,
            BpmError::Runtime(RuntimeError::AlreadyRunning(_))
        ));
    }

    #[tokio::test]
    async fn stop_on_nonexistent_container_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        install_fake_runc(
            tmp.path(),
            r#"echo "container nginx-web does not exist" 1>&2; exit 1"#,
        );
        let config_path = write_config(&tmp, "web");
        let orchestrator = Orchestrator::new(tmp.path());

        orchestrator.stop("nginx", &config_path).await.unwrap();
    }

    #[tokio::test]
    async fn list_is_empty_with_no_bundles() {
        let tmp = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(tmp.path());
        assert!(orchestrator.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pid_fails_with_no_pid_when_not_running() {
        let tmp = tempfile::tempdir().unwrap();
        install_fake_runc(
            tmp.path(),
            r#"echo '{"id":"nginx-web","status":"stopped","pid":0,"bundle":"/b"}'"#,
        );
        let config_path = write_config(&tmp, "web");
        let orchestrator = Orchestrator::new(tmp.path());

        let err = orchestrator.pid("nginx", &config_path).await.unwrap_err();
        assert!(matches!(err, BpmError::NoPid));
    }
}

//! Path Resolver: a pure function from `(BOSH root, job, process)` to every
//! well-known path BPM reads or writes. No I/O happens here; `Layout`
//! values are cheap to construct and compare.

use std::path::{Path, PathBuf};

use crate::constants::{dirs, filenames};
use crate::error::BpmError;

/// Validates that a job or process name is filesystem-safe: non-empty, no
/// path separators, no leading dot.
fn validate_name(name: &str) -> Result<(), BpmError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR)
    {
        return Err(BpmError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Every well-known filesystem location for one `(job, proc)` pair, rooted
/// under `BPM_BOSH_ROOT`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    job: String,
    proc: String,
}

impl Layout {
    /// Resolve the layout for `(job, proc)` under `root`. Fails with
    /// [`BpmError::InvalidName`] if either name is unsafe.
    pub fn new(root: impl Into<PathBuf>, job: impl Into<String>, proc: impl Into<String>) -> Result<Self, BpmError> {
        let job = job.into();
        let proc = proc.into();
        validate_name(&job)?;
        validate_name(&proc)?;
        Ok(Self {
            root: root.into(),
            job,
            proc,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn proc(&self) -> &str {
        &self.proc
    }

    /// The deterministic OCI runtime container ID: `"<job>-<proc>"`.
    pub fn container_id(&self) -> String {
        format!("{}-{}", self.job, self.proc)
    }

    /// `jobs/<job>/config/bpm.yml` — the operator's config file.
    pub fn default_config_path(&self) -> PathBuf {
        self.root
            .join(dirs::JOBS_DIR)
            .join(&self.job)
            .join(dirs::CONFIG_DIR)
            .join("bpm.yml")
    }

    /// `jobs/<job>` — bind-mounted read-only into the container.
    pub fn job_dir(&self) -> PathBuf {
        self.root.join(dirs::JOBS_DIR).join(&self.job)
    }

    /// `packages` — bind-mounted read-only into the container.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(dirs::PACKAGES_DIR)
    }

    /// `data/bpm/bundles/<job>/<proc>` — the OCI bundle directory.
    pub fn bundle_dir(&self) -> PathBuf {
        self.root
            .join(dirs::DATA_DIR)
            .join(dirs::BPM_DIR)
            .join(dirs::BUNDLES_DIR)
            .join(&self.job)
            .join(&self.proc)
    }

    /// `data/bpm/bundles/<job>/<proc>/config.json` — the OCI runtime spec.
    pub fn bundle_spec_path(&self) -> PathBuf {
        self.bundle_dir().join(filenames::BUNDLE_SPEC)
    }

    /// `data/bpm/runc` — the OCI runtime's own private `--root` state.
    pub fn runtime_state_dir(&self) -> PathBuf {
        self.root
            .join(dirs::DATA_DIR)
            .join(dirs::BPM_DIR)
            .join(dirs::RUNC_STATE_DIR)
    }

    /// `data/bpm/locks/<job>-<proc>.lock` — the advisory lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.root
            .join(dirs::DATA_DIR)
            .join(dirs::BPM_DIR)
            .join(dirs::LOCKS_DIR)
            .join(format!("{}.{}", self.container_id(), filenames::LOCK_SUFFIX))
    }

    /// `data/<job>/<proc>` — the writable per-process data store.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(dirs::DATA_DIR).join(&self.job).join(&self.proc)
    }

    /// `data/<job>/store` — the persistent-disk mount point, when enabled.
    pub fn persistent_store_dir(&self) -> PathBuf {
        self.root.join(dirs::DATA_DIR).join(&self.job).join(dirs::STORE_DIR)
    }

    /// `sys/log/<job>` — the job's shared log directory (bind-mounted into
    /// the container, so co-tenant processes may also write here).
    pub fn job_log_dir(&self) -> PathBuf {
        self.root.join(dirs::SYS_DIR).join(dirs::LOG_DIR).join(&self.job)
    }

    /// `sys/log/<job>/<proc>.out.log`
    pub fn stdout_log_path(&self) -> PathBuf {
        self.job_log_dir()
            .join(format!("{}.{}", self.proc, filenames::STDOUT_LOG_SUFFIX))
    }

    /// `sys/log/<job>/<proc>.err.log`
    pub fn stderr_log_path(&self) -> PathBuf {
        self.job_log_dir()
            .join(format!("{}.{}", self.proc, filenames::STDERR_LOG_SUFFIX))
    }

    /// `sys/run/bpm/<job>` — the pidfile's parent directory.
    pub fn run_dir(&self) -> PathBuf {
        self.root
            .join(dirs::SYS_DIR)
            .join(dirs::RUN_DIR)
            .join(dirs::BPM_DIR)
            .join(&self.job)
    }

    /// `sys/run/bpm/<job>/<proc>.pid`
    pub fn pid_path(&self) -> PathBuf {
        self.run_dir()
            .join(format!("{}.{}", self.proc, filenames::PID_SUFFIX))
    }

    /// Enumerate `(job, proc)` pairs for every bundle directory that
    /// currently exists under `data/bpm/bundles/*/*`. Used by `list`.
    pub fn discover_bundles(root: &Path) -> std::io::Result<Vec<(String, String)>> {
        let bundles_root = root.join(dirs::DATA_DIR).join(dirs::BPM_DIR).join(dirs::BUNDLES_DIR);
        let mut found = Vec::new();
        if !bundles_root.is_dir() {
            return Ok(found);
        }
        let mut job_dirs: Vec<_> = std::fs::read_dir(&bundles_root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        job_dirs.sort_by_key(|e| e.file_name());
        for job_entry in job_dirs {
            let job_name = job_entry.file_name().to_string_lossy().into_owned();
            let mut proc_dirs: Vec<_> = std::fs::read_dir(job_entry.path())?
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .collect();
            proc_dirs.sort_by_key(|e| e.file_name());
            for proc_entry in proc_dirs {
                let proc_name = proc_entry.file_name().to_string_lossy().into_owned();
                found.push((job_name.clone(), proc_name));
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_id_is_job_dash_proc() {
        let layout = Layout::new("/vcap", "nginx", "web").unwrap();
        assert_eq!(layout.container_id(), "nginx-web");
    }

    #[test]
    fn paths_are_rooted() {
        let layout = Layout::new("/vcap", "nginx", "web").unwrap();
        assert_eq!(
            layout.bundle_dir(),
            PathBuf::from("/vcap/data/bpm/bundles/nginx/web")
        );
        assert_eq!(
            layout.pid_path(),
            PathBuf::from("/vcap/sys/run/bpm/nginx/web.pid")
        );
        assert_eq!(
            layout.stdout_log_path(),
            PathBuf::from("/vcap/sys/log/nginx/web.out.log")
        );
        assert_eq!(
            layout.lock_path(),
            PathBuf::from("/vcap/data/bpm/locks/nginx-web.lock")
        );
    }

    #[test]
    fn rejects_path_separators() {
        assert!(Layout::new("/vcap", "nginx/evil", "web").is_err());
        assert!(Layout::new("/vcap", "nginx", "../web").is_err());
    }

    #[test]
    fn rejects_empty_and_dotted_names() {
        assert!(Layout::new("/vcap", "", "web").is_err());
        assert!(Layout::new("/vcap", "nginx", ".web").is_err());
    }

    #[test]
    fn discover_bundles_finds_nested_job_proc_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("data/bpm/bundles/nginx/web")).unwrap();
        std::fs::create_dir_all(root.join("data/bpm/bundles/redis/server")).unwrap();

        let mut found = Layout::discover_bundles(root).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("nginx".to_string(), "web".to_string()),
                ("redis".to_string(), "server".to_string()),
            ]
        );
    }

    #[test]
    fn discover_bundles_empty_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Layout::discover_bundles(tmp.path()).unwrap().is_empty());
    }
}

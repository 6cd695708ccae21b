//! Config Loader & Validator: reads one YAML document and yields a
//! validated in-memory [`ProcessConfig`]. No side effects on disk.

pub(crate) mod capabilities;
mod limits;

pub use capabilities::validate_capability_name;
pub use limits::{parse_memory, Limits};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BpmError, ConfigError};

/// One extra bind mount requested by the operator, under the BOSH root.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AdditionalVolume {
    pub path: PathBuf,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub allow_executable: bool,
}

/// Operator-provided lifecycle hooks.
#[derive(Clone, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Hooks {
    pub pre_start: Option<PathBuf>,
}

/// The raw, on-disk shape of a `bpm.yml` document. Kept separate from
/// [`ProcessConfig`] so that validation and canonicalisation (env
/// dedup/ordering, memory parsing) happen in one place after parsing.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProcessConfig {
    name: String,
    executable: PathBuf,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: Vec<String>,
    #[serde(default)]
    working_dir: Option<PathBuf>,
    #[serde(default)]
    limits: Option<limits::RawLimits>,
    #[serde(default)]
    additional_volumes: Vec<AdditionalVolume>,
    #[serde(default)]
    hooks: Option<Hooks>,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    persistent_disk: bool,
}

/// A validated, canonical process configuration, ready to drive the Bundle
/// Builder.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessConfig {
    pub name: String,
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Stable-ordered, de-duplicated (last occurrence wins) `KEY=VALUE`
    /// environment entries.
    pub env: Vec<String>,
    pub working_dir: PathBuf,
    pub limits: Option<Limits>,
    pub additional_volumes: Vec<AdditionalVolume>,
    pub hooks: Hooks,
    pub capabilities: Vec<String>,
    pub persistent_disk: bool,
}

/// Read and validate the YAML document at `path`. `root` is the BOSH root
/// that every non-`executable` path field must resolve under.
pub fn load(path: &Path, root: &Path) -> Result<ProcessConfig, BpmError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }

    let text = std::fs::read_to_string(path).map_err(|e| BpmError::io(path, e))?;
    let raw: RawProcessConfig = serde_yaml::from_str(&text).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    validate(raw, root)
}

/// Apply field-level validation and canonicalisation to a parsed document.
/// `root` bounds every path field except `executable`, which names a path
/// inside the container rather than on the BOSH root filesystem.
fn validate(raw: RawProcessConfig, root: &Path) -> Result<ProcessConfig, BpmError> {
    if raw.name.trim().is_empty() {
        return Err(invalid("name", "must not be empty"));
    }
    if raw.executable.as_os_str().is_empty() {
        return Err(invalid("executable", "must not be empty"));
    }
    if !raw.executable.is_absolute() {
        return Err(invalid(
            "executable",
            "must be an absolute path inside the container",
        ));
    }

    for cap in &raw.capabilities {
        validate_capability_name(cap).map_err(|reason| invalid("capabilities", &reason))?;
    }

    for volume in &raw.additional_volumes {
        if !volume.path.is_absolute() {
            return Err(invalid(
                "additional_volumes",
                &format!("path {} must be absolute", volume.path.display()),
            ));
        }
        if !volume.path.starts_with(root) {
            return Err(invalid(
                "additional_volumes",
                &format!("path {} must lie under the BOSH root", volume.path.display()),
            ));
        }
    }

    if let Some(hooks) = &raw.hooks {
        if let Some(pre_start) = &hooks.pre_start {
            if !pre_start.is_absolute() {
                return Err(invalid(
                    "hooks.pre_start",
                    "must be an absolute path to a script",
                ));
            }
            if !pre_start.starts_with(root) {
                return Err(invalid(
                    "hooks.pre_start",
                    &format!("path {} must lie under the BOSH root", pre_start.display()),
                ));
            }
        }
    }

    let limits = raw.limits.map(limits::Limits::from_raw).transpose()?;

    Ok(ProcessConfig {
        name: raw.name,
        executable: raw.executable,
        args: raw.args,
        env: canonicalise_env(raw.env),
        working_dir: raw.working_dir.unwrap_or_else(|| PathBuf::from("/")),
        limits,
        additional_volumes: raw.additional_volumes,
        hooks: raw.hooks.unwrap_or_default(),
        capabilities: raw.capabilities,
        persistent_disk: raw.persistent_disk,
    })
}

/// Stable order, de-duplicate `KEY=VALUE` entries by key, last occurrence
/// wins. Keys without an `=` are rejected-as-kept verbatim is avoided by
/// requiring the `KEY=VALUE` shape upstream; here we only canonicalise.
fn canonicalise_env(env: Vec<String>) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut values: BTreeMap<String, String> = BTreeMap::new();

    for entry in env {
        let key = entry.split('=').next().unwrap_or(&entry).to_string();
        if !values.contains_key(&key) {
            order.push(key.clone());
        }
        values.insert(key, entry);
    }

    order.into_iter().map(|key| values.remove(&key).unwrap()).collect()
}

fn invalid(field: &str, reason: &str) -> BpmError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("bpm.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    /// A BOSH root broad enough that every fixture's in-root paths
    /// (`/vcap/...`) resolve under it, while `/etc/...` stays outside.
    fn test_root() -> PathBuf {
        PathBuf::from("/vcap")
    }

    #[test]
    fn loads_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
args: ["-c", "echo hi"]
env: ["FOO=BAR"]
"#,
        );
        let cfg = load(&path, &test_root()).unwrap();
        assert_eq!(cfg.name, "server");
        assert_eq!(cfg.executable, PathBuf::from("/bin/bash"));
        assert_eq!(cfg.args, vec!["-c", "echo hi"]);
        assert_eq!(cfg.env, vec!["FOO=BAR"]);
        assert_eq!(cfg.working_dir, PathBuf::from("/"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load(Path::new("/nonexistent/bpm.yml"), &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn rejects_unknown_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
bogus_key: true
"#,
        );
        let err = load(&path, &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::Malformed { .. })));
    }

    #[test]
    fn rejects_unknown_limits_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
limits:
  memory: 4M
  bogus: 1
"#,
        );
        let err = load(&path, &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::Malformed { .. })));
    }

    #[test]
    fn rejects_relative_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(&dir, "name: server\nexecutable: bash\n");
        let err = load(&path, &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn env_canonicalisation_keeps_last_occurrence_stable_order() {
        let env = vec![
            "A=1".to_string(),
            "B=2".to_string(),
            "A=3".to_string(),
        ];
        let canonical = canonicalise_env(env);
        assert_eq!(canonical, vec!["A=3".to_string(), "B=2".to_string()]);
    }

    #[test]
    fn rejects_non_absolute_additional_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
additional_volumes:
  - path: relative/path
    writable: true
"#,
        );
        let err = load(&path, &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_additional_volume_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
additional_volumes:
  - path: /etc/shadow
    writable: true
"#,
        );
        let err = load(&path, &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_pre_start_hook_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
hooks:
  pre_start: /etc/passwd
"#,
        );
        let err = load(&path, &test_root()).unwrap_err();
        assert!(matches!(err, BpmError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn accepts_additional_volume_and_hook_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: server
executable: /bin/bash
additional_volumes:
  - path: /vcap/data/server/extra
    writable: true
hooks:
  pre_start: /vcap/jobs/server/bin/pre-start
"#,
        );
        let cfg = load(&path, &test_root()).unwrap();
        assert_eq!(
            cfg.additional_volumes[0].path,
            PathBuf::from("/vcap/data/server/extra")
        );
        assert_eq!(
            cfg.hooks.pre_start,
            Some(PathBuf::from("/vcap/jobs/server/bin/pre-start"))
        );
    }
}

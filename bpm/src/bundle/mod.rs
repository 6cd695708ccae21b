//! Bundle Builder: materialises the OCI bundle directory (`config.json`)
//! that the Runtime Adapter hands to `runc create`.

mod spec;

use std::io::Write;
use std::os::unix::fs::PermissionsExt;

use crate::config::ProcessConfig;
use crate::error::BpmError;
use crate::layout::Layout;

/// Build the bundle for `config` at `layout`'s bundle directory: create the
/// directory (mode 0700) and the writable mounts it declares, then write
/// `config.json` atomically (write-temp-then-rename).
pub fn build(layout: &Layout, config: &ProcessConfig) -> Result<(), BpmError> {
    let bundle_dir = layout.bundle_dir();
    create_dir(&bundle_dir, 0o700)?;
    create_dir(&layout.data_dir(), 0o700)?;
    if config.persistent_disk {
        create_dir(&layout.persistent_store_dir(), 0o700)?;
    }

    let oci_spec = spec::build_spec(layout, config)?;
    write_spec_atomically(&layout.bundle_spec_path(), &oci_spec)
}

fn create_dir(path: &std::path::Path, mode: u32) -> Result<(), BpmError> {
    std::fs::create_dir_all(path).map_err(|e| BpmError::io(path, e))?;
    let mut perms = std::fs::metadata(path).map_err(|e| BpmError::io(path, e))?.permissions();
    perms.set_mode(mode);
    std::fs::set_permissions(path, perms).map_err(|e| BpmError::io(path, e))
}

fn write_spec_atomically(path: &std::path::Path, oci_spec: &oci_spec::runtime::Spec) -> Result<(), BpmError> {
    let json = serde_json::to_vec_pretty(oci_spec)
        .map_err(|e| BpmError::Bundle(format!("failed to serialise oci spec: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut tmp_file = std::fs::File::create(&tmp_path).map_err(|e| BpmError::io(&tmp_path, e))?;
        tmp_file.write_all(&json).map_err(|e| BpmError::io(&tmp_path, e))?;
        tmp_file.sync_all().map_err(|e| BpmError::io(&tmp_path, e))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| BpmError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_config() -> ProcessConfig {
        ProcessConfig {
            name: "web".to_string(),
            executable: PathBuf::from("/bin/bash"),
            args: vec!["-c".to_string(), "echo hi".to_string()],
            env: vec!["FOO=BAR".to_string()],
            working_dir: PathBuf::from("/"),
            limits: None,
            additional_volumes: Vec::new(),
            hooks: Default::default(),
            capabilities: Vec::new(),
            persistent_disk: false,
        }
    }

    #[test]
    fn writes_config_json_atomically() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path(), "nginx", "web").unwrap();
        build(&layout, &sample_config()).unwrap();

        assert!(layout.bundle_spec_path().exists());
        assert!(!layout.bundle_dir().join("config.json.tmp").exists());

        let mode = std::fs::metadata(layout.bundle_dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn bundle_spec_has_empty_capabilities_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path(), "nginx", "web").unwrap();
        build(&layout, &sample_config()).unwrap();

        let contents = std::fs::read_to_string(layout.bundle_spec_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let bounding = value["process"]["capabilities"]["bounding"].as_array().unwrap();
        assert!(bounding.is_empty());
    }

    #[test]
    fn persistent_disk_creates_store_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path(), "nginx", "web").unwrap();
        let mut config = sample_config();
        config.persistent_disk = true;
        build(&layout, &config).unwrap();

        assert!(layout.persistent_store_dir().exists());
    }
}

//! Translates a validated [`ProcessConfig`] and its [`Layout`] into an OCI
//! runtime specification: a `SpecBuilder` composed from smaller
//! per-section builders.

use oci_spec::runtime::{
    Hook, HookBuilder, Hooks, HooksBuilder, Linux, LinuxBuilder, LinuxCapabilities,
    LinuxCapabilitiesBuilder, LinuxMemoryBuilder, LinuxNamespace, LinuxNamespaceBuilder,
    LinuxNamespaceType, LinuxResources, LinuxResourcesBuilder, Mount, MountBuilder,
    PosixRlimit, PosixRlimitBuilder, PosixRlimitType, Process, ProcessBuilder, Root, RootBuilder,
    Spec, SpecBuilder, UserBuilder,
};

use crate::config::ProcessConfig;
use crate::error::BpmError;
use crate::layout::Layout;

fn bundle_error(context: &str, err: impl std::fmt::Display) -> BpmError {
    BpmError::Bundle(format!("{context}: {err}"))
}

/// Build the full OCI runtime spec for `config`'s primary process,
/// resolved against `layout`.
pub fn build_spec(layout: &Layout, config: &ProcessConfig) -> Result<Spec, BpmError> {
    let capabilities = build_capabilities(config)?;
    let namespaces = build_namespaces()?;
    let resources = build_resources(config)?;
    let rlimits = build_rlimits(config)?;
    let mounts = build_mounts(layout, config)?;

    let process = build_process(layout, config, capabilities, rlimits)?;
    let root = build_root()?;
    let linux = build_linux(namespaces, resources)?;

    let mut builder = SpecBuilder::default()
        .version("1.0.2")
        .hostname(layout.job())
        .root(root)
        .mounts(mounts)
        .process(process)
        .linux(linux);

    if let Some(hooks) = build_hooks(config)? {
        builder = builder.hooks(hooks);
    }

    builder.build().map_err(|e| bundle_error("failed to build oci spec", e))
}

/// All five capability sets start empty; anything in `config.capabilities`
/// is retained identically across bounding/effective/inheritable/permitted/
/// ambient, per the closed-by-default policy.
fn build_capabilities(config: &ProcessConfig) -> Result<LinuxCapabilities, BpmError> {
    let caps: std::collections::HashSet<_> = config
        .capabilities
        .iter()
        .map(|name| {
            crate::config::capabilities::lookup(name)
                .expect("capability names are validated at config load time")
        })
        .collect();

    LinuxCapabilitiesBuilder::default()
        .bounding(caps.clone())
        .effective(caps.clone())
        .inheritable(caps.clone())
        .permitted(caps.clone())
        .ambient(caps)
        .build()
        .map_err(|e| bundle_error("failed to build capabilities", e))
}

fn build_namespaces() -> Result<Vec<LinuxNamespace>, BpmError> {
    [
        LinuxNamespaceType::Pid,
        LinuxNamespaceType::Ipc,
        LinuxNamespaceType::Uts,
        LinuxNamespaceType::Mount,
    ]
    .into_iter()
    .map(|typ| {
        LinuxNamespaceBuilder::default()
            .typ(typ)
            .build()
            .map_err(|e| bundle_error("failed to build namespace", e))
    })
    .collect()
}

/// `limits.memory` becomes a cgroup memory limit with swap capped to the
/// same value (no swap beyond configured RAM). Absent without a memory
/// limit.
fn build_resources(config: &ProcessConfig) -> Result<Option<LinuxResources>, BpmError> {
    let Some(limits) = &config.limits else {
        return Ok(None);
    };
    let Some(memory_bytes) = limits.memory_bytes else {
        return Ok(None);
    };

    let limit = memory_bytes as i64;
    let memory = LinuxMemoryBuilder::default()
        .limit(limit)
        .swap(limit)
        .build()
        .map_err(|e| bundle_error("failed to build memory limits", e))?;

    let resources = LinuxResourcesBuilder::default()
        .memory(memory)
        .build()
        .map_err(|e| bundle_error("failed to build resource limits", e))?;

    Ok(Some(resources))
}

/// `limits.open_files` → `RLIMIT_NOFILE`, `limits.processes` → `RLIMIT_NPROC`.
/// Unconfigured limits are left to the runtime's own defaults.
fn build_rlimits(config: &ProcessConfig) -> Result<Vec<PosixRlimit>, BpmError> {
    let Some(limits) = &config.limits else {
        return Ok(Vec::new());
    };

    let mut rlimits = Vec::new();
    if let Some(open_files) = limits.open_files {
        rlimits.push(
            PosixRlimitBuilder::default()
                .typ(PosixRlimitType::RlimitNofile)
                .hard(open_files)
                .soft(open_files)
                .build()
                .map_err(|e| bundle_error("failed to build RLIMIT_NOFILE", e))?,
        );
    }
    if let Some(processes) = limits.processes {
        rlimits.push(
            PosixRlimitBuilder::default()
                .typ(PosixRlimitType::RlimitNproc)
                .hard(processes)
                .soft(processes)
                .build()
                .map_err(|e| bundle_error("failed to build RLIMIT_NPROC", e))?,
        );
    }
    Ok(rlimits)
}

fn build_process(
    layout: &Layout,
    config: &ProcessConfig,
    capabilities: LinuxCapabilities,
    rlimits: Vec<PosixRlimit>,
) -> Result<Process, BpmError> {
    let mut args = Vec::with_capacity(config.args.len() + 1);
    args.push(config.executable.to_string_lossy().into_owned());
    args.extend(config.args.iter().cloned());

    let cwd = config.working_dir.to_string_lossy().into_owned();

    let user = UserBuilder::default()
        .uid(0u32)
        .gid(0u32)
        .build()
        .map_err(|e| bundle_error("failed to build process user", e))?;

    let _ = layout; // container identity is carried by the bundle directory, not the process spec

    ProcessBuilder::default()
        .terminal(false)
        .user(user)
        .args(args)
        .env(config.env.clone())
        .cwd(cwd)
        .capabilities(capabilities)
        .rlimits(rlimits)
        .no_new_privileges(true)
        .build()
        .map_err(|e| bundle_error("failed to build process spec", e))
}

/// The container shares the host's root filesystem, read-only; writable
/// deviations are expressed as explicit mounts below rather than copying
/// or unpacking an image.
fn build_root() -> Result<Root, BpmError> {
    RootBuilder::default()
        .path("/")
        .readonly(true)
        .build()
        .map_err(|e| bundle_error("failed to build root spec", e))
}

fn build_linux(
    namespaces: Vec<LinuxNamespace>,
    resources: Option<LinuxResources>,
) -> Result<Linux, BpmError> {
    let mut builder = LinuxBuilder::default().namespaces(namespaces);
    if let Some(resources) = resources {
        builder = builder.resources(resources);
    }
    builder.build().map_err(|e| bundle_error("failed to build linux spec", e))
}

/// An identity bind mount: since the container's root is the host's own
/// root, `destination` and `source` are the same path, with mount options
/// overriding the read-only default for a specific subtree.
fn bind_mount(path: &std::path::Path, options: Vec<String>) -> Result<Mount, BpmError> {
    let path_str = path.to_str().ok_or_else(|| {
        BpmError::Bundle(format!("bundle path {} is not valid UTF-8", path.display()))
    })?;

    MountBuilder::default()
        .destination(path_str)
        .typ("bind")
        .source(path_str)
        .options(options)
        .build()
        .map_err(|e| bundle_error(&format!("failed to build mount for {path_str}"), e))
}

fn build_mounts(layout: &Layout, config: &ProcessConfig) -> Result<Vec<Mount>, BpmError> {
    let mut mounts = vec![
        MountBuilder::default()
            .destination("/proc")
            .typ("proc")
            .source("proc")
            .build()
            .map_err(|e| bundle_error("failed to build /proc mount", e))?,
        MountBuilder::default()
            .destination("/tmp")
            .typ("tmpfs")
            .source("tmpfs")
            .options(vec!["nosuid".to_string(), "nodev".to_string()])
            .build()
            .map_err(|e| bundle_error("failed to build /tmp mount", e))?,
        MountBuilder::default()
            .destination("/var/tmp")
            .typ("tmpfs")
            .source("tmpfs")
            .options(vec!["nosuid".to_string(), "nodev".to_string()])
            .build()
            .map_err(|e| bundle_error("failed to build /var/tmp mount", e))?,
    ];

    mounts.push(bind_mount(
        &layout.job_log_dir(),
        vec!["bind".to_string(), "rw".to_string()],
    )?);
    mounts.push(bind_mount(
        &layout.data_dir(),
        vec!["bind".to_string(), "rw".to_string()],
    )?);
    mounts.push(bind_mount(
        &layout.job_dir(),
        vec!["bind".to_string(), "ro".to_string()],
    )?);
    mounts.push(bind_mount(
        &layout.packages_dir(),
        vec!["bind".to_string(), "ro".to_string()],
    )?);

    for etc_file in ["/etc/resolv.conf", "/etc/hosts", "/etc/nsswitch.conf"] {
        mounts.push(
            MountBuilder::default()
                .destination(etc_file)
                .typ("bind")
                .source(etc_file)
                .options(vec!["bind".to_string(), "ro".to_string()])
                .build()
                .map_err(|e| bundle_error(&format!("failed to build {etc_file} mount"), e))?,
        );
    }

    if config.persistent_disk {
        mounts.push(bind_mount(
            &layout.persistent_store_dir(),
            vec!["bind".to_string(), "rw".to_string()],
        )?);
    }

    for volume in &config.additional_volumes {
        let mut options = vec!["bind".to_string()];
        options.push(if volume.writable { "rw".to_string() } else { "ro".to_string() });
        if !volume.allow_executable {
            options.push("noexec".to_string());
        }
        mounts.push(bind_mount(&volume.path, options)?);
    }

    Ok(mounts)
}

/// `hooks.pre_start` becomes a single OCI `hooks.prestart` entry, invoking
/// the script with the supervised process's environment.
fn build_hooks(config: &ProcessConfig) -> Result<Option<Hooks>, BpmError> {
    let Some(pre_start) = &config.hooks.pre_start else {
        return Ok(None);
    };

    let path_str = pre_start.to_string_lossy().into_owned();
    let hook: Hook = HookBuilder::default()
        .path(path_str.clone())
        .args(vec![path_str])
        .env(config.env.clone())
        .build()
        .map_err(|e| bundle_error("failed to build prestart hook", e))?;

    let hooks = HooksBuilder::default()
        .prestart(vec![hook])
        .build()
        .map_err(|e| bundle_error("failed to build hooks", e))?;

    Ok(Some(hooks))
}

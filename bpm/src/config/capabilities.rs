//! The closed set of Linux capability names BPM will accept in
//! `capabilities:`, and their mapping onto [`oci_spec::runtime::Capability`].
//!
//! Single source of truth for both the Config Validator and the Bundle
//! Builder. One authoritative capability table avoids re-deriving it at
//! each call site.

use oci_spec::runtime::Capability;

/// Map an operator-supplied capability name (`"CAP_NET_BIND_SERVICE"`) onto
/// its [`Capability`] variant, or `None` if it is not a recognised Linux
/// capability.
pub fn lookup(name: &str) -> Option<Capability> {
    Some(match name {
        "CAP_CHOWN" => Capability::Chown,
        "CAP_DAC_OVERRIDE" => Capability::DacOverride,
        "CAP_DAC_READ_SEARCH" => Capability::DacReadSearch,
        "CAP_FOWNER" => Capability::Fowner,
        "CAP_FSETID" => Capability::Fsetid,
        "CAP_KILL" => Capability::Kill,
        "CAP_SETGID" => Capability::Setgid,
        "CAP_SETUID" => Capability::Setuid,
        "CAP_SETPCAP" => Capability::Setpcap,
        "CAP_LINUX_IMMUTABLE" => Capability::LinuxImmutable,
        "CAP_NET_BIND_SERVICE" => Capability::NetBindService,
        "CAP_NET_BROADCAST" => Capability::NetBroadcast,
        "CAP_NET_ADMIN" => Capability::NetAdmin,
        "CAP_NET_RAW" => Capability::NetRaw,
        "CAP_IPC_LOCK" => Capability::IpcLock,
        "CAP_IPC_OWNER" => Capability::IpcOwner,
        "CAP_SYS_MODULE" => Capability::SysModule,
        "CAP_SYS_RAWIO" => Capability::SysRawio,
        "CAP_SYS_CHROOT" => Capability::SysChroot,
        "CAP_SYS_PTRACE" => Capability::SysPtrace,
        "CAP_SYS_PACCT" => Capability::SysPacct,
        "CAP_SYS_ADMIN" => Capability::SysAdmin,
        "CAP_SYS_BOOT" => Capability::SysBoot,
        "CAP_SYS_NICE" => Capability::SysNice,
        "CAP_SYS_RESOURCE" => Capability::SysResource,
        "CAP_SYS_TIME" => Capability::SysTime,
        "CAP_SYS_TTY_CONFIG" => Capability::SysTtyConfig,
        "CAP_MKNOD" => Capability::Mknod,
        "CAP_LEASE" => Capability::Lease,
        "CAP_AUDIT_WRITE" => Capability::AuditWrite,
        "CAP_AUDIT_CONTROL" => Capability::AuditControl,
        "CAP_SETFCAP" => Capability::Setfcap,
        "CAP_MAC_OVERRIDE" => Capability::MacOverride,
        "CAP_MAC_ADMIN" => Capability::MacAdmin,
        "CAP_SYSLOG" => Capability::Syslog,
        "CAP_WAKE_ALARM" => Capability::WakeAlarm,
        "CAP_BLOCK_SUSPEND" => Capability::BlockSuspend,
        "CAP_AUDIT_READ" => Capability::AuditRead,
        "CAP_PERFMON" => Capability::Perfmon,
        "CAP_BPF" => Capability::Bpf,
        "CAP_CHECKPOINT_RESTORE" => Capability::CheckpointRestore,
        _ => return None,
    })
}

/// Validate that `name` is a recognised Linux capability name.
pub fn validate_capability_name(name: &str) -> Result<(), String> {
    if lookup(name).is_some() {
        Ok(())
    } else {
        Err(format!("unrecognised capability {:?}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_capabilities() {
        assert!(validate_capability_name("CAP_NET_BIND_SERVICE").is_ok());
        assert!(validate_capability_name("CAP_CHECKPOINT_RESTORE").is_ok());
    }

    #[test]
    fn rejects_unknown_capabilities() {
        assert!(validate_capability_name("CAP_MADE_UP").is_err());
        assert!(validate_capability_name("net_bind_service").is_err());
    }
}

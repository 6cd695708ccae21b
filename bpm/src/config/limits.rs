//! Resource limit parsing: `limits.memory` human-size strings and the raw
//! integer limits, validated and normalised into [`Limits`].

use serde::Deserialize;

use crate::error::{BpmError, ConfigError};

/// On-disk shape of the `limits:` block.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RawLimits {
    pub memory: Option<String>,
    pub open_files: Option<u64>,
    pub processes: Option<u64>,
}

/// Validated resource limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Memory limit in bytes, parsed from a human-size string.
    pub memory_bytes: Option<u64>,
    pub open_files: Option<u64>,
    pub processes: Option<u64>,
}

impl Limits {
    pub(super) fn from_raw(raw: RawLimits) -> Result<Self, BpmError> {
        let memory_bytes = raw
            .memory
            .as_deref()
            .map(parse_memory)
            .transpose()
            .map_err(|reason| {
                BpmError::Config(ConfigError::Invalid {
                    field: "limits.memory".to_string(),
                    reason,
                })
            })?;

        Ok(Limits {
            memory_bytes,
            open_files: raw.open_files,
            processes: raw.processes,
        })
    }
}

/// Parse a human-size string (`"4M"`, `"512K"`, `"2G"`, or a bare byte
/// count) into bytes. Suffixes are case-insensitive and base-1024.
pub fn parse_memory(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("memory limit must not be empty".to_string());
    }

    let (digits, multiplier) = match trimmed.chars().last() {
        Some(c) if c.eq_ignore_ascii_case(&'k') => (&trimmed[..trimmed.len() - 1], 1024u64),
        Some(c) if c.eq_ignore_ascii_case(&'m') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some(c) if c.eq_ignore_ascii_case(&'g') => {
            (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024)
        }
        Some(c) if c.is_ascii_digit() => (trimmed, 1),
        _ => return Err(format!("invalid memory limit {:?}", input)),
    };

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid memory limit {:?}", input))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("memory limit {:?} overflows", input))
}

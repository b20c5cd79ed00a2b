//! Minimal semantic checks on a composed configuration.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::name::validate_identifier;

/// Architectures a template may target.
pub const KNOWN_ARCHES: &[&str] = &["x86_64", "aarch64", "armv7l", "ppc64le", "riscv64", "s390x"];

/// Supported virtual machine drivers.
pub const KNOWN_VM_TYPES: &[&str] = &["qemu", "vz", "wsl2"];

/// Provisioning modes understood by the guest agent.
pub const KNOWN_PROVISION_MODES: &[&str] = &["system", "user", "boot", "dependency", "data"];

/// Checks `config`, read from `locator`, for values no instance could use.
///
/// Fields left unset are fine; only explicit values are checked, except
/// `images`, which every instance needs.
pub fn validate(locator: &str, config: &Config) -> Result<()> {
    let invalid = |message: String| Error::Validation {
        locator: locator.to_string(),
        message,
    };

    if config.images.is_empty() {
        return Err(invalid("field `images` must be set".to_string()));
    }
    for (i, image) in config.images.iter().enumerate() {
        if image.location.is_empty() {
            return Err(invalid(format!("field `images[{}].location` must be set", i)));
        }
        if let Some(arch) = &image.arch {
            check_known("images[].arch", arch, KNOWN_ARCHES).map_err(&invalid)?;
        }
    }
    if config.cpus == Some(0) {
        return Err(invalid("field `cpus` must be greater than 0".to_string()));
    }
    if let Some(arch) = &config.arch {
        check_known("arch", arch, KNOWN_ARCHES).map_err(&invalid)?;
    }
    if let Some(vm_type) = &config.vm_type {
        check_known("vmType", vm_type, KNOWN_VM_TYPES).map_err(&invalid)?;
    }
    for disk in &config.additional_disks {
        validate_identifier(&disk.name)
            .map_err(|e| invalid(format!("field `additionalDisks[].name`: {}", e)))?;
    }
    for (i, mount) in config.mounts.iter().enumerate() {
        if mount.location.is_empty() {
            return Err(invalid(format!("field `mounts[{}].location` must be set", i)));
        }
    }
    for (i, provision) in config.provision.iter().enumerate() {
        if let Some(mode) = &provision.mode {
            check_known("provision[].mode", mode, KNOWN_PROVISION_MODES).map_err(&invalid)?;
        }
        if provision.script.is_none() && provision.file.is_none() {
            return Err(invalid(format!(
                "field `provision[{}]` needs either `script` or `file`",
                i
            )));
        }
    }
    Ok(())
}

fn check_known(field: &str, value: &str, known: &[&str]) -> std::result::Result<(), String> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "field `{}` must be one of {:?}; got {:?}",
            field, known, value
        ))
    }
}

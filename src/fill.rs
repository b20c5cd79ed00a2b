//! # Default Filling
//!
//! Fill mode turns a composed template into the configuration an instance
//! would actually run with:
//!
//! 1. the optional `override.yaml` document is merged on top (its values
//!    win over the template's),
//! 2. the optional `default.yaml` document is merged underneath,
//! 3. every omittable field still unset gets its built-in default
//!    ([`builtin_defaults`], merged underneath like another document),
//! 4. `{{.Dir}}` and `{{.Name}}` placeholders in mount locations and
//!    port-forward host sockets are expanded.
//!
//! Override and default documents are ordinary templates as far as fetching
//! and decoding go; their own `base` fields are ignored.

use std::path::{Path, PathBuf};

use log::debug;
use serde_yaml::Value as YamlValue;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, Containerd, Ssh};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::merge::{merge_underneath, without_base};
use crate::template::Template;

/// Default number of virtual CPUs, capped by the host.
pub const DEFAULT_CPUS: u32 = 4;
pub const DEFAULT_MEMORY: &str = "4GiB";
pub const DEFAULT_DISK: &str = "100GiB";
pub const DEFAULT_OS: &str = "Linux";

/// Where the filled instance lives and which site-wide documents apply.
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    /// Directory the instance would be created in.
    pub instance_dir: PathBuf,
    /// Document merged over the composed template, if it exists.
    pub override_locator: Option<String>,
    /// Document merged under the composed template, if it exists.
    pub default_locator: Option<String>,
}

/// Applies overrides, defaults and placeholder expansion to `tmpl`.
pub async fn fill(
    fetcher: &Fetcher,
    cancel: &CancellationToken,
    tmpl: &mut Template,
    options: &FillOptions,
) -> Result<()> {
    tmpl.config()?;
    let mut document = without_base(tmpl.document()?);

    if let Some(mut over) = read_optional(fetcher, cancel, options.override_locator.as_deref()).await? {
        merge_underneath(&mut over, document, "");
        document = over;
    }
    if let Some(defaults) = read_optional(fetcher, cancel, options.default_locator.as_deref()).await? {
        merge_underneath(&mut document, defaults, "");
    }

    let vm_type = document.get("vmType").and_then(YamlValue::as_str);
    let builtin = serde_yaml::to_value(builtin_defaults(vm_type)).map_err(|e| Error::Serialization {
        message: e.to_string(),
    })?;
    merge_underneath(&mut document, builtin, "");
    expand_placeholders(&mut document, &options.instance_dir, &tmpl.name);

    tmpl.set_document(&document)?;
    tmpl.config()?;
    Ok(())
}

/// A configuration holding the built-in value of every omittable field.
///
/// The mount type depends on `vm_type`; without one the host's default VM
/// type is assumed.
pub fn builtin_defaults(vm_type: Option<&str>) -> Config {
    let vm_type = vm_type.unwrap_or_else(|| default_vm_type());
    Config {
        vm_type: Some(vm_type.to_string()),
        os: Some(DEFAULT_OS.to_string()),
        arch: Some(host_arch().to_string()),
        cpus: Some(default_cpus()),
        memory: Some(DEFAULT_MEMORY.to_string()),
        disk: Some(DEFAULT_DISK.to_string()),
        mount_type: Some(default_mount_type(vm_type).to_string()),
        ssh: Some(Ssh {
            local_port: Some(0),
            load_dot_ssh_pub_keys: Some(false),
            forward_agent: Some(false),
        }),
        containerd: Some(Containerd {
            system: Some(false),
            user: Some(true),
        }),
        ..Default::default()
    }
}

/// Replaces `{{.Dir}}` and `{{.Name}}` with the instance directory and name
/// in mount locations, mount points and port-forward host sockets.
pub fn expand_placeholders(document: &mut YamlValue, instance_dir: &Path, name: &str) {
    let dir = instance_dir.to_string_lossy();
    let expand = |value: &mut YamlValue| {
        if let YamlValue::String(s) = value {
            *s = s.replace("{{.Dir}}", &dir).replace("{{.Name}}", name);
        }
    };

    let fields = [("mounts", "location"), ("mounts", "mountPoint"), ("portForwards", "hostSocket")];
    for (list, field) in fields {
        if let Some(YamlValue::Sequence(entries)) = document.get_mut(list) {
            for entry in entries {
                if let Some(value) = entry.get_mut(field) {
                    expand(value);
                }
            }
        }
    }
}

pub fn default_vm_type() -> &'static str {
    if cfg!(target_os = "macos") {
        "vz"
    } else {
        "qemu"
    }
}

fn default_mount_type(vm_type: &str) -> &'static str {
    match vm_type {
        "vz" => "virtiofs",
        "wsl2" => "wsl2",
        _ => "9p",
    }
}

/// Host architecture in the spelling templates use.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "arm" => "armv7l",
        "powerpc64" => "ppc64le",
        other => other,
    }
}

fn default_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| (n.get() as u32).min(DEFAULT_CPUS))
        .unwrap_or(DEFAULT_CPUS)
}

/// Reads and decodes a site-wide document, skipping it when absent.
async fn read_optional(
    fetcher: &Fetcher,
    cancel: &CancellationToken,
    locator: Option<&str>,
) -> Result<Option<serde_yaml::Value>> {
    let Some(locator) = locator else {
        return Ok(None);
    };
    if !Path::new(locator).exists() {
        debug!("{:?} does not exist; skipping", locator);
        return Ok(None);
    }
    let bytes = fetcher.fetch(cancel, locator).await?;
    let mut doc = Template::new("", locator, bytes);
    doc.config()?;
    Ok(Some(without_base(doc.document()?)))
}

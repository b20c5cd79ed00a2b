//! Default locations for vmtmpl configuration.
//!
//! This module provides the directory layout used by the CLI, so that every
//! command agrees on where the template catalog and site documents live.
//!
//! ```text
//! <home>/
//!   templates/       template catalog (`template://NAME` -> templates/NAME.yaml)
//!   base.yaml        implicit base template for embed-all and fill
//!   default.yaml     merged underneath filled templates
//!   override.yaml    merged over filled templates
//! <instances>/
//!   <name>/          instance directory used by fill
//! ```

use std::path::{Path, PathBuf};

/// Returns the default configuration home.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/vmtmpl` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/vmtmpl`
/// - Windows: `{FOLDERID_RoamingAppData}\vmtmpl`
///
/// Falls back to `.vmtmpl` in the current directory if the platform
/// directory cannot be determined.
///
/// This can be overridden by the `--home` CLI flag or the `VMTMPL_HOME`
/// environment variable.
pub fn default_home() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("vmtmpl"))
        .unwrap_or_else(|| PathBuf::from(".vmtmpl"))
}

/// Returns the default directory holding instance directories.
///
/// Can be overridden by `--instances` or `VMTMPL_INSTANCES`.
pub fn default_instances_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("vmtmpl"))
        .unwrap_or_else(|| PathBuf::from(".vmtmpl-instances"))
}

/// Well-known paths inside a configuration home.
#[derive(Debug, Clone)]
pub struct Layout {
    pub home: PathBuf,
    pub instances: PathBuf,
}

impl Layout {
    pub fn new(home: Option<PathBuf>, instances: Option<PathBuf>) -> Self {
        Self {
            home: home.unwrap_or_else(default_home),
            instances: instances.unwrap_or_else(default_instances_dir),
        }
    }

    /// Root of the template catalog.
    pub fn templates_dir(&self) -> PathBuf {
        self.home.join("templates")
    }

    /// Implicit base template appended by embed-all.
    pub fn base_template(&self) -> PathBuf {
        self.home.join("base.yaml")
    }

    pub fn default_template(&self) -> PathBuf {
        self.home.join("default.yaml")
    }

    pub fn override_template(&self) -> PathBuf {
        self.home.join("override.yaml")
    }

    /// Directory an instance named `name` would live in.
    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.instances.join(name)
    }
}

/// Lossy string form of a path, for use as a locator.
pub fn path_locator(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

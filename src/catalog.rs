//! # Template Catalog
//!
//! `template://NAME` locators are looked up in a catalog: an opaque mapping
//! from logical template names to document bytes. The trait keeps the
//! storage mechanism out of the fetch logic so it can be swapped, which is
//! particularly useful for testing.
//!
//! - **`DirCatalog`**: templates stored as `NAME.yaml` files under a root
//!   directory. This is what the CLI uses.
//! - **`MemoryCatalog`**: templates held in a map, for tests and for
//!   applications that ship their templates embedded in the binary.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::fetch::{read_at_most, MAX_TEMPLATE_SIZE};

/// Name to bytes lookup for `template://` locators.
pub trait TemplateCatalog: Send + Sync {
    /// Returns the document stored under `name`, or at least its first
    /// [`MAX_TEMPLATE_SIZE`] bytes.
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}

/// Catalog backed by a directory of YAML files.
#[derive(Debug, Clone)]
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file that stores `name`.
    ///
    /// `.yaml` is appended unless the name already has a YAML extension.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.split('/').any(|segment| segment == "..") {
            return Err(Error::InvalidLocator {
                locator: format!("template://{}", name),
                message: "template name must not be empty or contain '..'".to_string(),
            });
        }
        let lower = name.to_lowercase();
        let file = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            name.to_string()
        } else {
            format!("{}.yaml", name)
        };
        Ok(self.root.join(file.trim_start_matches('/')))
    }
}

impl TemplateCatalog for DirCatalog {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        let fetch_error = |e: std::io::Error| Error::Fetch {
            locator: format!("template://{}", name),
            message: format!("{}: {}", path.display(), e),
        };
        let file = std::fs::File::open(&path).map_err(fetch_error)?;
        read_at_most(file, MAX_TEMPLATE_SIZE).map_err(fetch_error)
    }
}

/// Catalog holding its templates in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    templates: HashMap<String, Vec<u8>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the template stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.templates.insert(name.into(), content.into());
    }

    /// Builder-style variant of [`MemoryCatalog::insert`].
    pub fn with(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }
}

impl TemplateCatalog for MemoryCatalog {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Fetch {
                locator: format!("template://{}", name),
                message: "no such template".to_string(),
            })
    }
}

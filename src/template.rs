//! # Template Records
//!
//! A [`Template`] pairs a locator with the raw bytes fetched from it and the
//! configuration decoded from those bytes. The configuration is decoded on
//! first use and cached; every operation that replaces the bytes drops the
//! cached configuration, so the two can never disagree.
//!
//! [`Config`] only models the fields this crate acts on. Anything that
//! rewrites a template goes through the raw [`Template::document`] instead,
//! so keys outside the schema survive composition.

use log::debug;
use serde_yaml::{Mapping, Value as YamlValue};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::decode;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::locator::{self, LocatorKind};
use crate::marshal::marshal;
use crate::name;

/// A template document and where it came from.
#[derive(Debug, Default)]
pub struct Template {
    /// Instance name derived from the locator; empty when none applies.
    pub name: String,
    /// Locator the bytes were fetched from.
    pub locator: String,
    bytes: Vec<u8>,
    config: Option<Config>,
    warning: Option<Error>,
}

impl Template {
    pub fn new(name: impl Into<String>, locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            bytes,
            ..Default::default()
        }
    }

    /// Resolves `locator` against `base_path`, derives the instance name and
    /// fetches the content.
    ///
    /// A non-empty `name` is used as is. Otherwise it is derived from the
    /// locator; STDIN and unclassifiable locators leave it empty.
    pub async fn read(
        fetcher: &Fetcher,
        cancel: &CancellationToken,
        name: &str,
        locator: &str,
        base_path: &str,
    ) -> Result<Template> {
        let locator = locator::abs_path(locator, base_path)?;
        let name = if name.is_empty() {
            derive_name(&locator)?
        } else {
            name.to_string()
        };
        let bytes = fetcher.fetch(cancel, &locator).await?;
        debug!("Read {} bytes from {:?} (name {:?})", bytes.len(), locator, name);
        Ok(Template::new(name, locator, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replaces the raw bytes and invalidates the decoded configuration.
    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
        self.config = None;
        self.warning = None;
    }

    /// The bytes parsed as an untyped YAML document.
    ///
    /// A document with no content is an empty mapping.
    pub fn document(&self) -> Result<YamlValue> {
        if decode::is_blank(&self.bytes) {
            return Ok(YamlValue::Mapping(Mapping::new()));
        }
        let document: YamlValue =
            serde_yaml::from_slice(&self.bytes).map_err(|e| Error::Unmarshal {
                locator: self.locator.clone(),
                message: e.to_string(),
            })?;
        Ok(match document {
            YamlValue::Null => YamlValue::Mapping(Mapping::new()),
            document => document,
        })
    }

    /// Replaces the bytes with `document`, serialized.
    pub fn set_document(&mut self, document: &YamlValue) -> Result<()> {
        let bytes = marshal(document, false)?;
        self.set_bytes(bytes);
        Ok(())
    }

    /// The decoded configuration, decoding the bytes on first access.
    pub fn config(&mut self) -> Result<&Config> {
        let config = match self.config.take() {
            Some(config) => config,
            None => {
                let decoded = decode::decode(&self.locator, &self.bytes)?;
                self.warning = decoded.warning;
                decoded.config
            }
        };
        Ok(self.config.insert(config))
    }

    /// Strict-mode warning from the most recent decode.
    pub fn warning(&self) -> Option<&Error> {
        self.warning.as_ref()
    }

    /// Directory-like prefix that relative references in this template are
    /// resolved against.
    pub fn base_path(&self) -> String {
        locator::base_path(&self.locator)
    }
}

/// Instance name implied by an absolute locator.
fn derive_name(locator: &str) -> Result<String> {
    match locator::classify(locator)? {
        LocatorKind::Catalog(catalog_name) => name::from_yaml_path(&catalog_name),
        LocatorKind::Http => name::from_url(locator),
        LocatorKind::FileUrl(path) => name::from_yaml_path(&path.to_string_lossy()),
        LocatorKind::FilePath => name::from_yaml_path(locator),
        LocatorKind::Stdin | LocatorKind::Unknown => Ok(String::new()),
    }
}

//! # Validating Decoder
//!
//! Template bytes go through three passes, each a separate function over the
//! same immutable input:
//!
//! 1. [`lenient`]: the structural decode into [`Config`]. Unknown keys are
//!    dropped so templates written for newer releases still load. Failure
//!    is fatal ([`Error::Unmarshal`]).
//! 2. [`check_syntax`]: a second opinion from an independent YAML parser,
//!    catching mistakes the structural decoder lets through (duplicate
//!    keys, malformed anchors). Failure is fatal ([`Error::Syntax`]).
//! 3. [`strict`]: the same decode again, this time recording every key the
//!    schema does not know. The result is a warning ([`Error::UnknownFields`])
//!    and never stops processing.
//!
//! [`decode`] runs all three in that order.

use log::{debug, warn};
use serde_ignored::Path;
use yaml_rust2::YamlLoader;

use crate::config::Config;
use crate::error::{Error, Result};

/// Outcome of a successful [`decode`].
#[derive(Debug)]
pub struct Decoded {
    pub config: Config,
    /// Strict-mode findings, if any. Never fatal.
    pub warning: Option<Error>,
}

/// Runs the lenient decode, the syntax check and the strict check.
///
/// Both fatal passes always run. When both fail, the syntax error is
/// returned.
pub fn decode(locator: &str, bytes: &[u8]) -> Result<Decoded> {
    let config = lenient(locator, bytes);
    check_syntax(locator, bytes)?;
    let config = config?;
    let warning = strict(locator, bytes);
    if let Some(warning) = &warning {
        warn!("{}; please check for typos", warning);
    }
    Ok(Decoded { config, warning })
}

/// Decodes `bytes` into a [`Config`], ignoring unknown keys.
///
/// A document with no content (empty, whitespace, or comments only)
/// decodes to the default configuration.
pub fn lenient(locator: &str, bytes: &[u8]) -> Result<Config> {
    if is_blank(bytes) {
        debug!("{}: empty document", locator);
        return Ok(Config::default());
    }
    serde_yaml::from_slice(bytes).map_err(|e| Error::Unmarshal {
        locator: locator.to_string(),
        message: e.to_string(),
    })
}

/// Parses `bytes` with an independent YAML implementation.
pub fn check_syntax(locator: &str, bytes: &[u8]) -> Result<()> {
    let syntax_error = |message: String| Error::Syntax {
        locator: locator.to_string(),
        message,
    };
    let text = std::str::from_utf8(bytes).map_err(|e| syntax_error(e.to_string()))?;
    YamlLoader::load_from_str(text).map_err(|e| syntax_error(e.to_string()))?;
    Ok(())
}

/// Decodes `bytes` again and reports every key outside the schema.
///
/// Returns `None` when the document only uses known fields, or when it
/// can't be decoded at all (the lenient pass reports that).
pub fn strict(locator: &str, bytes: &[u8]) -> Option<Error> {
    if is_blank(bytes) {
        return None;
    }
    let mut fields = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_slice(bytes);
    let decoded: std::result::Result<Config, _> =
        serde_ignored::deserialize(deserializer, |path| fields.push(field_path(&path)));
    if decoded.is_err() || fields.is_empty() {
        return None;
    }
    Some(Error::UnknownFields {
        locator: locator.to_string(),
        fields,
    })
}

/// Dotted path of an ignored key, e.g. `mounts.0.writeable`.
///
/// `Option` and newtype wrappers are transparent in the document, so they
/// don't contribute a segment.
fn field_path(path: &Path) -> String {
    let (parent, segment) = match path {
        Path::Root => return String::new(),
        Path::Seq { parent, index } => (*parent, index.to_string()),
        Path::Map { parent, key } => (*parent, key.clone()),
        Path::Some { parent }
        | Path::NewtypeStruct { parent }
        | Path::NewtypeVariant { parent } => return field_path(parent),
    };
    let parent = field_path(parent);
    if parent.is_empty() {
        segment
    } else {
        format!("{}.{}", parent, segment)
    }
}

/// `true` if the document holds nothing but whitespace and comments.
pub(crate) fn is_blank(bytes: &[u8]) -> bool {
    String::from_utf8_lossy(bytes).lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

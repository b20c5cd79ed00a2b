//! Rendering configurations and documents back to YAML.

use serde::Serialize;

use crate::error::{Error, Result};

/// Start-of-document marker used in stream mode.
pub const DOCUMENT_START: &str = "---\n";
/// End-of-document marker used in stream mode.
pub const DOCUMENT_END: &str = "...\n";

/// Serializes `value` (a [`crate::config::Config`] or a raw document) to
/// YAML.
///
/// In stream mode the document is wrapped between `---` and `...` so that
/// several documents can be concatenated and split again unambiguously.
pub fn marshal<T: Serialize + ?Sized>(value: &T, stream: bool) -> Result<Vec<u8>> {
    let document = serde_yaml::to_string(value).map_err(|e| Error::Serialization {
        message: e.to_string(),
    })?;
    let document = if stream {
        format!("{}{}{}", DOCUMENT_START, document, DOCUMENT_END)
    } else {
        document
    };
    Ok(document.into_bytes())
}

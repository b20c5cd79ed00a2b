//! Instance names derived from template locators.
//!
//! The name is the lowercased base filename with a trailing `.yml`/`.yaml`
//! removed, validated with the same identifier rules container runtimes use
//! for container and image names. Dots are allowed: an instance name is not
//! a hostname.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

/// Longest identifier accepted by [`validate_identifier`].
pub const MAX_IDENTIFIER_LENGTH: usize = 76;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:[._-][A-Za-z0-9]+)*$").expect("identifier pattern is valid")
});

/// Checks `s` against the container identifier rules.
///
/// Identifiers are runs of alphanumerics separated by single `.`, `_` or
/// `-`, at most [`MAX_IDENTIFIER_LENGTH`] characters long.
pub fn validate_identifier(s: &str) -> std::result::Result<(), String> {
    if s.is_empty() {
        return Err("identifier must not be empty".to_string());
    }
    if s.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "identifier {:?} greater than maximum length ({} characters)",
            s, MAX_IDENTIFIER_LENGTH
        ));
    }
    if !IDENTIFIER.is_match(s) {
        return Err(format!(
            "identifier {:?} must match {}",
            s,
            IDENTIFIER.as_str()
        ));
    }
    Ok(())
}

/// Derives an instance name from a filesystem path or catalog name.
///
/// `deprecated/centos-7.yaml` yields `centos-7`, `ubuntu-24.04.yaml` yields
/// `ubuntu-24.04`.
pub fn from_yaml_path(yaml_path: &str) -> Result<String> {
    let file_name = yaml_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let name = file_name.strip_suffix(".yml").unwrap_or(&file_name);
    let name = name.strip_suffix(".yaml").unwrap_or(name);
    validate_identifier(name).map_err(|message| Error::InvalidName {
        filename: yaml_path.to_string(),
        message,
    })?;
    Ok(name.to_string())
}

/// Derives an instance name from the last path segment of a URL.
pub fn from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidLocator {
        locator: url.to_string(),
        message: e.to_string(),
    })?;
    let last = parsed.path().rsplit('/').next().unwrap_or_default();
    from_yaml_path(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_path() {
        assert_eq!(from_yaml_path("deprecated/centos-7.yaml").unwrap(), "centos-7");
        assert_eq!(from_yaml_path("/tmp/Ubuntu-24.04.yaml").unwrap(), "ubuntu-24.04");
        assert_eq!(from_yaml_path("default.yml").unwrap(), "default");
        assert_eq!(from_yaml_path("docker").unwrap(), "docker");
    }

    #[test]
    fn test_from_yaml_path_strips_yml_then_yaml() {
        assert_eq!(from_yaml_path("a.yaml.yml").unwrap(), "a");
        assert_eq!(from_yaml_path("a.yml.yaml").unwrap(), "a.yml");
    }

    #[test]
    fn test_from_yaml_path_invalid() {
        let err = from_yaml_path("/tmp/_hidden.yaml").unwrap_err();
        match err {
            Error::InvalidName { filename, .. } => assert_eq!(filename, "/tmp/_hidden.yaml"),
            other => panic!("Expected InvalidName, got {:?}", other),
        }
        assert!(from_yaml_path("my template.yaml").is_err());
        assert!(from_yaml_path(".yaml").is_err());
        assert!(from_yaml_path("a..b.yaml").is_err());
    }

    #[test]
    fn test_from_url() {
        assert_eq!(from_url("https://example.com/t/fedora.yaml").unwrap(), "fedora");
        assert_eq!(from_url("file:///tmp/alpine.yml").unwrap(), "alpine");
        assert!(from_url("https://example.com/").is_err());
    }

    #[test]
    fn test_validate_identifier_length() {
        let ok = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&ok).is_ok());
        let too_long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let message = validate_identifier(&too_long).unwrap_err();
        assert!(message.contains("maximum length"));
    }
}

//! # Template Locators
//!
//! A locator is a string naming where a template's bytes live. Its scheme is
//! implicit in its spelling:
//!
//! - `template://NAME` - an entry in the template catalog
//! - `http://...`, `https://...` - a remote document
//! - `file:///abs/path` - a local file given as a URL
//! - anything containing `/`, or with a non-numeric file extension - a
//!   filesystem path
//! - `-` - standard input
//!
//! This module resolves relative locators against the location of the
//! template that references them ([`abs_path`], [`base_path`]) and decides
//! which fetch strategy a locator implies ([`classify`]).

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Marker locator for standard input.
pub const STDIN: &str = "-";

/// How a locator's bytes are obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorKind {
    /// A `template://` reference, carrying the catalog name.
    Catalog(String),
    /// An `http://` or `https://` URL.
    Http,
    /// A `file://` URL, carrying its absolute path.
    FileUrl(PathBuf),
    /// A plain filesystem path.
    FilePath,
    /// Standard input.
    Stdin,
    /// Nothing matched; the caller decides what an empty fetch means.
    Unknown,
}

/// Returns the URI scheme of `locator`, if it has one.
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or
/// `.`, terminated by `:`.
pub fn scheme(locator: &str) -> Option<&str> {
    let end = locator.find(':')?;
    let candidate = &locator[..end];
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return None,
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(candidate)
    } else {
        None
    }
}

/// Returns `true` if `locator` has a URI scheme or is an absolute path.
pub fn is_absolute(locator: &str) -> bool {
    scheme(locator).is_some() || Path::new(locator).is_absolute()
}

/// Combines a relative `locator` with `base_path`.
///
/// - An empty `base_path` defers resolution: `locator` is returned as is.
/// - Absolute locators (schemed URLs and absolute paths) are returned as is.
/// - Relative locators can't be resolved against STDIN.
/// - Relative locators must not contain `..` segments.
///
/// Schemed bases are joined as URL path segments, everything else as
/// filesystem path segments.
pub fn abs_path(locator: &str, base_path: &str) -> Result<String> {
    if base_path.is_empty() || is_absolute(locator) {
        return Ok(locator.to_string());
    }
    if base_path == STDIN {
        return Err(Error::NoRelativeFromStdin {
            locator: locator.to_string(),
        });
    }
    if locator.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(Error::ContainmentViolation {
            locator: locator.to_string(),
        });
    }
    if scheme(base_path).is_some() {
        if let Some((prefix, rest)) = base_path.split_once("://") {
            return Ok(format!("{}://{}", prefix, join(rest, locator)));
        }
        let mut url = Url::parse(base_path)?;
        let path = join(url.path(), locator);
        url.set_path(&path);
        return Ok(url.to_string());
    }
    Ok(join(base_path, locator))
}

/// Returns the locator without its final path element.
///
/// For schemed locators the result keeps the scheme (`http://host/a/b.yaml`
/// becomes `http://host/a`, `template://b` becomes `template://`); plain
/// paths yield their parent directory. STDIN stays STDIN, so that relative
/// references from a piped template are rejected by [`abs_path`].
pub fn base_path(locator: &str) -> String {
    if locator == STDIN {
        return STDIN.to_string();
    }
    match Url::parse(locator) {
        Ok(url) => {
            let mut host = url.host_str().unwrap_or_default().to_string();
            if let Some(port) = url.port() {
                host.push_str(&format!(":{}", port));
            }
            let parent = dir(&join(&host, url.path()));
            let parent = parent.strip_suffix('.').unwrap_or(&parent);
            format!("{}://{}", url.scheme(), parent)
        }
        Err(_) => dir(locator),
    }
}

/// Decides which fetch strategy `locator` implies.
///
/// The checks run in a fixed order: `template://`, `http(s)://`, `file://`,
/// filesystem path, STDIN. A `file://` URL with a relative path and any
/// other `scheme://` form are rejected.
pub fn classify(locator: &str) -> Result<LocatorKind> {
    if let Some(scheme) = scheme(locator) {
        match scheme.to_ascii_lowercase().as_str() {
            "template" => {
                let url = Url::parse(locator).map_err(|e| Error::InvalidLocator {
                    locator: locator.to_string(),
                    message: e.to_string(),
                })?;
                let name = join(url.host_str().unwrap_or_default(), url.path());
                return Ok(LocatorKind::Catalog(name));
            }
            "http" | "https" => return Ok(LocatorKind::Http),
            "file" => {
                let path = locator
                    .get(scheme.len() + 1..)
                    .map(|rest| rest.strip_prefix("//").unwrap_or(rest))
                    .unwrap_or_default();
                if !Path::new(path).is_absolute() {
                    return Err(Error::InvalidLocator {
                        locator: locator.to_string(),
                        message: "file URL is not an absolute path".to_string(),
                    });
                }
                return Ok(LocatorKind::FileUrl(PathBuf::from(path)));
            }
            _ if locator[scheme.len()..].starts_with("://") => {
                return Err(Error::InvalidLocator {
                    locator: locator.to_string(),
                    message: format!("unsupported scheme {:?}", scheme),
                });
            }
            _ => {}
        }
    }
    if seems_file_path(locator) {
        return Ok(LocatorKind::FilePath);
    }
    if locator == STDIN {
        return Ok(LocatorKind::Stdin);
    }
    Ok(LocatorKind::Unknown)
}

/// Returns `true` if `arg` contains a path separator or has a file extension
/// that does not start with a digit.
///
/// `script.sh` is a file path, `ubuntu-24.04` is not.
pub fn seems_file_path(arg: &str) -> bool {
    if arg.contains('/') || arg.contains(std::path::MAIN_SEPARATOR) {
        return true;
    }
    match arg.rfind('.') {
        Some(idx) => arg[idx + 1..]
            .chars()
            .next()
            .is_some_and(|c| !c.is_ascii_digit()),
        None => false,
    }
}

/// Lexically cleans a `/`-separated path: drops empty and `.` segments,
/// keeps a leading `/`, and yields `.` for an empty relative result.
fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Joins two path fragments, ignoring empty ones.
fn join(base: &str, elem: &str) -> String {
    match (base.is_empty(), elem.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(elem),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{}/{}", base, elem)),
    }
}

/// Everything before the last `/`, cleaned; `.` when there is none.
fn dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean(&path[..=idx]),
        None => ".".to_string(),
    }
}

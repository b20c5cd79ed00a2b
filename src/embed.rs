//! # Template Composition
//!
//! The [`Composer`] turns a template that references other documents into a
//! self-contained one. What it does depends on the [`Mode`]:
//!
//! - **Verbatim**: base and provision-file locators are rewritten to
//!   absolute form; nothing is fetched.
//! - **Embed**: the declared `base` chain is fetched, verified and merged
//!   underneath the template, recursively. Provision files are inlined.
//! - **EmbedAll**: as Embed, with the implicit default base template
//!   appended to the root template's `base` list.
//! - **Fill**: as EmbedAll, then site overrides and defaults are applied
//!   (see [`crate::fill`]).
//!
//! ## Composition order
//!
//! Bases are processed in declaration order; earlier entries take priority
//! over later ones, and the template itself over all of them. Each base is
//! fully composed (its own bases merged in) before it is merged into the
//! template that references it, so the furthest ancestor lands first.
//!
//! Relative base locators resolve against the location of the template
//! that declares them, not against the root.
//!
//! ## Safety
//!
//! - Locators currently being expanded are tracked; meeting one again is a
//!   [`Error::CyclicReference`].
//! - A declared digest is checked against the fetched bytes before they are
//!   decoded or merged; a mismatch is an [`Error::Integrity`].

use std::path::Path;

use futures::future::BoxFuture;
use log::{debug, warn};
use serde_yaml::Value as YamlValue;
use tokio_util::sync::CancellationToken;

use crate::config::LocatorWithDigest;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::fill::{self, FillOptions};
use crate::locator::{abs_path, classify, LocatorKind};
use crate::merge::{merge_underneath, without_base};
use crate::template::Template;

/// How far composition goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Rewrite locators to absolute form only.
    #[default]
    Verbatim,
    /// Inline the declared base chain.
    Embed,
    /// Inline the declared base chain and the default base template.
    EmbedAll,
    /// EmbedAll, then apply overrides and defaults.
    Fill,
}

/// Composes templates using one fetcher and cancellation token.
pub struct Composer<'a> {
    fetcher: &'a Fetcher,
    cancel: &'a CancellationToken,
    default_base: Option<String>,
    fill_options: FillOptions,
}

impl<'a> Composer<'a> {
    pub fn new(fetcher: &'a Fetcher, cancel: &'a CancellationToken) -> Self {
        Self {
            fetcher,
            cancel,
            default_base: None,
            fill_options: FillOptions::default(),
        }
    }

    /// Sets the implicit base template used by [`Mode::EmbedAll`] and
    /// [`Mode::Fill`]. Ignored if it points to a file that doesn't exist.
    pub fn with_default_base(mut self, locator: impl Into<String>) -> Self {
        self.default_base = Some(locator.into());
        self
    }

    /// Sets the instance directory and site documents used by [`Mode::Fill`].
    pub fn with_fill_options(mut self, options: FillOptions) -> Self {
        self.fill_options = options;
        self
    }

    /// Composes `tmpl` in place.
    pub async fn compose(&self, tmpl: &mut Template, mode: Mode) -> Result<()> {
        make_root_absolute(tmpl)?;
        debug!("Composing {:?} in {:?} mode", tmpl.locator, mode);
        match mode {
            Mode::Verbatim => use_abs_locators(tmpl),
            Mode::Embed => self.embed(tmpl, &mut Vec::new(), None).await,
            Mode::EmbedAll => {
                let default_base = self.implicit_default_base(tmpl);
                self.embed(tmpl, &mut Vec::new(), default_base).await
            }
            Mode::Fill => {
                let default_base = self.implicit_default_base(tmpl);
                self.embed(tmpl, &mut Vec::new(), default_base).await?;
                fill::fill(self.fetcher, self.cancel, tmpl, &self.fill_options).await
            }
        }
    }

    /// The default base template, if one is configured, exists, and is not
    /// the template being composed.
    fn implicit_default_base(&self, tmpl: &Template) -> Option<String> {
        let locator = self.default_base.as_deref()?;
        let exists = match classify(locator) {
            Ok(LocatorKind::FilePath) => Path::new(locator).exists(),
            Ok(LocatorKind::FileUrl(path)) => path.exists(),
            Ok(_) => true,
            Err(_) => false,
        };
        if !exists || locator == tmpl.locator {
            debug!("Not using default base template {:?}", locator);
            return None;
        }
        Some(locator.to_string())
    }

    /// Recursively embeds the bases of `tmpl`.
    ///
    /// `open` holds the locators whose expansion is in progress.
    fn embed<'b>(
        &'b self,
        tmpl: &'b mut Template,
        open: &'b mut Vec<String>,
        default_base: Option<String>,
    ) -> BoxFuture<'b, Result<()>> {
        Box::pin(async move {
            if open.contains(&tmpl.locator) {
                let mut chain = open.clone();
                chain.push(tmpl.locator.clone());
                return Err(Error::CyclicReference {
                    cycle: chain.join(" -> "),
                });
            }
            open.push(tmpl.locator.clone());
            let result = self.embed_bases(tmpl, open, default_base).await;
            open.pop();
            result
        })
    }

    async fn embed_bases(
        &self,
        tmpl: &mut Template,
        open: &mut Vec<String>,
        default_base: Option<String>,
    ) -> Result<()> {
        let config = tmpl.config()?;
        let mut bases = config.base.0.clone();
        if let Some(default_base) = default_base {
            bases.push(LocatorWithDigest::new(default_base));
        }
        let files: Vec<_> = config
            .provision
            .iter()
            .enumerate()
            .filter_map(|(index, provision)| Some((index, provision.file.clone()?)))
            .collect();
        if bases.is_empty() && files.is_empty() {
            return Ok(());
        }

        let base_path = tmpl.base_path();
        let mut document = without_base(tmpl.document()?);
        self.inline_provision_files(&mut document, files, &base_path)
            .await?;
        for entry in &bases {
            let locator = abs_path(&entry.url, &base_path)?;
            let content = self.fetch_verified(&locator, entry).await?;
            let mut base = Template::new("", locator, content);
            self.embed(&mut base, open, None).await?;
            debug!("Merging {:?} underneath {:?}", base.locator, tmpl.locator);
            merge_underneath(&mut document, without_base(base.document()?), "");
        }

        tmpl.set_document(&document)?;
        tmpl.config()?;
        Ok(())
    }

    /// Fetches `locator` and checks it against the digest declared in `entry`.
    async fn fetch_verified(&self, locator: &str, entry: &LocatorWithDigest) -> Result<Vec<u8>> {
        let digest = entry.parsed_digest()?;
        if digest.is_none() && matches!(classify(locator)?, LocatorKind::Http) {
            warn!("{:?} is not pinned by a digest", locator);
        }
        let content = self.fetcher.fetch(self.cancel, locator).await?;
        if let Some(digest) = digest {
            digest.verify(locator, &content)?;
        }
        Ok(content)
    }

    /// Replaces the `file` of each listed `provision` entry with the script
    /// it points to.
    async fn inline_provision_files(
        &self,
        document: &mut YamlValue,
        files: Vec<(usize, LocatorWithDigest)>,
        base_path: &str,
    ) -> Result<()> {
        for (index, file) in files {
            let locator = abs_path(&file.url, base_path)?;
            let content = self.fetch_verified(&locator, &file).await?;
            let script = String::from_utf8(content).map_err(|e| Error::Fetch {
                locator: locator.clone(),
                message: format!("script is not valid UTF-8: {}", e),
            })?;
            let provision = document
                .get_mut("provision")
                .and_then(|provision| provision.get_mut(index));
            if let Some(YamlValue::Mapping(provision)) = provision {
                provision.remove("file");
                provision.insert("script".into(), script.into());
                debug!("Inlined provision script {:?}", locator);
            }
        }
        Ok(())
    }
}

/// Rewrites a relative filesystem locator to an absolute path.
fn make_root_absolute(tmpl: &mut Template) -> Result<()> {
    if tmpl.locator.is_empty() || Path::new(&tmpl.locator).is_absolute() {
        return Ok(());
    }
    if classify(&tmpl.locator)? == LocatorKind::FilePath {
        let absolute = std::path::absolute(&tmpl.locator)?;
        tmpl.locator = absolute.to_string_lossy().into_owned();
    }
    Ok(())
}

/// Rewrites base and provision-file locators relative to the template.
///
/// Locators are replaced where they stand, in whichever form they were
/// written. The bytes are only re-serialized if a locator actually changed.
fn use_abs_locators(tmpl: &mut Template) -> Result<()> {
    tmpl.config()?;
    let base_path = tmpl.base_path();
    let mut document = tmpl.document()?;
    let mut changed = false;
    match document.get_mut("base") {
        Some(YamlValue::Sequence(entries)) => {
            for entry in entries {
                changed |= absolutize(entry, &base_path)?;
            }
        }
        Some(entry) => changed |= absolutize(entry, &base_path)?,
        None => {}
    }
    if let Some(YamlValue::Sequence(provisions)) = document.get_mut("provision") {
        for provision in provisions {
            if let Some(file) = provision.get_mut("file") {
                changed |= absolutize(file, &base_path)?;
            }
        }
    }
    if changed {
        tmpl.set_document(&document)?;
    }
    Ok(())
}

/// Makes a locator entry absolute, either a plain string or the `url` of a
/// mapping. Returns whether it changed.
fn absolutize(entry: &mut YamlValue, base_path: &str) -> Result<bool> {
    let url = match entry {
        YamlValue::Mapping(map) => match map.get_mut("url") {
            Some(url) => url,
            None => return Ok(false),
        },
        other => other,
    };
    let Some(current) = url.as_str() else {
        return Ok(false);
    };
    let absolute = abs_path(current, base_path)?;
    if absolute == current {
        return Ok(false);
    }
    *url = YamlValue::String(absolute);
    Ok(true)
}

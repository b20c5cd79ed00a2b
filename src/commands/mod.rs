//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `vmtmpl`
//! command-line tool. Each subcommand is defined in its own file to keep the
//! logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`] and performs the command's logic.

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use vmtmpl::defaults::{path_locator, Layout};
use vmtmpl::embed::{Composer, Mode};
use vmtmpl::fetch::Fetcher;
use vmtmpl::fill::FillOptions;
use vmtmpl::locator::{classify, LocatorKind};
use vmtmpl::template::Template;

pub mod copy;
pub mod validate;

/// State shared by every command of one invocation.
pub struct Context {
    pub layout: Layout,
    pub fetcher: Fetcher,
    pub cancel: CancellationToken,
}

impl Context {
    /// Reads the template at `locator`, rejecting locators that don't name
    /// any source.
    pub async fn read(&self, locator: &str) -> Result<Template> {
        if classify(locator)? == LocatorKind::Unknown {
            bail!(
                "Don't know how to interpret {:?} as a template locator",
                locator
            );
        }
        Ok(Template::read(&self.fetcher, &self.cancel, "", locator, "").await?)
    }

    /// Composes `tmpl` in `mode` using the configured site documents.
    pub async fn compose(&self, tmpl: &mut Template, mode: Mode) -> Result<()> {
        if mode == Mode::Fill && tmpl.name.is_empty() {
            bail!(
                "Can't derive an instance name from {:?}; fill needs a named template",
                tmpl.locator
            );
        }
        let fill_options = FillOptions {
            instance_dir: self.layout.instance_dir(&tmpl.name),
            override_locator: Some(path_locator(&self.layout.override_template())),
            default_locator: Some(path_locator(&self.layout.default_template())),
        };
        Composer::new(&self.fetcher, &self.cancel)
            .with_default_base(path_locator(&self.layout.base_template()))
            .with_fill_options(fill_options)
            .compose(tmpl, mode)
            .await?;
        Ok(())
    }
}

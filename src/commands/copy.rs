//! # Copy Command Implementation
//!
//! This module implements the `copy` subcommand, which writes a template to
//! a file or STDOUT.
//!
//! ## Functionality
//!
//! - **Default**: relative base and provision-file locators are rewritten
//!   to absolute form so the copy still works from its new location.
//! - **`--verbatim`**: the bytes are copied untouched, locators included.
//! - **`--embed`**: base templates are merged into the copy.
//! - **`--embed-all`**: the default base template is merged in as well.
//! - **`--fill`**: site overrides and defaults are applied on top.

use std::io::Write;

use anyhow::{Context as _, Result};
use clap::Args;
use log::info;

use vmtmpl::embed::Mode;
use vmtmpl::locator::STDIN;

use super::Context;

/// Copy a template
#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Copy the template as is, without rewriting relative locators
    #[arg(long, conflicts_with_all = ["embed", "embed_all", "fill"])]
    pub verbatim: bool,

    /// Embed the base templates
    #[arg(long, conflicts_with_all = ["embed_all", "fill"])]
    pub embed: bool,

    /// Embed the base templates and the default base template
    #[arg(long, conflicts_with = "fill")]
    pub embed_all: bool,

    /// Embed everything and fill in all default values
    #[arg(long)]
    pub fill: bool,

    /// Template locator (`template://NAME`, URL, path, or `-` for STDIN)
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Destination file, or `-` for STDOUT
    #[arg(value_name = "DEST")]
    pub dest: String,
}

impl CopyArgs {
    /// Composition mode, or `None` to copy the bytes untouched.
    pub fn mode(&self) -> Option<Mode> {
        if self.verbatim {
            None
        } else if self.fill {
            Some(Mode::Fill)
        } else if self.embed_all {
            Some(Mode::EmbedAll)
        } else if self.embed {
            Some(Mode::Embed)
        } else {
            Some(Mode::Verbatim)
        }
    }
}

/// Execute the `copy` command.
pub async fn execute(args: CopyArgs, ctx: &Context) -> Result<()> {
    let mut tmpl = ctx.read(&args.template).await?;
    if let Some(mode) = args.mode() {
        ctx.compose(&mut tmpl, mode).await?;
    }

    if args.dest == STDIN {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(tmpl.bytes())?;
        stdout.flush()?;
    } else {
        std::fs::write(&args.dest, tmpl.bytes())
            .with_context(|| format!("Failed to write {:?}", args.dest))?;
        info!("Copied {:?} to {:?}", tmpl.locator, args.dest);
    }
    Ok(())
}

//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks one or
//! more templates without creating anything.
//!
//! ## Functionality
//!
//! - **Composition**: each template is read and fully embedded (including
//!   the default base template), so errors anywhere in its base chain are
//!   reported.
//! - **Validation**: the composed configuration is checked by
//!   [`vmtmpl::validate::validate`].
//! - **`--fill`**: defaults are filled in first, and the filled document is
//!   printed. With several templates the output is a YAML stream.
//!
//! Every template must name an instance: STDIN and locators no name can be
//! derived from are refused, as is a template with no content at all.
//! Templates are processed in order; the first failure stops the command.

use std::io::Write;

use anyhow::{bail, Result};
use clap::Args;
use log::info;

use vmtmpl::embed::Mode;
use vmtmpl::marshal::marshal;
use vmtmpl::validate::validate;

use super::Context;

/// Validate templates
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Fill in defaults and print the filled templates
    #[arg(long)]
    pub fill: bool,

    /// Template locators to validate
    #[arg(value_name = "TEMPLATE", required = true)]
    pub templates: Vec<String>,
}

/// Execute the `validate` command.
pub async fn execute(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let mode = if args.fill { Mode::Fill } else { Mode::EmbedAll };
    let stream = args.templates.len() > 1;

    for locator in &args.templates {
        let mut tmpl = ctx.read(locator).await?;
        if tmpl.name.is_empty() {
            bail!("Can't derive an instance name from {:?}", locator);
        }
        if tmpl.bytes().is_empty() {
            bail!(
                "Don't know how to interpret {:?} as a template locator",
                locator
            );
        }
        ctx.compose(&mut tmpl, mode).await?;
        let resolved = tmpl.locator.clone();
        validate(&resolved, tmpl.config()?)?;

        if args.fill {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&marshal(&tmpl.document()?, stream)?)?;
            stdout.flush()?;
        }
        info!("{:?}: OK", locator);
    }
    Ok(())
}

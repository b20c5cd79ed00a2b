//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use tokio_util::sync::CancellationToken;

use vmtmpl::catalog::DirCatalog;
use vmtmpl::defaults::Layout;
use vmtmpl::fetch::Fetcher;

use crate::commands;

/// vmtmpl - Resolve, validate and compose VM instance templates
#[derive(Parser, Debug)]
#[command(name = "vmtmpl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Configuration directory holding `templates/`, `base.yaml`,
    /// `default.yaml` and `override.yaml`.
    #[arg(long, global = true, value_name = "DIR", env = "VMTMPL_HOME")]
    home: Option<PathBuf>,

    /// Directory that instance directories are created in.
    #[arg(long, global = true, value_name = "DIR", env = "VMTMPL_INSTANCES")]
    instances: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy a template, optionally embedding its base templates
    Copy(commands::copy::CopyArgs),

    /// Validate one or more templates
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let layout = Layout::new(self.home, self.instances);
        debug!("Using configuration home {}", layout.home.display());

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let ctx = commands::Context {
            fetcher: Fetcher::new(DirCatalog::new(layout.templates_dir())),
            layout,
            cancel,
        };

        match self.command {
            Commands::Copy(args) => commands::copy::execute(args, &ctx).await,
            Commands::Validate(args) => commands::validate::execute(args, &ctx).await,
        }
    }
}

/// Initialises `env_logger`; `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use tandem::output::OutputConfig;

use crate::commands;

/// Tandem - keep a local repository, its hosted remote and its wiki in step
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a local repository, and optionally its hosted remote
    Init(commands::init::InitArgs),

    /// Clone a hosted repository, and optionally its wiki
    Clone(commands::clone::CloneArgs),

    /// List the commits reachable from a branch
    Commits(commands::commits::CommitsArgs),

    /// List tags and the latest release
    Tags(commands::tags::TagsArgs),

    /// Show the hosted repository behind the local origin
    Origin(commands::origin::OriginArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .init();
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &output),
            Commands::Clone(args) => commands::clone::execute(args, &output),
            Commands::Commits(args) => commands::commits::execute(args, &output),
            Commands::Tags(args) => commands::tags::execute(args, &output),
            Commands::Origin(args) => commands::origin::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

//! # Origin Command Implementation
//!
//! Reads the `origin` URL of an existing repository and shows the hosted
//! repository it identifies.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tandem::output::OutputConfig;
use tandem::remote::url::UrlParser;
use tandem::repository::SystemGit;

use super::{open_existing, OutputFormat};

/// Show the hosted repository behind the local origin
#[derive(Args, Debug)]
pub struct OriginArgs {
    /// Repository directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the `origin` command.
pub fn execute(args: OriginArgs, output: &OutputConfig) -> Result<()> {
    let git = SystemGit;
    let repo = open_existing(&git, &args.dir);
    let origin = repo.get_origin()?;
    let descriptor = UrlParser.repo_descriptor(&origin)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&descriptor)?),
        OutputFormat::Text => {
            println!("{}", output.heading(&descriptor.to_url()));
            println!("  origin:   {}", origin);
            println!("  provider: {}", descriptor.provider.key());
            println!("  user:     {}", descriptor.user);
            println!("  name:     {}", descriptor.name);
        }
    }
    Ok(())
}

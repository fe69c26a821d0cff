//! # Init Command Implementation
//!
//! Creates a new local repository under a parent directory. With `--user`
//! the hosted coordinates are recorded so that `origin` URLs can be derived
//! later; the hosted repository itself is never created from here.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tandem::orchestrator::Orchestrator;
use tandem::output::{OutputConfig, Status};

use super::load_settings;

/// Create a new local repository
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the project directory to create
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Directory the project is created in
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub parent: PathBuf,

    /// Owner of the hosted repository
    #[arg(short, long, value_name = "USER")]
    pub user: Option<String>,

    /// Also create a local wiki repository next to the project
    #[arg(long)]
    pub wiki: bool,

    /// Settings file to read
    #[arg(long, value_name = "FILE", env = "TANDEM_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Execute the `init` command.
pub fn execute(args: InitArgs, output: &OutputConfig) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;

    settings.local.active = true;
    settings.local.create = true;
    settings.local.clone_from_remote = false;
    settings.local.project_dir_parent = args.parent;
    settings.local.project_name = Some(args.name.clone());

    settings.remote.create = false;
    settings.remote.repo_name = Some(args.name.clone());
    match args.user {
        Some(user) => settings.remote.repo_user = Some(user),
        None => settings.remote.active = false,
    }

    settings.wiki.active = args.wiki;
    settings.wiki.create = true;
    settings.wiki.clone_from_remote = false;

    let project_dir = settings.local.project_dir();
    let remote_active = settings.remote.active;
    let orchestrator = Orchestrator::from_settings(settings);
    let report = orchestrator.execute()?;

    println!(
        "{} Initialised {}",
        output.mark(Status::Done),
        project_dir.display()
    );
    if report.wiki_processed {
        println!("{} Initialised wiki", output.mark(Status::Done));
    }
    if remote_active {
        println!(
            "{} Create {} on the host before pushing",
            output.mark(Status::Hint),
            report.remote
        );
    }
    Ok(())
}

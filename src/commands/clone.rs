//! # Clone Command Implementation
//!
//! Clones a hosted repository, and optionally its wiki, into a parent
//! directory. When the target directory already exists, `--on-exists`
//! decides between failing, pulling into it, or deleting it first. A delete
//! is always confirmed interactively unless `--yes` is given.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, ValueEnum};
use dialoguer::{theme::ColorfulTheme, Confirm};

use tandem::config::CloneExistsResponse;
use tandem::local::clone::CloneAction;
use tandem::orchestrator::Orchestrator;
use tandem::output::{OutputConfig, Status};

use super::load_settings;

/// What to do when the clone target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnExists {
    /// Stop with an error
    Fail,
    /// Pull into the existing directory
    Pull,
    /// Delete the directory after confirmation, then clone
    Delete,
}

impl From<OnExists> for CloneExistsResponse {
    fn from(value: OnExists) -> Self {
        match value {
            OnExists::Fail => CloneExistsResponse::Exception,
            OnExists::Pull => CloneExistsResponse::Pull,
            OnExists::Delete => CloneExistsResponse::Delete,
        }
    }
}

/// Clone a hosted repository
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Owner of the hosted repository
    #[arg(value_name = "USER")]
    pub user: String,

    /// Name of the hosted repository
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Directory the clone is placed in
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub parent: PathBuf,

    /// Also clone the repository's wiki
    #[arg(long)]
    pub wiki: bool,

    /// What to do when the target directory already exists
    #[arg(long, value_enum, default_value = "fail")]
    pub on_exists: OnExists,

    /// Delete existing directories without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Settings file to read
    #[arg(long, value_name = "FILE", env = "TANDEM_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Execute the `clone` command.
pub fn execute(args: CloneArgs, output: &OutputConfig) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    let yes = args.yes;

    let mut orchestrator = Orchestrator::from_settings(settings)
        .with_delete_approver(Box::new(move |path: &Path| yes || confirm_delete(path)));
    orchestrator.clone_from_remote(
        &args.parent,
        &args.user,
        &args.name,
        args.wiki,
        args.on_exists.into(),
    );
    let report = orchestrator.execute()?;

    let target = args.parent.join(&args.name);
    match report.clone {
        Some(CloneAction::Pull) => println!(
            "{} Pulled into existing {}",
            output.mark(Status::Skipped),
            target.display()
        ),
        Some(CloneAction::DeleteThenClone) => println!(
            "{} Replaced {} with a fresh clone of {}",
            output.mark(Status::Done),
            target.display(),
            report.remote
        ),
        _ => println!(
            "{} Cloned {} into {}",
            output.mark(Status::Done),
            report.remote,
            target.display()
        ),
    }
    if report.wiki_processed {
        println!("{} Wiki cloned", output.mark(Status::Done));
    }
    Ok(())
}

fn confirm_delete(path: &Path) -> bool {
    let prompt = format!("{} already exists. Delete it and clone again?", path.display());
    match Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
    {
        Ok(answer) => answer,
        Err(e) => {
            log::warn!("Could not ask for delete confirmation: {}", e);
            false
        }
    }
}

//! # Commits Command Implementation
//!
//! Lists the commits reachable from a branch of an existing repository,
//! newest first.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tandem::model::{Branch, Commit};
use tandem::output::OutputConfig;
use tandem::repository::SystemGit;

use super::{open_existing, OutputFormat};

/// List the commits reachable from a branch
#[derive(Args, Debug)]
pub struct CommitsArgs {
    /// Branch to walk (defaults to the current branch)
    #[arg(value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Repository directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct CommitLine<'a> {
    hash: &'a str,
    author: &'a str,
    date: String,
    message: &'a str,
}

impl<'a> From<&'a Commit> for CommitLine<'a> {
    fn from(commit: &'a Commit) -> Self {
        Self {
            hash: commit.hash.as_str(),
            author: &commit.author.name,
            date: commit.commit_date.to_rfc3339(),
            message: &commit.short_message,
        }
    }
}

/// Execute the `commits` command.
pub fn execute(args: CommitsArgs, output: &OutputConfig) -> Result<()> {
    let git = SystemGit;
    let repo = open_existing(&git, &args.dir);
    let branch = match args.branch {
        Some(name) => Branch::new(name),
        None => repo.current_branch()?,
    };
    let commits = repo.commits_reachable_from(&branch)?;

    match args.format {
        OutputFormat::Json => {
            let lines: Vec<CommitLine> = commits.iter().map(CommitLine::from).collect();
            println!("{}", serde_json::to_string_pretty(&lines)?);
        }
        OutputFormat::Text => {
            for commit in &commits {
                println!(
                    "{} {} ({}, {})",
                    output.hash(commit.hash.short()),
                    commit.short_message,
                    commit.author.name,
                    commit.commit_date.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}

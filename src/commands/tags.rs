//! # Tags Command Implementation
//!
//! Lists the tags of an existing repository, oldest release first, and
//! marks the latest semantic-version release.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tandem::model::{Tag, TagKind};
use tandem::output::{OutputConfig, Status};
use tandem::repository::SystemGit;

use super::{open_existing, OutputFormat};

/// List tags and the latest release
#[derive(Args, Debug)]
pub struct TagsArgs {
    /// Repository directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct TagLine<'a> {
    name: &'a str,
    commit: &'a str,
    kind: TagKind,
    release_date: String,
    latest: bool,
}

/// Execute the `tags` command.
pub fn execute(args: TagsArgs, output: &OutputConfig) -> Result<()> {
    let git = SystemGit;
    let repo = open_existing(&git, &args.dir);
    let mut tags = repo.tags()?;
    tags.sort_by_key(|tag| tag.release_date);
    let latest = repo.latest_release_tag()?.map(|tag| tag.name);
    let is_latest = |tag: &Tag| latest.as_deref() == Some(tag.name.as_str());

    match args.format {
        OutputFormat::Json => {
            let lines: Vec<TagLine> = tags
                .iter()
                .map(|tag| TagLine {
                    name: &tag.name,
                    commit: tag.commit.hash.as_str(),
                    kind: tag.kind,
                    release_date: tag.release_date.to_rfc3339(),
                    latest: is_latest(tag),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&lines)?);
        }
        OutputFormat::Text => {
            if tags.is_empty() {
                println!("{} No tags", output.mark(Status::Skipped));
                return Ok(());
            }
            println!("{}", output.heading("Tags"));
            for tag in &tags {
                let marker = if is_latest(tag) { "  (latest release)" } else { "" };
                println!(
                    "  {} {} {}{}",
                    output.hash(tag.commit.hash.short()),
                    tag.release_date.format("%Y-%m-%d"),
                    tag.name,
                    marker
                );
            }
        }
    }
    Ok(())
}

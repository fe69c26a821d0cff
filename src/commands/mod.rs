//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `tandem`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `tandem` library.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use tandem::config::{LocalConfiguration, Settings};
use tandem::local::{LocalRepositoryManager, RepoRole};
use tandem::repository::GitOperations;

pub mod clone;
pub mod commits;
pub mod completions;
pub mod init;
pub mod origin;
pub mod tags;

/// How listing commands print their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per entry
    #[default]
    Text,
    /// A JSON array on stdout
    Json,
}

/// Loads settings from `path`, or from the default location.
pub(crate) fn load_settings(path: Option<&Path>) -> Result<Settings> {
    Settings::load(path).with_context(|| match path {
        Some(path) => format!("Failed to read settings from {}", path.display()),
        None => "Failed to read the default settings".to_string(),
    })
}

/// An opened manager for the existing repository at `dir`.
pub(crate) fn open_existing<'g>(
    git: &'g dyn GitOperations,
    dir: &Path,
) -> LocalRepositoryManager<'g> {
    let configuration = LocalConfiguration {
        project_dir_parent: PathBuf::from(dir),
        project_name: None,
        ..LocalConfiguration::default()
    };
    let mut manager = LocalRepositoryManager::new(git, configuration, RepoRole::Project);
    manager.open();
    manager
}

//! # Tandem
//!
//! Tandem keeps a local Git working copy, its hosted remote and an optional
//! wiki repository consistent. A caller states one intent, such as "create
//! both" or "clone both", and the library runs the ordered steps that get
//! there: initialising, committing, creating the hosted repository, setting
//! `origin`, pushing, and setting up tracking branches.
//!
//! ## Quick Example
//!
//! ```no_run
//! use tandem::config::Settings;
//! use tandem::orchestrator::Orchestrator;
//!
//! let mut orchestrator = Orchestrator::from_settings(Settings::default());
//! orchestrator.create_local_and_remote("/work", "alice", "demo", true, false);
//! let report = orchestrator.execute()?;
//! println!("ran {:?}", report.workflow);
//! # Ok::<(), tandem::error::Error>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: Local, remote and wiki settings, read from
//!   `tandem.yaml` and cross-defaulted during evaluation.
//! - **Local repositories (`local`)**: `LocalRepositoryManager` drives one
//!   working copy through the `GitOperations` trait (`repository`), whose
//!   default implementation runs the system `git` (`git`).
//! - **Remote repositories (`remote`)**: `RemoteRepositoryManager` drives one
//!   hosted repository through the `HostingApi` trait, with API tokens
//!   resolved per scope from properties (`properties`, `cache`).
//! - **Orchestration (`orchestrator`)**: Chooses and runs the workflow.
//!
//! ## Execution Flow
//!
//! 1.  **Evaluate**: Validate and cross-default the configurations, pick the
//!     workflow and resolve the remote for the configured provider.
//! 2.  **Execute**: Run the workflow's steps against the local repository
//!     and the remote, in a fixed order.
//! 3.  **Wiki**: Clone, create or verify the wiki, if it is active.

pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod local;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod properties;
pub mod remote;
pub mod repository;
pub mod sha;

#[cfg(test)]
pub(crate) mod test_support;

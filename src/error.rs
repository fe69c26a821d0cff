//! # Error Handling
//!
//! This module defines the centralized error type for `tandem`. It uses
//! `thiserror` to build a single `Error` enum covering every anticipated
//! failure mode, each variant carrying enough context (operation, path,
//! branch, repository) to diagnose a failure without walking a stack.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Configuration mistakes, conflict-policy
//!   refusals, collaborator failures and the wrappers the managers and the
//!   orchestrator add around them all live here.
//!
//! - **`ErrorKind`**: A coarse classification of an `Error`, so that callers
//!   can tell a configuration mistake (fix and retry) from a transient I/O
//!   failure (retry) from a policy refusal (needs explicit re-confirmation).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Collaborator errors are never passed through bare: the local and remote
//! managers wrap them in `Error::Local` / `Error::Remote`, and
//! `Orchestrator::execute` wraps anything that escapes a workflow in
//! `Error::Orchestration`. The original error stays reachable through
//! `std::error::Error::source`.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::PushResult;

/// Main error type for tandem operations
#[derive(Error, Debug)]
pub enum Error {
    /// Settings are invalid or incomplete. Detected before any I/O is done.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Configuration {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A string that was expected to be a full Git SHA was not one.
    #[error("A Git SHA must be in hex and 40 characters in length. '{value}' is {} characters", value.len())]
    InvalidSha { value: String },

    /// A clone was requested into a directory that already exists and the
    /// configured response is to fail.
    #[error("Git clone called, when the target directory already exists: {}", path.display())]
    CloneTargetExists { path: PathBuf },

    /// A destructive delete (directory or remote repository) was refused by
    /// its approver.
    #[error("Delete not approved: {target}")]
    DeleteNotApproved { target: String },

    /// A branch name did not resolve to a commit.
    #[error("Branch not found: '{branch}'")]
    BranchNotFound { branch: String },

    /// A push completed but at least one ref update was not accepted.
    #[error("Push rejected:\n{}", result.messages())]
    PushRejected { result: PushResult },

    /// After a label merge the remote label set does not match the desired set.
    #[error("Labels did not merge correctly: {}", differences.join(", "))]
    LabelMergeIncomplete { differences: Vec<String> },

    /// No properties loader could supply a value.
    #[error("No value found for property '{key}'. Add the property to a source an existing loader reads, or register another loader")]
    MissingProperty { key: String },

    /// The selected service provider does not support the operation.
    #[error("Unsupported service provider: {provider}")]
    UnsupportedProvider { provider: String },

    /// The local repository has not been opened, or holds no Git metadata.
    #[error("Git repository has not been initialised: {}", path.display())]
    NotInitialised { path: PathBuf },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {}: {command} - {stderr}", dir.display())]
    GitCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// An error reported by a hosting API implementation.
    #[error("Hosting API error: {operation} - {message}")]
    Hosting { operation: String, message: String },

    /// A local repository manager operation failed.
    #[error("Local repository operation '{operation}' failed for {target}")]
    Local {
        operation: String,
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// A remote repository manager operation failed.
    #[error("Remote repository operation '{operation}' failed for {repo}")]
    Remote {
        operation: String,
        repo: String,
        #[source]
        source: Box<Error>,
    },

    /// A workflow step failed during `Orchestrator::execute`.
    #[error("{message}")]
    Orchestration {
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A properties file parsing error, wrapped from `ini::Error`.
    #[error("Properties file error: {0}")]
    Ini(#[from] ini::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A regular expression compilation error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or incomplete settings; fix them before retrying.
    Configuration,
    /// I/O or collaborator failure; retrying may succeed.
    Transient,
    /// A safety policy refused the action; needs explicit re-confirmation.
    PolicyRefusal,
    /// An internal invariant did not hold.
    Invariant,
}

impl Error {
    /// Classifies this error. Wrapper variants report the kind of their cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. }
            | Error::MissingProperty { .. }
            | Error::UnsupportedProvider { .. }
            | Error::BranchNotFound { .. }
            | Error::Yaml(_)
            | Error::Ini(_)
            | Error::UrlParse(_) => ErrorKind::Configuration,
            Error::CloneTargetExists { .. } | Error::DeleteNotApproved { .. } => {
                ErrorKind::PolicyRefusal
            }
            Error::GitCommand { .. }
            | Error::Hosting { .. }
            | Error::PushRejected { .. }
            | Error::LabelMergeIncomplete { .. }
            | Error::Io(_) => ErrorKind::Transient,
            Error::InvalidSha { .. } | Error::NotInitialised { .. } | Error::Regex(_) => {
                ErrorKind::Invariant
            }
            Error::Local { source, .. }
            | Error::Remote { source, .. }
            | Error::Orchestration { source, .. } => source.kind(),
        }
    }

    /// Returns the innermost error, skipping manager and orchestration wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Local { source, .. }
            | Error::Remote { source, .. }
            | Error::Orchestration { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Shorthand for a configuration error without a hint.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            hint: None,
        }
    }

    pub(crate) fn local(operation: &str, target: impl Into<String>, source: Error) -> Self {
        Error::Local {
            operation: operation.to_string(),
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn remote(operation: &str, repo: impl Into<String>, source: Error) -> Self {
        Error::Remote {
            operation: operation.to_string(),
            repo: repo.into(),
            source: Box::new(source),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

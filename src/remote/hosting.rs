//! The hosting API seam.
//!
//! `HostingApi` is the narrow capability interface the remote manager drives:
//! repository, issue, label and branch calls against one hosting provider.
//! Every call receives an explicit [`ApiToken`] whose [`TokenScope`] says
//! which privilege the call needs, so an implementation never has to track a
//! "current" scope between calls.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Issue, Label};
use crate::sha::GitSha;

/// The privilege an API token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenScope {
    /// Issue and label work; no repository create or delete.
    Restricted,
    CreateRepo,
    DeleteRepo,
}

impl TokenScope {
    /// Whether a token of this scope may make a call that needs `needed`.
    /// A create token also covers restricted calls; a delete token covers
    /// only deletes.
    pub fn permits(&self, needed: TokenScope) -> bool {
        match self {
            TokenScope::Restricted => needed == TokenScope::Restricted,
            TokenScope::CreateRepo => {
                matches!(needed, TokenScope::Restricted | TokenScope::CreateRepo)
            }
            TokenScope::DeleteRepo => needed == TokenScope::DeleteRepo,
        }
    }
}

/// A token and the scope it was issued for.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken {
    pub scope: TokenScope,
    value: String,
}

impl ApiToken {
    pub fn new(scope: TokenScope, value: impl Into<String>) -> Self {
        Self {
            scope,
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("scope", &self.scope)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepoCoordinates {
    pub user: String,
    pub name: String,
}

impl RepoCoordinates {
    pub fn new(user: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user, self.name)
    }
}

/// Options for creating a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub coordinates: RepoCoordinates,
    pub private: bool,
    pub description: String,
    pub homepage: String,
}

/// A branch on the hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    pub name: String,
    pub head: GitSha,
}

/// Health of the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    Green,
    Yellow,
    Red,
}

impl ServiceStatus {
    /// Maps a status page indicator: `good` is green, `minor` is yellow and
    /// anything else is red.
    pub fn from_indicator(indicator: &str) -> Self {
        match indicator {
            "good" => ServiceStatus::Green,
            "minor" => ServiceStatus::Yellow,
            _ => ServiceStatus::Red,
        }
    }
}

/// Calls against one hosting provider's API.
pub trait HostingApi: Send + Sync {
    fn create_repo(&self, token: &ApiToken, repo: &NewRepository) -> Result<()>;

    fn delete_repo(&self, token: &ApiToken, repo: &RepoCoordinates) -> Result<()>;

    fn get_issue(&self, token: &ApiToken, repo: &RepoCoordinates, number: u64) -> Result<Issue>;

    /// Creates an issue, assigns it to `assignee` and applies `labels`.
    fn create_issue(
        &self,
        token: &ApiToken,
        repo: &RepoCoordinates,
        title: &str,
        body: &str,
        labels: &[String],
        assignee: &str,
    ) -> Result<Issue>;

    fn list_labels(&self, token: &ApiToken, repo: &RepoCoordinates) -> Result<Vec<Label>>;

    fn create_label(&self, token: &ApiToken, repo: &RepoCoordinates, label: &Label) -> Result<()>;

    fn update_label_color(
        &self,
        token: &ApiToken,
        repo: &RepoCoordinates,
        name: &str,
        color: &str,
    ) -> Result<()>;

    fn delete_label(&self, token: &ApiToken, repo: &RepoCoordinates, name: &str) -> Result<()>;

    /// Names of all repositories owned by `user`.
    fn list_repository_names(&self, token: &ApiToken, user: &str) -> Result<BTreeSet<String>>;

    fn list_branches(&self, token: &ApiToken, repo: &RepoCoordinates) -> Result<Vec<RemoteBranch>>;

    /// Reads the provider's status indicator.
    fn api_status(&self, token: &ApiToken) -> Result<ServiceStatus>;
}

/// A hosting API that is not connected to anything.
///
/// Every call fails with `Error::Hosting`. Used where only URL mapping is
/// needed, for example cloning from a known host.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineHosting;

impl OfflineHosting {
    fn unavailable<T>(operation: &str) -> Result<T> {
        Err(Error::Hosting {
            operation: operation.to_string(),
            message: "no hosting API client is configured".to_string(),
        })
    }
}

impl HostingApi for OfflineHosting {
    fn create_repo(&self, _token: &ApiToken, _repo: &NewRepository) -> Result<()> {
        Self::unavailable("create repo")
    }

    fn delete_repo(&self, _token: &ApiToken, _repo: &RepoCoordinates) -> Result<()> {
        Self::unavailable("delete repo")
    }

    fn get_issue(&self, _token: &ApiToken, _repo: &RepoCoordinates, _number: u64) -> Result<Issue> {
        Self::unavailable("get issue")
    }

    fn create_issue(
        &self,
        _token: &ApiToken,
        _repo: &RepoCoordinates,
        _title: &str,
        _body: &str,
        _labels: &[String],
        _assignee: &str,
    ) -> Result<Issue> {
        Self::unavailable("create issue")
    }

    fn list_labels(&self, _token: &ApiToken, _repo: &RepoCoordinates) -> Result<Vec<Label>> {
        Self::unavailable("list labels")
    }

    fn create_label(&self, _token: &ApiToken, _repo: &RepoCoordinates, _label: &Label) -> Result<()> {
        Self::unavailable("create label")
    }

    fn update_label_color(
        &self,
        _token: &ApiToken,
        _repo: &RepoCoordinates,
        _name: &str,
        _color: &str,
    ) -> Result<()> {
        Self::unavailable("update label")
    }

    fn delete_label(&self, _token: &ApiToken, _repo: &RepoCoordinates, _name: &str) -> Result<()> {
        Self::unavailable("delete label")
    }

    fn list_repository_names(&self, _token: &ApiToken, _user: &str) -> Result<BTreeSet<String>> {
        Self::unavailable("list repositories")
    }

    fn list_branches(&self, _token: &ApiToken, _repo: &RepoCoordinates) -> Result<Vec<RemoteBranch>> {
        Self::unavailable("list branches")
    }

    fn api_status(&self, _token: &ApiToken) -> Result<ServiceStatus> {
        Self::unavailable("api status")
    }
}

//! # Remote Repository Management
//!
//! [`RemoteRepositoryManager`] drives one hosted repository through a
//! [`HostingApi`]. It knows the repository's coordinates and URLs, and it
//! picks the API token each call needs:
//!
//! | Call                               | Token scope  |
//! |------------------------------------|--------------|
//! | create repository                  | `CreateRepo` |
//! | delete repository                  | `DeleteRepo` |
//! | labels, issues, branches, status   | `Restricted` |
//! | push credentials for local pushes  | `Restricted` |
//!
//! Tokens come from the [`PropertiesResolver`] and are cached per scope for
//! the lifetime of the manager.
//!
//! Deleting a hosted repository cannot be undone, so it is guarded by a
//! [`RemoteDeleteApprover`]. The default approver only agrees when
//! `confirm_delete` holds the exact confirmation phrase for the repository.

pub mod hosting;
pub mod labels;
pub mod memory;
pub mod resolver;
pub mod url;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::cache::TokenCache;
use crate::config::RemoteConfiguration;
use crate::error::{Error, Result};
use crate::model::{Issue, ServiceProvider};
use crate::properties::PropertiesResolver;
use crate::repository::Credentials;
use crate::sha::GitSha;

use self::hosting::{
    ApiToken, HostingApi, NewRepository, RemoteBranch, RepoCoordinates, ServiceStatus, TokenScope,
};
use self::labels::LabelReconciler;
use self::url::UrlMapper;

/// Words that, followed by an issue reference in a commit message, mark the
/// issue as fixed by that commit.
pub const FIX_WORDS: [&str; 9] = [
    "fix", "fixes", "fixed", "resolve", "resolves", "resolved", "close", "closes", "closed",
];

/// Decides whether the hosted repository may be deleted.
pub trait RemoteDeleteApprover {
    fn approve(&self, configuration: &RemoteConfiguration) -> bool;
}

/// Approves a delete only when `confirm_delete` equals
/// [`RemoteConfiguration::delete_confirmation_phrase`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationPhraseApprover;

impl RemoteDeleteApprover for ConfirmationPhraseApprover {
    fn approve(&self, configuration: &RemoteConfiguration) -> bool {
        configuration.confirm_delete == configuration.delete_confirmation_phrase()
    }
}

pub struct RemoteRepositoryManager {
    provider: ServiceProvider,
    configuration: RemoteConfiguration,
    hosting: Arc<dyn HostingApi>,
    properties: Arc<PropertiesResolver>,
    tokens: TokenCache,
    approver: Box<dyn RemoteDeleteApprover>,
}

impl RemoteRepositoryManager {
    pub fn new(
        provider: ServiceProvider,
        configuration: RemoteConfiguration,
        hosting: Arc<dyn HostingApi>,
        properties: Arc<PropertiesResolver>,
    ) -> Self {
        Self {
            provider,
            configuration,
            hosting,
            properties,
            tokens: TokenCache::new(),
            approver: Box::new(ConfirmationPhraseApprover),
        }
    }

    pub fn with_delete_approver(mut self, approver: Box<dyn RemoteDeleteApprover>) -> Self {
        self.approver = approver;
        self
    }

    pub fn provider(&self) -> ServiceProvider {
        self.provider
    }

    pub fn configuration(&self) -> &RemoteConfiguration {
        &self.configuration
    }

    /// Replaces the configuration snapshot, for example after it has been
    /// derived from a local origin.
    pub fn reconfigure(&mut self, configuration: RemoteConfiguration) {
        self.configuration = configuration;
    }

    pub fn coordinates(&self) -> RepoCoordinates {
        RepoCoordinates::new(
            self.configuration.repo_user.clone().unwrap_or_default(),
            self.configuration.repo_name.clone().unwrap_or_default(),
        )
    }

    pub fn urls(&self) -> UrlMapper {
        UrlMapper::from_configuration(self.provider, &self.configuration)
    }

    pub fn repo_base_url(&self) -> String {
        self.urls().repo_base_url()
    }

    pub fn clone_url(&self) -> String {
        self.urls().clone_url()
    }

    pub fn wiki_url(&self) -> String {
        self.urls().wiki_url()
    }

    pub fn wiki_clone_url(&self) -> String {
        self.urls().wiki_clone_url()
    }

    pub fn issues_url(&self) -> String {
        self.urls().issues_url()
    }

    pub fn tag_url(&self) -> String {
        self.urls().tag_url()
    }

    pub fn api_url(&self) -> &'static str {
        self.urls().api_url()
    }

    fn fail(&self, operation: &str, error: Error) -> Error {
        Error::remote(operation, self.configuration.full_name(), error)
    }

    fn token(&mut self, scope: TokenScope) -> Result<ApiToken> {
        let properties = Arc::clone(&self.properties);
        let provider = self.provider;
        self.tokens
            .get_or_resolve(scope, || properties.api_token(scope, provider))
    }

    /// Runs `f` with a token of `scope`, wrapping failures with `operation`.
    fn call<T>(
        &mut self,
        operation: &str,
        scope: TokenScope,
        f: impl FnOnce(&dyn HostingApi, &ApiToken, &RepoCoordinates) -> Result<T>,
    ) -> Result<T> {
        let token = self.token(scope).map_err(|e| self.fail(operation, e))?;
        let repo = self.coordinates();
        f(self.hosting.as_ref(), &token, &repo).map_err(|e| self.fail(operation, e))
    }

    /// Creates the hosted repository, private unless `public_project` is
    /// set, then merges the configured issue labels if `merge_issue_labels`
    /// is set.
    pub fn create_repo(&mut self) -> Result<()> {
        let request = NewRepository {
            coordinates: self.coordinates(),
            private: !self.configuration.public_project,
            description: self.configuration.project_description.clone(),
            homepage: self.configuration.project_home_page.clone(),
        };
        log::info!("creating remote repo {}", request.coordinates);
        self.call("Unable to create Repo", TokenScope::CreateRepo, |hosting, token, _| {
            hosting.create_repo(token, &request)
        })?;
        if self.configuration.merge_issue_labels {
            self.merge_labels()?;
        }
        Ok(())
    }

    /// Deletes the hosted repository, if the delete approver agrees.
    pub fn delete_repo(&mut self) -> Result<()> {
        if !self.approver.approve(&self.configuration) {
            log::warn!("Repo deletion not confirmed for {}", self.configuration.full_name());
            return Err(self.fail(
                "delete repo",
                Error::DeleteNotApproved {
                    target: self.configuration.full_name(),
                },
            ));
        }
        log::info!("deleting remote repo {}", self.configuration.full_name());
        self.call("delete repo", TokenScope::DeleteRepo, |hosting, token, repo| {
            hosting.delete_repo(token, repo)
        })
    }

    /// Merges the configured issue labels into the hosted repository.
    pub fn merge_labels(&mut self) -> Result<BTreeMap<String, String>> {
        let desired = self.configuration.issue_labels.clone();
        self.merge_labels_with(&desired)
    }

    pub fn merge_labels_with(
        &mut self,
        desired: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        self.call("merge labels", TokenScope::Restricted, |hosting, token, repo| {
            LabelReconciler::new(hosting, token, repo).merge(desired)
        })
    }

    /// The hosted repository's current labels.
    pub fn labels(&mut self) -> Result<BTreeMap<String, String>> {
        self.call("list labels", TokenScope::Restricted, |hosting, token, repo| {
            Ok(labels::labels_as_map(&hosting.list_labels(token, repo)?))
        })
    }

    /// Issue `number` of this repository.
    pub fn get_issue(&mut self, number: u64) -> Result<Issue> {
        self.call("get issue", TokenScope::Restricted, |hosting, token, repo| {
            hosting.get_issue(token, repo, number)
        })
    }

    /// Issue `number` of another repository on the same host.
    pub fn get_issue_from(&mut self, user: &str, name: &str, number: u64) -> Result<Issue> {
        let other = RepoCoordinates::new(user, name);
        self.call("get issue", TokenScope::Restricted, |hosting, token, _| {
            hosting.get_issue(token, &other, number)
        })
    }

    /// Creates an issue assigned to the repository owner.
    pub fn create_issue(&mut self, title: &str, body: &str, labels: &[String]) -> Result<Issue> {
        let assignee = self.configuration.repo_user.clone().unwrap_or_default();
        self.call("create issue", TokenScope::Restricted, |hosting, token, repo| {
            hosting.create_issue(token, repo, title, body, labels, &assignee)
        })
    }

    /// Names of every repository owned by `repo_user`.
    pub fn list_repository_names(&mut self) -> Result<BTreeSet<String>> {
        let user = self.configuration.repo_user.clone().unwrap_or_default();
        self.call("list repositories", TokenScope::Restricted, |hosting, token, _| {
            hosting.list_repository_names(token, &user)
        })
    }

    pub fn list_branches(&mut self) -> Result<Vec<RemoteBranch>> {
        self.call("list branches", TokenScope::Restricted, |hosting, token, repo| {
            hosting.list_branches(token, repo)
        })
    }

    pub fn has_branch(&mut self, name: &str) -> Result<bool> {
        Ok(self.list_branches()?.iter().any(|b| b.name == name))
    }

    /// The commit hosted branch `name` points at.
    pub fn head_commit(&mut self, name: &str) -> Result<GitSha> {
        self.list_branches()?
            .into_iter()
            .find(|b| b.name == name)
            .map(|b| b.head)
            .ok_or_else(|| {
                self.fail(
                    "head commit",
                    Error::BranchNotFound {
                        branch: name.to_string(),
                    },
                )
            })
    }

    /// Health of the hosting service. Any failure to read it, including a
    /// missing token, reports [`ServiceStatus::Red`].
    pub fn api_status(&mut self) -> ServiceStatus {
        match self.call("api status", TokenScope::Restricted, |hosting, token, _| {
            hosting.api_status(token)
        }) {
            Ok(status) => status,
            Err(e) => {
                log::error!("Unable to retrieve API status: {}", e);
                ServiceStatus::Red
            }
        }
    }

    /// Credentials for pushing to this repository: the restricted token as
    /// the user name and an empty password.
    pub fn push_credentials(&mut self) -> Result<Credentials> {
        let token = self
            .token(TokenScope::Restricted)
            .map_err(|e| self.fail("push credentials", e))?;
        Ok(Credentials::token(token.value()))
    }

    /// Whether `word` marks a referenced issue as fixed. Case is ignored.
    pub fn is_issue_fix_word(word: &str) -> bool {
        let word = word.to_lowercase();
        FIX_WORDS.contains(&word.as_str())
    }
}

//! In-memory hosting API.
//!
//! `InMemoryHosting` keeps repositories, labels, issues and branches in a
//! map and records every call it receives, so callers can assert on exactly
//! which mutations a workflow performed. It also enforces token scopes the
//! way a real provider would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{Issue, Label};
use crate::remote::hosting::{
    ApiToken, HostingApi, NewRepository, RemoteBranch, RepoCoordinates, ServiceStatus,
    TokenScope,
};
use crate::sha::GitSha;

/// One call received by [`InMemoryHosting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostingCall {
    CreateRepo(String),
    DeleteRepo(String),
    GetIssue(String, u64),
    CreateIssue(String, String),
    ListLabels(String),
    CreateLabel(String),
    UpdateLabelColor(String, String),
    DeleteLabel(String),
    ListRepositoryNames(String),
    ListBranches(String),
    ApiStatus,
}

impl HostingCall {
    /// Whether the call changes state on the host.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            HostingCall::CreateRepo(_)
                | HostingCall::DeleteRepo(_)
                | HostingCall::CreateIssue(..)
                | HostingCall::CreateLabel(_)
                | HostingCall::UpdateLabelColor(..)
                | HostingCall::DeleteLabel(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
struct HostedRepo {
    private: bool,
    description: String,
    homepage: String,
    labels: Vec<Label>,
    issues: Vec<Issue>,
    branches: Vec<RemoteBranch>,
}

#[derive(Debug)]
struct State {
    repos: BTreeMap<RepoCoordinates, HostedRepo>,
    calls: Vec<HostingCall>,
    failing_label_creates: BTreeSet<String>,
    status: ServiceStatus,
}

/// A hosting provider held entirely in memory.
#[derive(Debug)]
pub struct InMemoryHosting {
    base_url: String,
    state: Mutex<State>,
}

impl Default for InMemoryHosting {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHosting {
    pub fn new() -> Self {
        Self::with_base_url("github.com")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Mutex::new(State {
                repos: BTreeMap::new(),
                calls: Vec::new(),
                failing_label_creates: BTreeSet::new(),
                status: ServiceStatus::Green,
            }),
        }
    }

    /// Adds a repository carrying `labels`, without recording a call.
    pub fn with_repo(self, repo: RepoCoordinates, labels: &[(&str, &str)]) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.repos.insert(
                repo,
                HostedRepo {
                    labels: labels
                        .iter()
                        .map(|(name, color)| Label::new(*name, *color))
                        .collect(),
                    ..Default::default()
                },
            );
        }
        self
    }

    /// Makes every attempt to create label `name` fail.
    pub fn fail_label_creation(self, name: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failing_label_creates.insert(name.to_string());
        }
        self
    }

    pub fn set_status(&self, status: ServiceStatus) {
        if let Ok(mut state) = self.state.lock() {
            state.status = status;
        }
    }

    /// Points branch `name` of `repo` at `head`, creating it if needed.
    pub fn set_branch(&self, repo: &RepoCoordinates, name: &str, head: GitSha) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(hosted) = state.repos.get_mut(repo) {
                hosted.branches.retain(|b| b.name != name);
                hosted.branches.push(RemoteBranch {
                    name: name.to_string(),
                    head,
                });
            }
        }
    }

    pub fn calls(&self) -> Vec<HostingCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.clear();
        }
    }

    pub fn has_repo(&self, repo: &RepoCoordinates) -> bool {
        self.state
            .lock()
            .map(|state| state.repos.contains_key(repo))
            .unwrap_or(false)
    }

    /// Whether `repo` exists and was created private.
    pub fn is_private(&self, repo: &RepoCoordinates) -> Option<bool> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.repos.get(repo).map(|r| r.private))
    }

    /// Description and homepage `repo` was created with.
    pub fn repo_details(&self, repo: &RepoCoordinates) -> Option<(String, String)> {
        self.state.lock().ok().and_then(|state| {
            state
                .repos
                .get(repo)
                .map(|r| (r.description.clone(), r.homepage.clone()))
        })
    }

    fn lock(&self, operation: &str) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::Hosting {
            operation: operation.to_string(),
            message: "hosting state lock poisoned".to_string(),
        })
    }

    fn authorise(token: &ApiToken, needed: TokenScope, operation: &str) -> Result<()> {
        if token.scope.permits(needed) {
            Ok(())
        } else {
            Err(Error::Hosting {
                operation: operation.to_string(),
                message: format!("a {:?} token cannot perform a {:?} call", token.scope, needed),
            })
        }
    }

    fn repo_mut<'s>(
        state: &'s mut State,
        repo: &RepoCoordinates,
        operation: &str,
    ) -> Result<&'s mut HostedRepo> {
        state.repos.get_mut(repo).ok_or_else(|| Error::Hosting {
            operation: operation.to_string(),
            message: format!("repository {} not found", repo),
        })
    }
}

impl HostingApi for InMemoryHosting {
    fn create_repo(&self, token: &ApiToken, repo: &NewRepository) -> Result<()> {
        let mut state = self.lock("create repo")?;
        state
            .calls
            .push(HostingCall::CreateRepo(repo.coordinates.to_string()));
        Self::authorise(token, TokenScope::CreateRepo, "create repo")?;
        if state.repos.contains_key(&repo.coordinates) {
            return Err(Error::Hosting {
                operation: "create repo".to_string(),
                message: format!("repository {} already exists", repo.coordinates),
            });
        }
        state.repos.insert(
            repo.coordinates.clone(),
            HostedRepo {
                private: repo.private,
                description: repo.description.clone(),
                homepage: repo.homepage.clone(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn delete_repo(&self, token: &ApiToken, repo: &RepoCoordinates) -> Result<()> {
        let mut state = self.lock("delete repo")?;
        state.calls.push(HostingCall::DeleteRepo(repo.to_string()));
        Self::authorise(token, TokenScope::DeleteRepo, "delete repo")?;
        state.repos.remove(repo).map(|_| ()).ok_or_else(|| Error::Hosting {
            operation: "delete repo".to_string(),
            message: format!("repository {} not found", repo),
        })
    }

    fn get_issue(&self, token: &ApiToken, repo: &RepoCoordinates, number: u64) -> Result<Issue> {
        let mut state = self.lock("get issue")?;
        state
            .calls
            .push(HostingCall::GetIssue(repo.to_string(), number));
        Self::authorise(token, TokenScope::Restricted, "get issue")?;
        let hosted = Self::repo_mut(&mut state, repo, "get issue")?;
        hosted
            .issues
            .iter()
            .find(|i| i.number == number)
            .cloned()
            .ok_or_else(|| Error::Hosting {
                operation: "get issue".to_string(),
                message: format!("issue {} not found in {}", number, repo),
            })
    }

    fn create_issue(
        &self,
        token: &ApiToken,
        repo: &RepoCoordinates,
        title: &str,
        body: &str,
        labels: &[String],
        _assignee: &str,
    ) -> Result<Issue> {
        let base_url = self.base_url.clone();
        let mut state = self.lock("create issue")?;
        state
            .calls
            .push(HostingCall::CreateIssue(repo.to_string(), title.to_string()));
        Self::authorise(token, TokenScope::Restricted, "create issue")?;
        let hosted = Self::repo_mut(&mut state, repo, "create issue")?;
        let number = hosted.issues.len() as u64 + 1;
        let mut issue = Issue::new(
            number,
            title,
            format!("https://{}/{}/issues/{}", base_url, repo, number),
        );
        issue.body = body.to_string();
        issue.labels = labels.iter().cloned().collect();
        hosted.issues.push(issue.clone());
        Ok(issue)
    }

    fn list_labels(&self, token: &ApiToken, repo: &RepoCoordinates) -> Result<Vec<Label>> {
        let mut state = self.lock("list labels")?;
        state.calls.push(HostingCall::ListLabels(repo.to_string()));
        Self::authorise(token, TokenScope::Restricted, "list labels")?;
        Ok(Self::repo_mut(&mut state, repo, "list labels")?.labels.clone())
    }

    fn create_label(&self, token: &ApiToken, repo: &RepoCoordinates, label: &Label) -> Result<()> {
        let mut state = self.lock("create label")?;
        state.calls.push(HostingCall::CreateLabel(label.name.clone()));
        Self::authorise(token, TokenScope::Restricted, "create label")?;
        if state.failing_label_creates.contains(&label.name) {
            return Err(Error::Hosting {
                operation: "create label".to_string(),
                message: format!("label '{}' was refused", label.name),
            });
        }
        let hosted = Self::repo_mut(&mut state, repo, "create label")?;
        if hosted.labels.iter().any(|l| l.name == label.name) {
            return Err(Error::Hosting {
                operation: "create label".to_string(),
                message: format!("label '{}' already exists", label.name),
            });
        }
        hosted.labels.push(label.clone());
        Ok(())
    }

    fn update_label_color(
        &self,
        token: &ApiToken,
        repo: &RepoCoordinates,
        name: &str,
        color: &str,
    ) -> Result<()> {
        let mut state = self.lock("update label")?;
        state
            .calls
            .push(HostingCall::UpdateLabelColor(name.to_string(), color.to_string()));
        Self::authorise(token, TokenScope::Restricted, "update label")?;
        let hosted = Self::repo_mut(&mut state, repo, "update label")?;
        let label = hosted
            .labels
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| Error::Hosting {
                operation: "update label".to_string(),
                message: format!("label '{}' not found", name),
            })?;
        label.color = color.to_string();
        Ok(())
    }

    fn delete_label(&self, token: &ApiToken, repo: &RepoCoordinates, name: &str) -> Result<()> {
        let mut state = self.lock("delete label")?;
        state.calls.push(HostingCall::DeleteLabel(name.to_string()));
        Self::authorise(token, TokenScope::Restricted, "delete label")?;
        let hosted = Self::repo_mut(&mut state, repo, "delete label")?;
        hosted.labels.retain(|l| l.name != name);
        Ok(())
    }

    fn list_repository_names(&self, token: &ApiToken, user: &str) -> Result<BTreeSet<String>> {
        let mut state = self.lock("list repositories")?;
        state
            .calls
            .push(HostingCall::ListRepositoryNames(user.to_string()));
        Self::authorise(token, TokenScope::Restricted, "list repositories")?;
        Ok(state
            .repos
            .keys()
            .filter(|c| c.user == user)
            .map(|c| c.name.clone())
            .collect())
    }

    fn list_branches(&self, token: &ApiToken, repo: &RepoCoordinates) -> Result<Vec<RemoteBranch>> {
        let mut state = self.lock("list branches")?;
        state.calls.push(HostingCall::ListBranches(repo.to_string()));
        Self::authorise(token, TokenScope::Restricted, "list branches")?;
        Ok(Self::repo_mut(&mut state, repo, "list branches")?
            .branches
            .clone())
    }

    fn api_status(&self, token: &ApiToken) -> Result<ServiceStatus> {
        let mut state = self.lock("api status")?;
        state.calls.push(HostingCall::ApiStatus);
        Self::authorise(token, TokenScope::Restricted, "api status")?;
        Ok(state.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restricted() -> ApiToken {
        ApiToken::new(TokenScope::Restricted, "r")
    }

    fn demo() -> RepoCoordinates {
        RepoCoordinates::new("alice", "demo")
    }

    fn new_repo() -> NewRepository {
        NewRepository {
            coordinates: demo(),
            private: true,
            description: "A demo".to_string(),
            homepage: String::new(),
        }
    }

    #[test]
    fn test_create_repo_requires_create_scope() {
        let hosting = InMemoryHosting::new();
        let err = hosting.create_repo(&restricted(), &new_repo()).unwrap_err();
        assert!(matches!(err, Error::Hosting { .. }));
        assert!(!hosting.has_repo(&demo()));

        hosting
            .create_repo(&ApiToken::new(TokenScope::CreateRepo, "c"), &new_repo())
            .unwrap();
        assert!(hosting.has_repo(&demo()));
        assert_eq!(hosting.is_private(&demo()), Some(true));
    }

    #[test]
    fn test_create_repo_twice_fails() {
        let hosting = InMemoryHosting::new();
        let token = ApiToken::new(TokenScope::CreateRepo, "c");
        hosting.create_repo(&token, &new_repo()).unwrap();
        assert!(hosting.create_repo(&token, &new_repo()).is_err());
    }

    #[test]
    fn test_issues_are_numbered_per_repo() {
        let hosting = InMemoryHosting::new().with_repo(demo(), &[]);
        let first = hosting
            .create_issue(&restricted(), &demo(), "First", "", &["bug".to_string()], "alice")
            .unwrap();
        let second = hosting
            .create_issue(&restricted(), &demo(), "Second", "body", &[], "alice")
            .unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(second.html_url, "https://github.com/alice/demo/issues/2");
        assert!(first.labels.contains("bug"));

        let fetched = hosting.get_issue(&restricted(), &demo(), 2).unwrap();
        assert_eq!(fetched.title, "Second");
        assert!(hosting.get_issue(&restricted(), &demo(), 9).is_err());
    }

    #[test]
    fn test_calls_are_recorded() {
        let hosting = InMemoryHosting::new().with_repo(demo(), &[("bug", "000000")]);
        hosting.list_labels(&restricted(), &demo()).unwrap();
        hosting
            .update_label_color(&restricted(), &demo(), "bug", "ff0000")
            .unwrap();
        assert_eq!(
            hosting.calls(),
            vec![
                HostingCall::ListLabels("alice/demo".to_string()),
                HostingCall::UpdateLabelColor("bug".to_string(), "ff0000".to_string()),
            ]
        );
        assert_eq!(hosting.mutation_count(), 1);
    }

    #[test]
    fn test_list_repository_names_filters_by_user() {
        let hosting = InMemoryHosting::new()
            .with_repo(demo(), &[])
            .with_repo(RepoCoordinates::new("alice", "other"), &[])
            .with_repo(RepoCoordinates::new("bob", "demo"), &[]);
        let names = hosting.list_repository_names(&restricted(), "alice").unwrap();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["demo".to_string(), "other".to_string()]
        );
    }
}

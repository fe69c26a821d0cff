//! # Local Repository Management
//!
//! [`LocalRepositoryManager`] sequences the operations on one working copy:
//! creating or cloning it, committing, branching, tagging, pushing and
//! reading its history. The same manager type serves the project and its
//! wiki; [`RepoRole`] selects the few places where they differ.
//!
//! The manager applies three policies, each in its own module:
//!
//! - [`clone`]: what to do when a clone target already exists.
//! - [`tracking`]: making sure a branch tracks `origin` before it is pushed.
//! - [`history`]: which commits are reachable from a branch.
//!
//! Every failure is reported as `Error::Local`, naming the operation and the
//! project directory, with the underlying error as its source.

pub mod clone;
pub mod creator;
pub mod history;
pub mod tracking;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::LocalConfiguration;
use crate::error::{Error, Result};
use crate::git::parse_semver_tag;
use crate::model::{Branch, Commit, PushResult, Tag};
use crate::repository::{
    CheckoutRequest, Credentials, FastForwardMode, GitOperations, MergeRequest, MergeStrategy,
    PushRequest,
};
use crate::sha::GitSha;

use self::clone::{CloneAction, CloneConflictResolver, DeleteApprover, RefuseDeletes};
use self::creator::{ProjectCreator, ReadmeCreator};
use self::history::CommitGraphExtractor;
use self::tracking::TrackingBranchManager;

pub const ORIGIN: &str = "origin";

/// Which repository a manager looks after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoRole {
    Project,
    /// A hosted wiki. Pushes that fail are reported, not raised, because the
    /// host may not have the wiki enabled yet.
    Wiki,
}

/// What a local manager needs to know about its remote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteLink {
    pub active: bool,
    /// URL cloned from.
    pub clone_source: String,
    /// URL written to `remote.origin.url`.
    pub origin_url: String,
    /// Presented on push. Without them git's own credential setup is used.
    pub credentials: Option<Credentials>,
}

impl RemoteLink {
    pub fn inactive() -> Self {
        Self::default()
    }
}

pub struct LocalRepositoryManager<'g> {
    git: &'g dyn GitOperations,
    configuration: LocalConfiguration,
    role: RepoRole,
    remote: RemoteLink,
    approver: Box<dyn DeleteApprover + 'g>,
    creator: Box<dyn ProjectCreator + 'g>,
    is_open: bool,
}

fn no_content(_dir: &Path, _configuration: &LocalConfiguration) -> Result<()> {
    Ok(())
}

impl<'g> LocalRepositoryManager<'g> {
    /// A closed manager for `configuration`. Call [`open`](Self::open)
    /// before use.
    pub fn new(git: &'g dyn GitOperations, configuration: LocalConfiguration, role: RepoRole) -> Self {
        let creator: Box<dyn ProjectCreator + 'g> = match role {
            RepoRole::Project => Box::new(ReadmeCreator),
            RepoRole::Wiki => Box::new(no_content),
        };
        Self {
            git,
            configuration,
            role,
            remote: RemoteLink::inactive(),
            approver: Box::new(RefuseDeletes),
            creator,
            is_open: false,
        }
    }

    pub fn with_remote(mut self, remote: RemoteLink) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_delete_approver(mut self, approver: Box<dyn DeleteApprover + 'g>) -> Self {
        self.approver = approver;
        self
    }

    pub fn with_creator(mut self, creator: Box<dyn ProjectCreator + 'g>) -> Self {
        self.creator = creator;
        self
    }

    pub fn configuration(&self) -> &LocalConfiguration {
        &self.configuration
    }

    pub fn role(&self) -> RepoRole {
        self.role
    }

    pub fn project_dir(&self) -> PathBuf {
        self.configuration.project_dir()
    }

    pub fn open(&mut self) {
        log::debug!("opening {:?} repository at {}", self.role, self.project_dir().display());
        self.is_open = true;
    }

    /// Releases the repository. Further calls fail until it is opened again.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Whether the project directory holds a repository.
    pub fn is_initialised(&self) -> bool {
        self.git.is_repository(&self.project_dir())
    }

    fn fail(&self, operation: &str, error: Error) -> Error {
        Error::local(operation, self.project_dir().display().to_string(), error)
    }

    fn not_initialised(&self) -> Error {
        Error::NotInitialised {
            path: self.project_dir(),
        }
    }

    /// Runs `f` against the project directory once the manager is open,
    /// wrapping any failure with `operation`.
    fn run<T>(&self, operation: &str, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        if !self.is_open {
            return Err(self.fail(operation, self.not_initialised()));
        }
        let dir = self.project_dir();
        f(&dir).map_err(|e| self.fail(operation, e))
    }

    /// As [`run`](Self::run), and also requires an initialised repository.
    fn run_in_repo<T>(&self, operation: &str, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        self.run(operation, |dir| {
            if !self.git.is_repository(dir) {
                return Err(self.not_initialised());
            }
            f(dir)
        })
    }

    /// Creates the project directory, initialises a repository in it, runs
    /// the project creator and stages the result.
    pub fn create_and_initialise(&mut self) -> Result<()> {
        if !self.configuration.create {
            log::debug!("create_and_initialise ignored, 'create' is not set");
            return Ok(());
        }
        self.run("create", |dir| {
            log::info!(
                "creating local repo for project '{}'",
                self.configuration.project_name.as_deref().unwrap_or_default()
            );
            fs::create_dir_all(dir)?;
            self.git.init(dir)?;
            self.creator.create(dir, &self.configuration)?;
            self.git.add(dir, ".")
        })
    }

    /// Clones the remote into the project directory, applying the
    /// configured response when the directory already exists.
    ///
    /// Returns the action taken, or `None` if cloning is not configured.
    pub fn clone_remote(&mut self) -> Result<Option<CloneAction>> {
        if !self.configuration.clone_from_remote {
            log::debug!("clone_remote ignored, 'clone_from_remote' is not set");
            return Ok(None);
        }
        let source = self.remote.clone_source.clone();
        let action = self.run("clone", |dir| {
            let resolver = CloneConflictResolver::new(self.approver.as_ref());
            let action = resolver.resolve(dir, self.configuration.clone_exists_response)?;
            match action {
                CloneAction::Clone => {}
                CloneAction::DeleteThenClone => {
                    fs::remove_dir_all(dir)?;
                    log::debug!("'{}' deleted", dir.display());
                }
                CloneAction::Pull => {
                    self.git.pull(dir, ORIGIN, None)?;
                    return Ok(action);
                }
            }
            log::info!("cloning {} into {}", source, dir.display());
            self.git.clone_repo(&source, dir)?;
            Ok(action)
        })?;
        Ok(Some(action))
    }

    /// Pulls the current branch.
    pub fn pull(&self) -> Result<()> {
        self.run_in_repo("pull", |dir| self.git.pull(dir, ORIGIN, None))
    }

    pub fn pull_branch(&self, name: &str) -> Result<()> {
        self.run_in_repo("pull", |dir| self.git.pull(dir, ORIGIN, Some(name)))
    }

    /// Hash of the commit `HEAD` points at.
    pub fn current_commit_hash(&self) -> Result<GitSha> {
        self.run_in_repo("current commit", |dir| {
            self.git
                .resolve_ref(dir, "HEAD")?
                .ok_or_else(|| Error::BranchNotFound {
                    branch: "HEAD".to_string(),
                })
        })
    }

    /// Stages `path`, which is relative to the project directory.
    pub fn add(&self, path: &Path) -> Result<()> {
        self.run_in_repo("add", |dir| {
            if !dir.join(path).exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", dir.join(path).display()),
                )));
            }
            self.git.add(dir, &path.to_string_lossy())
        })
    }

    pub fn commit(&self, message: &str) -> Result<GitSha> {
        log::info!("Git commit with message '{}'", message);
        self.run_in_repo("commit", |dir| {
            self.git
                .commit(dir, message, self.configuration.tagger().as_ref())
        })
    }

    pub fn branches(&self) -> Result<Vec<Branch>> {
        self.run_in_repo("list branches", |dir| self.git.branches(dir))
    }

    pub fn current_branch(&self) -> Result<Branch> {
        self.run_in_repo("current branch", |dir| self.git.current_branch(dir))
    }

    pub fn develop_branch(&self) -> Branch {
        Branch::develop()
    }

    pub fn master_branch(&self) -> Branch {
        Branch::master()
    }

    fn tracking<'a>(&'a self, dir: &'a Path) -> TrackingBranchManager<'a> {
        TrackingBranchManager::new(self.git, dir, self.remote.active)
    }

    /// Creates `branch` and checks it out. When the remote is active and
    /// the branch gets a new upstream, it is pushed (forced, with tags) so
    /// that it exists on the remote.
    pub fn checkout_new_branch(&self, branch: &Branch) -> Result<()> {
        log::info!("checking out a new branch '{}'", branch);
        let created_tracking = self.run_in_repo("checkout new branch", |dir| {
            self.git
                .checkout(dir, &CheckoutRequest::new_branch(&branch.name))?;
            self.tracking(dir).ensure_tracking(branch)
        })?;
        if created_tracking {
            self.push(true, true)?;
        }
        Ok(())
    }

    pub fn checkout_branch(&self, branch: &Branch) -> Result<()> {
        log::info!("checking out existing branch '{}'", branch);
        self.run_in_repo("checkout branch", |dir| {
            self.git
                .checkout(dir, &CheckoutRequest::existing(&branch.name))
        })
    }

    /// Checks out `sha` with a detached `HEAD`.
    pub fn checkout_commit(&self, sha: &GitSha) -> Result<()> {
        log::info!("checking out Git hash: '{}'", sha);
        self.run_in_repo("checkout commit", |dir| {
            self.git.checkout(dir, &CheckoutRequest::existing(sha.as_str()))
        })
    }

    /// Creates `branch` at `sha` and checks it out.
    pub fn checkout_commit_to_branch(&self, sha: &GitSha, branch: &str) -> Result<()> {
        log::info!("checking out Git hash: '{}' to branch '{}'", sha, branch);
        self.run_in_repo("checkout commit", |dir| {
            self.git.checkout(
                dir,
                &CheckoutRequest::new_branch(branch).start_point(sha.as_str()),
            )
        })
    }

    /// Creates a local branch tracking `origin/<branch>` and checks it out.
    pub fn checkout_remote_branch(&self, branch: &Branch) -> Result<()> {
        self.run_in_repo("checkout remote branch", |dir| {
            self.git.checkout(
                dir,
                &CheckoutRequest::new_branch(&branch.name)
                    .start_point(format!("{}/{}", ORIGIN, branch.name))
                    .tracking(),
            )
        })
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        log::info!("creating branch '{}'", name);
        self.run_in_repo("create branch", |dir| self.git.create_branch(dir, name, None))
    }

    /// Merges `branch` into the current branch, committing as the tagger
    /// when a merge commit is needed.
    pub fn merge_branch(
        &self,
        branch: &Branch,
        strategy: MergeStrategy,
        fast_forward: FastForwardMode,
    ) -> Result<()> {
        log::info!("merging branch '{}' ({:?}, {:?})", branch, strategy, fast_forward);
        let request = MergeRequest::new(&branch.name)
            .strategy(strategy)
            .fast_forward(fast_forward);
        self.run_in_repo("merge", |dir| {
            self.git
                .merge(dir, &request, self.configuration.tagger().as_ref())
        })
    }

    pub fn get_origin(&self) -> Result<String> {
        self.run_in_repo("get origin", |dir| {
            self.git
                .config_get(dir, &format!("remote.{}.url", ORIGIN))?
                .ok_or_else(|| {
                    Error::configuration(format!(
                        "No origin has been defined for {}",
                        dir.display()
                    ))
                })
        })
    }

    /// Points `origin` at the remote's URL.
    pub fn set_origin(&self) -> Result<()> {
        let url = self.remote.origin_url.clone();
        self.set_origin_to(&url)
    }

    pub fn set_origin_to(&self, url: &str) -> Result<()> {
        log::debug!("setting {:?} origin to '{}'", self.role, url);
        self.run_in_repo("set origin", |dir| {
            self.git
                .config_set(dir, &format!("remote.{}.url", ORIGIN), url)?;
            self.git.config_set(
                dir,
                &format!("remote.{}.fetch", ORIGIN),
                &format!("+refs/heads/*:refs/remotes/{}/*", ORIGIN),
            )
        })
    }

    fn push_request(&self) -> PushRequest {
        let mut request = PushRequest::new(ORIGIN);
        request.credentials = self.remote.credentials.clone();
        request
    }

    fn send(&self, dir: &Path, request: &PushRequest) -> Result<PushResult> {
        let result = self.git.push(dir, request)?;
        if result.is_successful() {
            Ok(result)
        } else {
            Err(Error::PushRejected { result })
        }
    }

    /// Pushes the current branch to `origin`, setting up tracking first if
    /// the branch has none.
    ///
    /// For a wiki a failed push is logged and returned as a result with
    /// `local_failure` set, since the host may require the wiki to be
    /// enabled by hand before anything can be pushed.
    pub fn push(&self, tags: bool, force: bool) -> Result<PushResult> {
        log::info!("pushing to remote, with tags='{}' and force='{}'", tags, force);
        let pushed = self.run_in_repo("push", |dir| {
            let branch = self.git.current_branch(dir)?;
            if !branch.name.is_empty() {
                self.tracking(dir).ensure_tracking(&branch)?;
            }
            let mut request = self.push_request().refspec(branch.name.clone());
            request.tags = tags;
            request.force = force;
            self.send(dir, &request)
        });
        match (pushed, self.role) {
            (Err(e), RepoRole::Wiki) => {
                log::warn!(
                    "Pushing the wiki failed. If the remote is GitHub, a wiki has to be manually enabled \
                     before anything can be pushed to it. The cause was: {}",
                    e
                );
                Ok(PushResult::local_failure())
            }
            (pushed, _) => pushed,
        }
    }

    pub fn push_tag(&self, name: &str) -> Result<PushResult> {
        log::info!("pushing tag {}", name);
        self.run_in_repo("push tag", |dir| {
            let request = self
                .push_request()
                .refspec(format!("refs/tags/{}:refs/tags/{}", name, name));
            self.send(dir, &request)
        })
    }

    pub fn push_all_tags(&self) -> Result<PushResult> {
        log::info!("pushing all tags");
        self.run_in_repo("push tags", |dir| {
            let request = self.push_request().refspec("refs/tags/*:refs/tags/*");
            self.send(dir, &request)
        })
    }

    /// Creates an annotated tag on `HEAD`, signed by the configured tagger.
    pub fn tag(&self, name: &str, body: &str) -> Result<()> {
        self.run_in_repo("tag", |dir| {
            let tagger = self.configuration.tagger().ok_or_else(|| Error::Configuration {
                message: "an annotated tag needs a tagger".to_string(),
                hint: Some("set tagger_name and tagger_email, or the matching properties".to_string()),
            })?;
            self.git.tag_annotated(dir, name, body, &tagger)
        })
    }

    pub fn tag_lightweight(&self, name: &str) -> Result<()> {
        self.run_in_repo("tag", |dir| self.git.tag_lightweight(dir, name))
    }

    /// All tags with their commits resolved.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        self.run_in_repo("list tags", |dir| {
            let records = self.git.tags(dir)?;
            if records.is_empty() {
                return Ok(Vec::new());
            }
            let commits = self.git.all_commits(dir)?;
            let mut tags = Vec::with_capacity(records.len());
            for record in records {
                match commits.iter().find(|c| c.hash == record.commit) {
                    Some(commit) => tags.push(Tag::from_record(record, commit.clone())),
                    None => log::debug!(
                        "tag '{}' points at {} which is not in the log",
                        record.name,
                        record.commit
                    ),
                }
            }
            Ok(tags)
        })
    }

    /// The tag with the highest semantic version, ignoring tags that are
    /// not versions.
    pub fn latest_release_tag(&self) -> Result<Option<Tag>> {
        Ok(self
            .tags()?
            .into_iter()
            .filter_map(|t| parse_semver_tag(&t.name).map(|v| (v, t)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, t)| t))
    }

    /// A pseudo tag on the head of `branch`, for a build not yet released.
    pub fn current_build_tag(&self, branch: &Branch) -> Result<Tag> {
        Ok(Tag::current_build(self.head_commit(branch)?))
    }

    pub fn commits_reachable_from(&self, branch: &Branch) -> Result<Vec<Commit>> {
        self.run_in_repo("read commits", |dir| {
            CommitGraphExtractor::new(self.git, dir).commits_reachable_from(branch)
        })
    }

    pub fn develop_commits(&self) -> Result<Vec<Commit>> {
        self.commits_reachable_from(&Branch::develop())
    }

    pub fn master_commits(&self) -> Result<Vec<Commit>> {
        self.commits_reachable_from(&Branch::master())
    }

    pub fn head_commit(&self, branch: &Branch) -> Result<Commit> {
        self.run_in_repo("head commit", |dir| {
            CommitGraphExtractor::new(self.git, dir).head_commit(branch)
        })
    }

    pub fn head_commit_sha(&self, branch: &Branch) -> Result<GitSha> {
        self.run_in_repo("head commit", |dir| {
            CommitGraphExtractor::new(self.git, dir).head_sha(branch)
        })
    }

    pub fn head_develop_commit_sha(&self) -> Result<GitSha> {
        self.head_commit_sha(&Branch::develop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloneExistsResponse;
    use crate::model::{Identity, RefUpdateStatus, TagKind};
    use crate::test_support::{FakeGit, FakeRepo, Head};
    use tempfile::TempDir;

    const REMOTE_URL: &str = "https://github.com/alice/demo.git";

    fn configuration(temp: &TempDir) -> LocalConfiguration {
        LocalConfiguration {
            create: true,
            project_dir_parent: temp.path().to_path_buf(),
            project_name: Some("demo".to_string()),
            tagger_name: Some("Tess".to_string()),
            tagger_email: Some("tess@example.com".to_string()),
            ..Default::default()
        }
    }

    fn link() -> RemoteLink {
        RemoteLink {
            active: true,
            clone_source: "https://github.com/alice/demo".to_string(),
            origin_url: REMOTE_URL.to_string(),
            credentials: Some(Credentials::token("t")),
        }
    }

    fn created<'g>(git: &'g FakeGit, temp: &TempDir) -> LocalRepositoryManager<'g> {
        let mut manager =
            LocalRepositoryManager::new(git, configuration(temp), RepoRole::Project).with_remote(link());
        manager.open();
        manager.create_and_initialise().unwrap();
        manager
    }

    #[test]
    fn test_closed_manager_fails() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let mut manager = LocalRepositoryManager::new(&git, configuration(&temp), RepoRole::Project);
        let err = manager.create_and_initialise().unwrap_err();
        assert!(matches!(err, Error::Local { ref operation, .. } if operation == "create"));
        assert!(matches!(err.root_cause(), Error::NotInitialised { .. }));

        manager.open();
        manager.create_and_initialise().unwrap();
        manager.close();
        assert!(manager.branches().is_err());
    }

    #[test]
    fn test_create_and_initialise_writes_readme_and_stages() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        let dir = temp.path().join("demo");
        assert!(dir.join("README.md").exists());
        assert!(manager.is_initialised());
        assert_eq!(git.repo(&dir).staged, vec![".".to_string()]);
    }

    #[test]
    fn test_commit_uses_tagger_identity() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        let sha = manager.commit("Initial commit").unwrap();
        let head = manager.head_commit(&Branch::master()).unwrap();
        assert_eq!(head.hash, sha);
        assert_eq!(head.author, Identity::new("Tess", "tess@example.com"));
        assert_eq!(manager.current_commit_hash().unwrap(), sha);
    }

    #[test]
    fn test_checkout_new_branch_tracks_and_force_pushes() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        manager.commit("Initial commit").unwrap();
        manager.set_origin().unwrap();
        manager.checkout_new_branch(&Branch::develop()).unwrap();

        assert_eq!(manager.current_branch().unwrap(), Branch::develop());
        assert!(git
            .calls()
            .contains(&"push origin develop tags force credentials".to_string()));
        let repo = git.repo(&temp.path().join("demo"));
        assert_eq!(
            repo.config.get("remote.origin.url").map(String::as_str),
            Some(REMOTE_URL)
        );
    }

    #[test]
    fn test_checkout_new_branch_without_remote_does_not_push() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let mut manager = LocalRepositoryManager::new(&git, configuration(&temp), RepoRole::Project);
        manager.open();
        manager.create_and_initialise().unwrap();
        manager.commit("Initial commit").unwrap();
        manager.checkout_new_branch(&Branch::develop()).unwrap();
        assert!(!git.called("push"));
    }

    fn local_only<'g>(git: &'g FakeGit, temp: &TempDir) -> LocalRepositoryManager<'g> {
        let mut manager = LocalRepositoryManager::new(git, configuration(temp), RepoRole::Project);
        manager.open();
        manager.create_and_initialise().unwrap();
        manager.commit("Initial commit").unwrap();
        manager.checkout_new_branch(&Branch::develop()).unwrap();
        manager.commit("Add feature").unwrap();
        manager.checkout_branch(&Branch::master()).unwrap();
        manager
    }

    #[test]
    fn test_merge_branch_fast_forwards() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = local_only(&git, &temp);

        manager
            .merge_branch(&Branch::develop(), MergeStrategy::Theirs, FastForwardMode::Allow)
            .unwrap();
        assert_eq!(
            manager.head_commit_sha(&Branch::master()).unwrap(),
            manager.head_develop_commit_sha().unwrap()
        );
        assert!(git.calls().contains(&"merge develop --ff".to_string()));
    }

    #[test]
    fn test_merge_branch_after_divergence() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = local_only(&git, &temp);
        let hotfix = manager.commit("Hotfix").unwrap();

        let err = manager
            .merge_branch(&Branch::develop(), MergeStrategy::Default, FastForwardMode::Only)
            .unwrap_err();
        assert!(matches!(err, Error::Local { ref operation, .. } if operation == "merge"));
        assert_eq!(manager.head_commit_sha(&Branch::master()).unwrap(), hotfix);

        manager
            .merge_branch(&Branch::develop(), MergeStrategy::Ours, FastForwardMode::Never)
            .unwrap();
        let head = manager.head_commit(&Branch::master()).unwrap();
        assert_eq!(head.short_message, "Merge branch 'develop'");
        assert_eq!(head.author, Identity::new("Tess", "tess@example.com"));
        let repo = git.repo(&temp.path().join("demo"));
        assert_eq!(
            repo.parents[&head.hash],
            vec![hotfix, manager.head_develop_commit_sha().unwrap()]
        );
    }

    #[test]
    fn test_merge_unknown_branch_fails() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = local_only(&git, &temp);
        let err = manager
            .merge_branch(&Branch::new("missing"), MergeStrategy::Theirs, FastForwardMode::Allow)
            .unwrap_err();
        assert!(matches!(err.root_cause(), Error::GitCommand { .. }));
    }

    #[test]
    fn test_rejected_push() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        manager.commit("Initial commit").unwrap();
        *git.push_status.lock().unwrap() = Some(RefUpdateStatus::RejectedNonFastForward);

        let err = manager.push(false, false).unwrap_err();
        match err.root_cause() {
            Error::PushRejected { result } => assert!(!result.is_successful()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wiki_push_failure_is_reported_not_raised() {
        testing_logger::setup();
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let mut configuration = configuration(&temp);
        configuration.project_name = Some("demo.wiki".to_string());
        let mut wiki =
            LocalRepositoryManager::new(&git, configuration, RepoRole::Wiki).with_remote(link());
        wiki.open();
        wiki.create_and_initialise().unwrap();
        wiki.commit("Initial commit").unwrap();
        *git.fail_push.lock().unwrap() = true;

        let result = wiki.push(false, false).unwrap();
        assert!(result.local_failure);
        assert!(!result.is_successful());
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|l| l.level == log::Level::Warn && l.body.contains("manually enabled")));
        });
        // the wiki gets no README
        assert!(!temp.path().join("demo.wiki").join("README.md").exists());
    }

    #[test]
    fn test_clone_into_missing_directory() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new().with_remote("https://github.com/alice/demo", FakeRepo::default());
        let mut configuration = configuration(&temp);
        configuration.create = false;
        configuration.clone_from_remote = true;
        let mut manager =
            LocalRepositoryManager::new(&git, configuration, RepoRole::Project).with_remote(link());
        manager.open();
        assert_eq!(manager.clone_remote().unwrap(), Some(CloneAction::Clone));
        assert!(manager.is_initialised());
    }

    #[test]
    fn test_clone_with_existing_directory_and_exception_response() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("keep.txt"), "keep").unwrap();
        let git = FakeGit::new().with_remote("https://github.com/alice/demo", FakeRepo::default());
        let mut configuration = configuration(&temp);
        configuration.create = false;
        configuration.clone_from_remote = true;
        let mut manager =
            LocalRepositoryManager::new(&git, configuration, RepoRole::Project).with_remote(link());
        manager.open();

        let err = manager.clone_remote().unwrap_err();
        assert!(matches!(err.root_cause(), Error::CloneTargetExists { .. }));
        assert!(dir.join("keep.txt").exists());
        assert!(!git.called("clone"));
    }

    #[test]
    fn test_clone_delete_then_clone_when_approved() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("old.txt"), "old").unwrap();
        let git = FakeGit::new().with_remote("https://github.com/alice/demo", FakeRepo::default());
        let mut configuration = configuration(&temp);
        configuration.create = false;
        configuration.clone_from_remote = true;
        configuration.clone_exists_response = CloneExistsResponse::Delete;
        let mut manager = LocalRepositoryManager::new(&git, configuration, RepoRole::Project)
            .with_remote(link())
            .with_delete_approver(Box::new(|_: &Path| true));
        manager.open();

        assert_eq!(
            manager.clone_remote().unwrap(),
            Some(CloneAction::DeleteThenClone)
        );
        assert!(!dir.join("old.txt").exists());
        assert!(git.called("clone"));
    }

    #[test]
    fn test_clone_pull_response() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        git.seed(&temp.path().join("demo"));
        let mut configuration = configuration(&temp);
        configuration.create = false;
        configuration.clone_from_remote = true;
        configuration.clone_exists_response = CloneExistsResponse::Pull;
        let mut manager = LocalRepositoryManager::new(&git, configuration, RepoRole::Project);
        manager.open();
        assert_eq!(manager.clone_remote().unwrap(), Some(CloneAction::Pull));
        assert_eq!(git.calls(), vec!["pull origin".to_string()]);
    }

    #[test]
    fn test_tags_and_latest_release() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        manager.commit("Initial commit").unwrap();
        manager.tag_lightweight("v0.9.0").unwrap();
        manager.commit("Second").unwrap();
        manager.tag("v0.10.0", "Release 0.10").unwrap();
        manager.tag_lightweight("nightly").unwrap();

        let tags = manager.tags().unwrap();
        assert_eq!(tags.len(), 3);
        let annotated = tags.iter().find(|t| t.name == "v0.10.0").unwrap();
        assert_eq!(annotated.kind, TagKind::Annotated);
        assert_eq!(annotated.tagger.name, "Tess");
        assert_eq!(annotated.full_message, "Release 0.10");

        let lightweight = tags.iter().find(|t| t.name == "v0.9.0").unwrap();
        assert_eq!(lightweight.kind, TagKind::Lightweight);
        assert_eq!(lightweight.tagger, lightweight.commit.committer);
        assert!(lightweight.full_message.is_empty());

        assert_eq!(manager.latest_release_tag().unwrap().unwrap().name, "v0.10.0");
    }

    #[test]
    fn test_annotated_tag_needs_tagger() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let mut configuration = configuration(&temp);
        configuration.tagger_email = None;
        let mut manager = LocalRepositoryManager::new(&git, configuration, RepoRole::Project);
        manager.open();
        manager.create_and_initialise().unwrap();
        manager.commit("Initial commit").unwrap();
        let err = manager.tag("v1.0.0", "Release").unwrap_err();
        assert!(matches!(err.root_cause(), Error::Configuration { .. }));
    }

    #[test]
    fn test_current_build_tag_on_develop() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        manager.commit("Initial commit").unwrap();
        manager.create_branch("develop").unwrap();
        let tag = manager.current_build_tag(&Branch::develop()).unwrap();
        assert_eq!(tag.name, Tag::CURRENT_BUILD);
        assert_eq!(tag.kind, TagKind::Pseudo);
        assert_eq!(tag.url_segment(), "develop");
    }

    #[test]
    fn test_checkout_commit_detaches_head() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        let first = manager.commit("Initial commit").unwrap();
        manager.commit("Second").unwrap();

        manager.checkout_commit(&first).unwrap();
        assert_eq!(
            git.repo(&temp.path().join("demo")).head,
            Head::Detached(first.clone())
        );

        manager.checkout_commit_to_branch(&first, "hotfix").unwrap();
        assert_eq!(manager.current_branch().unwrap(), Branch::new("hotfix"));
        assert_eq!(manager.head_commit_sha(&Branch::new("hotfix")).unwrap(), first);
    }

    #[test]
    fn test_get_origin_without_origin() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        let err = manager.get_origin().unwrap_err();
        assert!(err.root_cause().to_string().contains("No origin has been defined"));
    }

    #[test]
    fn test_add_missing_file() {
        let temp = TempDir::new().unwrap();
        let git = FakeGit::new();
        let manager = created(&git, &temp);
        assert!(manager.add(Path::new("missing.txt")).is_err());
        manager.add(Path::new("README.md")).unwrap();
    }
}

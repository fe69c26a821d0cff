//! # Local Git Capability
//!
//! The local managers never run Git themselves. They go through
//! [`GitOperations`], a narrow trait covering the handful of operations the
//! workflows need: init and clone, staging and committing, branches and
//! checkout, push, pull and merge, tags, config, and history queries.
//!
//! Every method takes the working directory explicitly, so one
//! implementation can serve the project and the wiki at the same time.
//!
//! [`SystemGit`] is the implementation used outside tests. It wraps the free
//! functions in [`crate::git`], which drive the system `git` executable. In
//! unit tests the managers are given a recording fake instead.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::model::{Branch, Commit, Identity, PushResult, TagRecord};
use crate::sha::GitSha;

/// Whether a checkout should configure an upstream for the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamMode {
    #[default]
    NoTrack,
    /// Track `origin/<branch>`, writing `branch.<name>.remote` and
    /// `branch.<name>.merge`.
    SetUpstream,
}

/// Arguments to [`GitOperations::checkout`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutRequest {
    /// A branch name, or a commit to check out detached.
    pub target: String,
    /// Create `target` as a new branch before switching to it.
    pub create: bool,
    pub upstream: UpstreamMode,
    /// Where a newly created branch starts. Defaults to `HEAD`.
    pub start_point: Option<String>,
}

impl CheckoutRequest {
    /// Switch to an existing branch or commit.
    pub fn existing(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Create `name` and switch to it.
    pub fn new_branch(name: impl Into<String>) -> Self {
        Self {
            target: name.into(),
            create: true,
            ..Default::default()
        }
    }

    pub fn start_point(mut self, start_point: impl Into<String>) -> Self {
        self.start_point = Some(start_point.into());
        self
    }

    pub fn tracking(mut self) -> Self {
        self.upstream = UpstreamMode::SetUpstream;
        self
    }
}

/// How [`GitOperations::merge`] may use fast-forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FastForwardMode {
    /// Fast-forward when possible, otherwise create a merge commit.
    #[default]
    Allow,
    /// Fail unless the merge is a fast-forward.
    Only,
    /// Always create a merge commit.
    Never,
}

impl FastForwardMode {
    pub fn flag(self) -> &'static str {
        match self {
            FastForwardMode::Allow => "--ff",
            FastForwardMode::Only => "--ff-only",
            FastForwardMode::Never => "--no-ff",
        }
    }
}

/// Conflict handling for a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Let `git` choose.
    Default,
    Resolve,
    /// Keep the current branch's tree, recording the other side as merged.
    Ours,
    /// Resolve conflicting hunks in favour of the branch being merged in.
    #[default]
    Theirs,
}

impl MergeStrategy {
    /// Arguments selecting this strategy on the `git merge` command line.
    pub fn args(self) -> &'static [&'static str] {
        match self {
            MergeStrategy::Default => &[],
            MergeStrategy::Resolve => &["-s", "resolve"],
            MergeStrategy::Ours => &["-s", "ours"],
            MergeStrategy::Theirs => &["-X", "theirs"],
        }
    }
}

/// Arguments to [`GitOperations::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// The branch merged into the current one.
    pub branch: String,
    pub strategy: MergeStrategy,
    pub fast_forward: FastForwardMode,
}

impl MergeRequest {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            strategy: MergeStrategy::default(),
            fast_forward: FastForwardMode::default(),
        }
    }

    pub fn strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn fast_forward(mut self, fast_forward: FastForwardMode) -> Self {
        self.fast_forward = fast_forward;
        self
    }
}

/// Username and password presented when pushing over HTTPS.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Hosted providers accept an API token as the username with an empty
    /// password.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            username: token.into(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Arguments to [`GitOperations::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub remote: String,
    /// Refspecs to push. Empty means the current branch.
    pub refspecs: Vec<String>,
    pub tags: bool,
    pub force: bool,
    pub credentials: Option<Credentials>,
}

impl PushRequest {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            refspecs: Vec::new(),
            tags: false,
            force: false,
            credentials: None,
        }
    }

    pub fn refspec(mut self, refspec: impl Into<String>) -> Self {
        self.refspecs.push(refspec.into());
        self
    }
}

/// Trait for local git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Whether `dir` is the root of a work tree with a `.git` directory.
    fn is_repository(&self, dir: &Path) -> bool;

    /// Initialises a repository in `dir` whose first branch is `master`.
    fn init(&self, dir: &Path) -> Result<()>;

    /// Clones `url` into `dir`, which must not exist.
    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()>;

    fn add(&self, dir: &Path, pathspec: &str) -> Result<()>;

    /// Commits the index, allowing an empty commit, and returns its hash.
    fn commit(&self, dir: &Path, message: &str, identity: Option<&Identity>) -> Result<GitSha>;

    fn branches(&self, dir: &Path) -> Result<Vec<Branch>>;

    fn current_branch(&self, dir: &Path) -> Result<Branch>;

    fn checkout(&self, dir: &Path, request: &CheckoutRequest) -> Result<()>;

    /// Creates a branch without switching to it.
    fn create_branch(&self, dir: &Path, name: &str, start_point: Option<&str>) -> Result<()>;

    fn push(&self, dir: &Path, request: &PushRequest) -> Result<PushResult>;

    /// Pulls from `remote`, merging `branch` or the upstream of the current
    /// branch.
    fn pull(&self, dir: &Path, remote: &str, branch: Option<&str>) -> Result<()>;

    /// Merges a branch into the current branch. A merge that stops on
    /// conflicts, or is refused by the fast-forward mode, is an error.
    fn merge(&self, dir: &Path, request: &MergeRequest, identity: Option<&Identity>)
        -> Result<()>;

    fn tag_annotated(&self, dir: &Path, name: &str, message: &str, tagger: &Identity)
        -> Result<()>;

    fn tag_lightweight(&self, dir: &Path, name: &str) -> Result<()>;

    fn tags(&self, dir: &Path) -> Result<Vec<TagRecord>>;

    fn config_get(&self, dir: &Path, key: &str) -> Result<Option<String>>;

    fn config_set(&self, dir: &Path, key: &str, value: &str) -> Result<()>;

    /// Every commit reachable from any ref, most recently authored first.
    fn all_commits(&self, dir: &Path) -> Result<Vec<Commit>>;

    /// Whether `ancestor` is `descendant` or one of its ancestors.
    fn is_ancestor(&self, dir: &Path, ancestor: &GitSha, descendant: &GitSha) -> Result<bool>;

    /// The commit `reference` points at, or `None` if it does not resolve.
    fn resolve_ref(&self, dir: &Path, reference: &str) -> Result<Option<GitSha>>;

    /// The ref `HEAD` points at, or `None` when `HEAD` is detached.
    fn head_ref(&self, dir: &Path) -> Result<Option<String>>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitOperations for SystemGit {
    fn is_repository(&self, dir: &Path) -> bool {
        crate::git::is_repository(dir)
    }

    fn init(&self, dir: &Path) -> Result<()> {
        crate::git::init(dir)
    }

    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        crate::git::clone(url, dir)
    }

    fn add(&self, dir: &Path, pathspec: &str) -> Result<()> {
        crate::git::add(dir, pathspec)
    }

    fn commit(&self, dir: &Path, message: &str, identity: Option<&Identity>) -> Result<GitSha> {
        crate::git::commit(dir, message, identity)
    }

    fn branches(&self, dir: &Path) -> Result<Vec<Branch>> {
        crate::git::branches(dir)
    }

    fn current_branch(&self, dir: &Path) -> Result<Branch> {
        crate::git::current_branch(dir)
    }

    fn checkout(&self, dir: &Path, request: &CheckoutRequest) -> Result<()> {
        crate::git::checkout(dir, request)
    }

    fn create_branch(&self, dir: &Path, name: &str, start_point: Option<&str>) -> Result<()> {
        crate::git::create_branch(dir, name, start_point)
    }

    fn push(&self, dir: &Path, request: &PushRequest) -> Result<PushResult> {
        crate::git::push(dir, request)
    }

    fn pull(&self, dir: &Path, remote: &str, branch: Option<&str>) -> Result<()> {
        crate::git::pull(dir, remote, branch)
    }

    fn merge(
        &self,
        dir: &Path,
        request: &MergeRequest,
        identity: Option<&Identity>,
    ) -> Result<()> {
        crate::git::merge(dir, request, identity)
    }

    fn tag_annotated(
        &self,
        dir: &Path,
        name: &str,
        message: &str,
        tagger: &Identity,
    ) -> Result<()> {
        crate::git::tag_annotated(dir, name, message, tagger)
    }

    fn tag_lightweight(&self, dir: &Path, name: &str) -> Result<()> {
        crate::git::tag_lightweight(dir, name)
    }

    fn tags(&self, dir: &Path) -> Result<Vec<TagRecord>> {
        crate::git::tags(dir)
    }

    fn config_get(&self, dir: &Path, key: &str) -> Result<Option<String>> {
        crate::git::config_get(dir, key)
    }

    fn config_set(&self, dir: &Path, key: &str, value: &str) -> Result<()> {
        crate::git::config_set(dir, key, value)
    }

    fn all_commits(&self, dir: &Path) -> Result<Vec<Commit>> {
        crate::git::all_commits(dir)
    }

    fn is_ancestor(&self, dir: &Path, ancestor: &GitSha, descendant: &GitSha) -> Result<bool> {
        crate::git::is_ancestor(dir, ancestor, descendant)
    }

    fn resolve_ref(&self, dir: &Path, reference: &str) -> Result<Option<GitSha>> {
        crate::git::resolve_ref(dir, reference)
    }

    fn head_ref(&self, dir: &Path) -> Result<Option<String>> {
        crate::git::head_ref(dir)
    }
}

//! Test doubles shared by the unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset};

use crate::error::{Error, Result};
use crate::model::{
    Branch, Commit, Identity, PushResult, RefUpdate, RefUpdateStatus, TagAnnotation, TagRecord,
};
use crate::repository::{
    CheckoutRequest, FastForwardMode, GitOperations, MergeRequest, PushRequest, UpstreamMode,
};
use crate::sha::GitSha;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch(String),
    Detached(GitSha),
}

/// One repository held by [`FakeGit`].
#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub commits: Vec<Commit>,
    pub parents: HashMap<GitSha, Vec<GitSha>>,
    pub branches: BTreeMap<String, GitSha>,
    pub head: Head,
    pub config: BTreeMap<String, String>,
    pub tags: Vec<TagRecord>,
    pub staged: Vec<String>,
}

impl Default for FakeRepo {
    fn default() -> Self {
        Self {
            commits: Vec::new(),
            parents: HashMap::new(),
            branches: BTreeMap::new(),
            head: Head::Branch(Branch::MASTER.to_string()),
            config: BTreeMap::new(),
            tags: Vec::new(),
            staged: Vec::new(),
        }
    }
}

impl FakeRepo {
    fn head_sha(&self) -> Option<GitSha> {
        match &self.head {
            Head::Branch(name) => self.branches.get(name).cloned(),
            Head::Detached(sha) => Some(sha.clone()),
        }
    }

    fn resolve(&self, reference: &str) -> Option<GitSha> {
        if reference == "HEAD" {
            return self.head_sha();
        }
        let short = reference.strip_prefix("refs/heads/").unwrap_or(reference);
        if let Some(sha) = self.branches.get(short) {
            return Some(sha.clone());
        }
        self.commits
            .iter()
            .find(|c| c.hash.as_str() == reference)
            .map(|c| c.hash.clone())
    }

    fn is_ancestor(&self, ancestor: &GitSha, descendant: &GitSha) -> bool {
        let mut queue = VecDeque::from([descendant.clone()]);
        while let Some(next) = queue.pop_front() {
            if &next == ancestor {
                return true;
            }
            if let Some(parents) = self.parents.get(&next) {
                queue.extend(parents.iter().cloned());
            }
        }
        false
    }
}

/// A scripted, in-memory stand-in for the system `git`.
///
/// Repositories live in a map keyed by directory. `init` and `clone_repo`
/// also create the directory on disk, so filesystem checks behave. Every
/// call is recorded as a short string such as `"push origin force"`.
#[derive(Default)]
pub struct FakeGit {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
    remotes: Mutex<HashMap<String, FakeRepo>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub push_status: Mutex<Option<RefUpdateStatus>>,
    pub fail_push: Mutex<bool>,
    clock: Mutex<i64>,
}

pub fn base_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-01T09:00:00+00:00").unwrap()
}

pub fn fake_sha(n: i64) -> GitSha {
    GitSha::new(format!("{:040x}", n)).unwrap()
}

pub fn identity() -> Identity {
    Identity::new("Test User", "test@example.com")
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `url` clonable, with the content of `repo`.
    pub fn with_remote(self, url: &str, repo: FakeRepo) -> Self {
        self.remotes.lock().unwrap().insert(url.to_string(), repo);
        self
    }

    pub fn repo(&self, dir: &Path) -> FakeRepo {
        self.repos.lock().unwrap().get(dir).cloned().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    /// Adds a commit with `parents` on no branch, returning its hash.
    pub fn add_commit(&self, dir: &Path, message: &str, parents: &[GitSha]) -> GitSha {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.get_mut(dir).unwrap();
        let sha = self.next_commit(repo, message, None);
        repo.parents.insert(sha.clone(), parents.to_vec());
        sha
    }

    pub fn set_branch(&self, dir: &Path, name: &str, sha: &GitSha) {
        let mut repos = self.repos.lock().unwrap();
        repos
            .get_mut(dir)
            .unwrap()
            .branches
            .insert(name.to_string(), sha.clone());
    }

    pub fn set_head(&self, dir: &Path, head: Head) {
        self.repos.lock().unwrap().get_mut(dir).unwrap().head = head;
    }

    /// Registers an empty repository at `dir` without recording a call.
    pub fn seed(&self, dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        self.repos
            .lock()
            .unwrap()
            .insert(dir.to_path_buf(), FakeRepo::default());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn tick(&self) -> i64 {
        let mut clock = self.clock.lock().unwrap();
        *clock += 1;
        *clock
    }

    fn next_commit(&self, repo: &mut FakeRepo, message: &str, who: Option<&Identity>) -> GitSha {
        let n = self.tick();
        let sha = fake_sha(n);
        let when = base_time() + Duration::minutes(n);
        let who = who.cloned().unwrap_or_else(identity);
        repo.commits.push(Commit::new(
            sha.clone(),
            message,
            who.clone(),
            who,
            when,
            when,
        ));
        sha
    }

    fn with_repo<T>(
        &self,
        dir: &Path,
        command: &str,
        f: impl FnOnce(&mut FakeRepo) -> Result<T>,
    ) -> Result<T> {
        let mut repos = self.repos.lock().unwrap();
        match repos.get_mut(dir) {
            Some(repo) => f(repo),
            None => Err(git_error(command, dir, "not a git repository")),
        }
    }
}

fn git_error(command: &str, dir: &Path, stderr: &str) -> Error {
    Error::GitCommand {
        command: command.to_string(),
        dir: dir.to_path_buf(),
        stderr: stderr.to_string(),
    }
}

impl GitOperations for FakeGit {
    fn is_repository(&self, dir: &Path) -> bool {
        self.repos.lock().unwrap().contains_key(dir)
    }

    fn init(&self, dir: &Path) -> Result<()> {
        self.record(format!("init {}", dir.display()));
        fs::create_dir_all(dir)?;
        self.repos
            .lock()
            .unwrap()
            .insert(dir.to_path_buf(), FakeRepo::default());
        Ok(())
    }

    fn clone_repo(&self, url: &str, dir: &Path) -> Result<()> {
        self.record(format!("clone {}", url));
        let mut source = self
            .remotes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| git_error("clone", dir, "repository not found"))?;
        if dir.exists() {
            return Err(git_error("clone", dir, "destination path already exists"));
        }
        fs::create_dir_all(dir)?;
        source
            .config
            .insert("remote.origin.url".to_string(), url.to_string());
        self.repos.lock().unwrap().insert(dir.to_path_buf(), source);
        Ok(())
    }

    fn add(&self, dir: &Path, pathspec: &str) -> Result<()> {
        self.record(format!("add {}", pathspec));
        self.with_repo(dir, "add", |repo| {
            repo.staged.push(pathspec.to_string());
            Ok(())
        })
    }

    fn commit(&self, dir: &Path, message: &str, identity: Option<&Identity>) -> Result<GitSha> {
        self.record(format!("commit {}", message));
        let mut repos = self.repos.lock().unwrap();
        let repo = repos
            .get_mut(dir)
            .ok_or_else(|| git_error("commit", dir, "not a git repository"))?;
        let parent = repo.head_sha();
        let sha = self.next_commit(repo, message, identity);
        repo.parents
            .insert(sha.clone(), parent.into_iter().collect());
        match repo.head.clone() {
            Head::Branch(name) => {
                repo.branches.insert(name, sha.clone());
            }
            Head::Detached(_) => repo.head = Head::Detached(sha.clone()),
        }
        repo.staged.clear();
        Ok(sha)
    }

    fn branches(&self, dir: &Path) -> Result<Vec<Branch>> {
        self.with_repo(dir, "branches", |repo| {
            Ok(repo.branches.keys().map(Branch::new).collect())
        })
    }

    fn current_branch(&self, dir: &Path) -> Result<Branch> {
        self.with_repo(dir, "symbolic-ref", |repo| match &repo.head {
            Head::Branch(name) => Ok(Branch::new(name)),
            Head::Detached(_) => Err(git_error("symbolic-ref", dir, "HEAD is detached")),
        })
    }

    fn checkout(&self, dir: &Path, request: &CheckoutRequest) -> Result<()> {
        let mut call = format!("checkout {}", request.target);
        if request.create {
            call.push_str(" create");
        }
        if request.upstream == UpstreamMode::SetUpstream {
            call.push_str(" track");
        }
        self.record(call);
        self.with_repo(dir, "checkout", |repo| {
            let target = request.target.clone();
            if request.create {
                if repo.branches.contains_key(&target) {
                    return Err(git_error("checkout", dir, "branch already exists"));
                }
                let start = match &request.start_point {
                    Some(start) => Some(
                        repo.resolve(start)
                            .ok_or_else(|| git_error("checkout", dir, "invalid start point"))?,
                    ),
                    None => repo.head_sha(),
                };
                if let Some(start) = start {
                    repo.branches.insert(target.clone(), start);
                }
                repo.head = Head::Branch(target.clone());
            } else if repo.branches.contains_key(&target) {
                repo.head = Head::Branch(target.clone());
            } else if let Some(sha) = repo.resolve(&target) {
                repo.head = Head::Detached(sha);
            } else {
                return Err(git_error("checkout", dir, "pathspec did not match"));
            }
            if request.upstream == UpstreamMode::SetUpstream {
                repo.config
                    .insert(format!("branch.{}.remote", target), "origin".to_string());
                repo.config.insert(
                    format!("branch.{}.merge", target),
                    Branch::new(&target).reference(),
                );
            }
            Ok(())
        })
    }

    fn create_branch(&self, dir: &Path, name: &str, start_point: Option<&str>) -> Result<()> {
        self.record(format!("branch {}", name));
        self.with_repo(dir, "branch", |repo| {
            let start = match start_point {
                Some(start) => repo.resolve(start),
                None => repo.head_sha(),
            }
            .ok_or_else(|| git_error("branch", dir, "not a valid object name"))?;
            repo.branches.insert(name.to_string(), start);
            Ok(())
        })
    }

    fn push(&self, dir: &Path, request: &PushRequest) -> Result<PushResult> {
        let mut call = format!("push {}", request.remote);
        for refspec in &request.refspecs {
            call.push(' ');
            call.push_str(refspec);
        }
        if request.tags {
            call.push_str(" tags");
        }
        if request.force {
            call.push_str(" force");
        }
        if request.credentials.is_some() {
            call.push_str(" credentials");
        }
        self.record(call);

        if *self.fail_push.lock().unwrap() {
            return Err(git_error("push", dir, "could not read Username"));
        }
        let status = self.push_status.lock().unwrap().unwrap_or(RefUpdateStatus::Ok);
        let mut result = PushResult::default();
        for refspec in &request.refspecs {
            let target = refspec.rsplit(':').next().unwrap_or(refspec);
            let target = if target.starts_with("refs/") {
                target.to_string()
            } else {
                Branch::new(target).reference()
            };
            result.add(RefUpdate::new(target, status));
        }
        Ok(result)
    }

    fn pull(&self, dir: &Path, remote: &str, branch: Option<&str>) -> Result<()> {
        self.record(format!("pull {} {}", remote, branch.unwrap_or_default()).trim_end().to_string());
        self.with_repo(dir, "pull", |_| Ok(()))
    }

    fn merge(
        &self,
        dir: &Path,
        request: &MergeRequest,
        identity: Option<&Identity>,
    ) -> Result<()> {
        self.record(format!(
            "merge {} {}",
            request.branch,
            request.fast_forward.flag()
        ));
        self.with_repo(dir, "merge", |repo| {
            let theirs = repo
                .branches
                .get(&request.branch)
                .cloned()
                .ok_or_else(|| git_error("merge", dir, "not something we can merge"))?;
            let merged = match repo.head_sha() {
                Some(ours) if repo.is_ancestor(&theirs, &ours) => return Ok(()),
                Some(ours)
                    if repo.is_ancestor(&ours, &theirs)
                        && request.fast_forward != FastForwardMode::Never =>
                {
                    theirs
                }
                Some(_) if request.fast_forward == FastForwardMode::Only => {
                    return Err(git_error("merge", dir, "Not possible to fast-forward"));
                }
                Some(ours) => {
                    let message = format!("Merge branch '{}'", request.branch);
                    let sha = self.next_commit(repo, &message, identity);
                    repo.parents.insert(sha.clone(), vec![ours, theirs]);
                    sha
                }
                None => theirs,
            };
            match repo.head.clone() {
                Head::Branch(name) => {
                    repo.branches.insert(name, merged);
                }
                Head::Detached(_) => repo.head = Head::Detached(merged),
            }
            Ok(())
        })
    }

    fn tag_annotated(
        &self,
        dir: &Path,
        name: &str,
        message: &str,
        tagger: &Identity,
    ) -> Result<()> {
        self.record(format!("tag -a {}", name));
        let when = base_time() + Duration::days(1);
        self.with_repo(dir, "tag", |repo| {
            let commit = repo
                .head_sha()
                .ok_or_else(|| git_error("tag", dir, "no commit"))?;
            repo.tags.push(TagRecord {
                name: name.to_string(),
                commit,
                annotation: Some(TagAnnotation {
                    tagger: tagger.clone(),
                    tagged_at: when,
                    message: message.to_string(),
                }),
            });
            Ok(())
        })
    }

    fn tag_lightweight(&self, dir: &Path, name: &str) -> Result<()> {
        self.record(format!("tag {}", name));
        self.with_repo(dir, "tag", |repo| {
            let commit = repo
                .head_sha()
                .ok_or_else(|| git_error("tag", dir, "no commit"))?;
            repo.tags.push(TagRecord {
                name: name.to_string(),
                commit,
                annotation: None,
            });
            Ok(())
        })
    }

    fn tags(&self, dir: &Path) -> Result<Vec<TagRecord>> {
        self.with_repo(dir, "tags", |repo| Ok(repo.tags.clone()))
    }

    fn config_get(&self, dir: &Path, key: &str) -> Result<Option<String>> {
        self.with_repo(dir, "config", |repo| Ok(repo.config.get(key).cloned()))
    }

    fn config_set(&self, dir: &Path, key: &str, value: &str) -> Result<()> {
        self.record(format!("config {} {}", key, value));
        self.with_repo(dir, "config", |repo| {
            repo.config.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn all_commits(&self, dir: &Path) -> Result<Vec<Commit>> {
        self.with_repo(dir, "log", |repo| {
            let mut commits = repo.commits.clone();
            commits.sort_by(|a, b| b.author_date.cmp(&a.author_date));
            Ok(commits)
        })
    }

    fn is_ancestor(&self, dir: &Path, ancestor: &GitSha, descendant: &GitSha) -> Result<bool> {
        self.with_repo(dir, "merge-base", |repo| {
            Ok(repo.is_ancestor(ancestor, descendant))
        })
    }

    fn resolve_ref(&self, dir: &Path, reference: &str) -> Result<Option<GitSha>> {
        self.with_repo(dir, "rev-parse", |repo| Ok(repo.resolve(reference)))
    }

    fn head_ref(&self, dir: &Path) -> Result<Option<String>> {
        self.with_repo(dir, "symbolic-ref", |repo| match &repo.head {
            Head::Branch(name) => Ok(Some(Branch::new(name).reference())),
            Head::Detached(_) => Ok(None),
        })
    }
}

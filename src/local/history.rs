//! Commit reachability.
//!
//! Changelists are built per branch from every commit the repository knows
//! about, not only the commits on the branch's first-parent chain, so work
//! merged in from branches that have since been deleted is still found.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Branch, Commit};
use crate::repository::GitOperations;
use crate::sha::GitSha;

pub struct CommitGraphExtractor<'a> {
    git: &'a dyn GitOperations,
    dir: &'a Path,
}

impl<'a> CommitGraphExtractor<'a> {
    pub fn new(git: &'a dyn GitOperations, dir: &'a Path) -> Self {
        Self { git, dir }
    }

    /// The commit `branch` points at.
    pub fn head_sha(&self, branch: &Branch) -> Result<GitSha> {
        self.git
            .resolve_ref(self.dir, &branch.reference())?
            .ok_or_else(|| Error::BranchNotFound {
                branch: branch.name.clone(),
            })
    }

    pub fn head_commit(&self, branch: &Branch) -> Result<Commit> {
        let head = self.head_sha(branch)?;
        self.git
            .all_commits(self.dir)?
            .into_iter()
            .find(|c| c.hash == head)
            .ok_or_else(|| Error::BranchNotFound {
                branch: branch.name.clone(),
            })
    }

    /// Every commit that is `branch`'s head or one of its ancestors, most
    /// recently authored first, each hash once.
    pub fn commits_reachable_from(&self, branch: &Branch) -> Result<Vec<Commit>> {
        let head = self.head_sha(branch)?;
        let mut seen = HashSet::new();
        let mut reachable = Vec::new();
        for commit in self.git.all_commits(self.dir)? {
            if seen.contains(&commit.hash) {
                continue;
            }
            if commit.hash == head || self.git.is_ancestor(self.dir, &commit.hash, &head)? {
                seen.insert(commit.hash.clone());
                reachable.push(commit);
            }
        }
        log::debug!(
            "{} commits reachable from '{}'",
            reachable.len(),
            branch
        );
        Ok(reachable)
    }
}

//! Upstream tracking for local branches.

use std::path::Path;

use crate::error::Result;
use crate::model::Branch;
use crate::repository::{CheckoutRequest, GitOperations};

/// Makes sure a local branch tracks `origin/<branch>`.
pub struct TrackingBranchManager<'a> {
    git: &'a dyn GitOperations,
    dir: &'a Path,
    remote_active: bool,
}

impl<'a> TrackingBranchManager<'a> {
    pub fn new(git: &'a dyn GitOperations, dir: &'a Path, remote_active: bool) -> Self {
        Self {
            git,
            dir,
            remote_active,
        }
    }

    /// Whether `branch` already has an upstream configured.
    pub fn is_tracking(&self, branch: &Branch) -> Result<bool> {
        Ok(self
            .git
            .config_get(self.dir, &format!("branch.{}.merge", branch.name))?
            .is_some())
    }

    /// Sets up tracking for `branch` if it has none.
    ///
    /// Returns `true` only when a new tracking relationship was created.
    /// Nothing is done while the remote is inactive. The upstream is
    /// established by checking the branch out again with tracking enabled,
    /// the same way `git checkout --track` would.
    pub fn ensure_tracking(&self, branch: &Branch) -> Result<bool> {
        if !self.remote_active || self.is_tracking(branch)? {
            return Ok(false);
        }
        log::debug!("setting up tracking for '{}' against origin", branch);
        self.git
            .checkout(self.dir, &CheckoutRequest::existing(&branch.name).tracking())?;
        Ok(true)
    }
}

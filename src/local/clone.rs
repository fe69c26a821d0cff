//! What to do when a clone target already exists.

use std::path::Path;

use serde::Serialize;

use crate::config::CloneExistsResponse;
use crate::error::{Error, Result};

/// Decides whether an existing directory may be deleted.
///
/// Consulted before a clone replaces a directory, so that a mistyped
/// project directory (a home directory, say) is never removed without
/// explicit confirmation.
pub trait DeleteApprover {
    fn approve(&self, path: &Path) -> bool;
}

impl<F> DeleteApprover for F
where
    F: Fn(&Path) -> bool,
{
    fn approve(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Refuses every delete. The approver used unless one is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefuseDeletes;

impl DeleteApprover for RefuseDeletes {
    fn approve(&self, _path: &Path) -> bool {
        false
    }
}

/// The action a clone should take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloneAction {
    Clone,
    /// Remove the existing directory, then clone.
    DeleteThenClone,
    /// Keep the existing directory and pull into it.
    Pull,
}

/// Maps a [`CloneExistsResponse`] to a [`CloneAction`] for one target.
///
/// Only looks at the filesystem; performing the action is left to the
/// caller.
pub struct CloneConflictResolver<'a> {
    approver: &'a dyn DeleteApprover,
}

impl<'a> CloneConflictResolver<'a> {
    pub fn new(approver: &'a dyn DeleteApprover) -> Self {
        Self { approver }
    }

    pub fn resolve(&self, target: &Path, response: CloneExistsResponse) -> Result<CloneAction> {
        if !target.exists() {
            return Ok(CloneAction::Clone);
        }
        log::debug!("clone target {} already exists", target.display());
        match response {
            CloneExistsResponse::Delete => {
                if self.approver.approve(target) {
                    Ok(CloneAction::DeleteThenClone)
                } else {
                    log::debug!("delete of {} not approved", target.display());
                    Err(Error::DeleteNotApproved {
                        target: target.display().to_string(),
                    })
                }
            }
            CloneExistsResponse::Pull => Ok(CloneAction::Pull),
            CloneExistsResponse::Exception => Err(Error::CloneTargetExists {
                path: target.to_path_buf(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn test_missing_target_clones() {
        let temp = TempDir::new().unwrap();
        let resolver = CloneConflictResolver::new(&RefuseDeletes);
        let action = resolver
            .resolve(&temp.path().join("demo"), CloneExistsResponse::Exception)
            .unwrap();
        assert_eq!(action, CloneAction::Clone);
    }

    #[test]
    fn test_exception_response_fails() {
        let temp = TempDir::new().unwrap();
        let err = CloneConflictResolver::new(&RefuseDeletes)
            .resolve(temp.path(), CloneExistsResponse::Exception)
            .unwrap_err();
        assert!(matches!(err, Error::CloneTargetExists { ref path } if path == temp.path()));
        assert!(temp.path().exists());
    }

    #[test]
    fn test_pull_response() {
        let temp = TempDir::new().unwrap();
        let action = CloneConflictResolver::new(&RefuseDeletes)
            .resolve(temp.path(), CloneExistsResponse::Pull)
            .unwrap();
        assert_eq!(action, CloneAction::Pull);
    }

    #[test]
    fn test_delete_consults_approver() {
        let temp = TempDir::new().unwrap();
        let asked = Cell::new(0);
        let approve = |_: &Path| {
            asked.set(asked.get() + 1);
            true
        };
        let action = CloneConflictResolver::new(&approve)
            .resolve(temp.path(), CloneExistsResponse::Delete)
            .unwrap();
        assert_eq!(action, CloneAction::DeleteThenClone);
        assert_eq!(asked.get(), 1);
        // deciding never deletes
        assert!(temp.path().exists());
    }

    #[test]
    fn test_refused_delete() {
        let temp = TempDir::new().unwrap();
        let err = CloneConflictResolver::new(&RefuseDeletes)
            .resolve(temp.path(), CloneExistsResponse::Delete)
            .unwrap_err();
        assert!(matches!(err, Error::DeleteNotApproved { .. }));
    }
}

//! Issue label reconciliation.
//!
//! Brings the labels of a hosted repository in line with a desired
//! name-to-colour map. Planning is pure ([`LabelPlan::compute`]); applying
//! the plan is done by [`LabelReconciler::merge`] in three passes:
//!
//! 1. update the colour of labels present on both sides,
//! 2. delete labels that are not desired,
//! 3. create desired labels that do not exist yet.
//!
//! A failed create is logged and skipped. After the passes the labels are
//! read back and compared with the desired map.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::Label;
use crate::remote::hosting::{ApiToken, HostingApi, RepoCoordinates};

/// Reduces a label list to an ordered name-to-colour map.
pub fn labels_as_map(labels: &[Label]) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|l| (l.name.clone(), l.color.clone()))
        .collect()
}

/// The mutations needed to turn one label set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    /// Existing labels whose colour changes.
    pub updates: Vec<Label>,
    /// Existing labels to remove.
    pub deletes: Vec<String>,
    /// Desired labels that do not exist yet.
    pub creates: Vec<Label>,
}

impl LabelPlan {
    pub fn compute(current: &[Label], desired: &BTreeMap<String, String>) -> Self {
        let mut plan = LabelPlan::default();
        for label in current {
            match desired.get(&label.name) {
                Some(color) if *color != label.color => {
                    plan.updates.push(Label::new(&label.name, color));
                }
                Some(_) => {}
                None => plan.deletes.push(label.name.clone()),
            }
        }
        for (name, color) in desired {
            if !current.iter().any(|l| &l.name == name) {
                plan.creates.push(Label::new(name, color));
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.mutation_count() == 0
    }

    pub fn mutation_count(&self) -> usize {
        self.updates.len() + self.deletes.len() + self.creates.len()
    }
}

/// Applies a desired label set to one hosted repository.
pub struct LabelReconciler<'a> {
    hosting: &'a dyn HostingApi,
    token: &'a ApiToken,
    repo: &'a RepoCoordinates,
}

impl<'a> LabelReconciler<'a> {
    pub fn new(hosting: &'a dyn HostingApi, token: &'a ApiToken, repo: &'a RepoCoordinates) -> Self {
        Self {
            hosting,
            token,
            repo,
        }
    }

    /// Merges `desired` into the repository and returns the resulting
    /// labels.
    ///
    /// Fails with [`Error::LabelMergeIncomplete`] when the labels read back
    /// afterwards differ from `desired`, which is what happens when a
    /// create was refused.
    pub fn merge(&self, desired: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
        let current = self.hosting.list_labels(self.token, self.repo)?;
        let plan = LabelPlan::compute(&current, desired);
        log::debug!(
            "merging labels into {}: {} updates, {} deletes, {} creates",
            self.repo,
            plan.updates.len(),
            plan.deletes.len(),
            plan.creates.len()
        );

        for label in &plan.updates {
            self.hosting
                .update_label_color(self.token, self.repo, &label.name, &label.color)?;
        }
        for name in &plan.deletes {
            self.hosting.delete_label(self.token, self.repo, name)?;
        }
        for label in &plan.creates {
            if let Err(e) = self.hosting.create_label(self.token, self.repo, label) {
                log::warn!("Failed to add new label '{}': {}", label.name, e);
            }
        }

        let merged = labels_as_map(&self.hosting.list_labels(self.token, self.repo)?);
        let differences = differences(&merged, desired);
        if differences.is_empty() {
            Ok(merged)
        } else {
            Err(Error::LabelMergeIncomplete { differences })
        }
    }
}

fn differences(actual: &BTreeMap<String, String>, desired: &BTreeMap<String, String>) -> Vec<String> {
    let mut out = Vec::new();
    for (name, color) in desired {
        match actual.get(name) {
            None => out.push(format!("missing '{}'", name)),
            Some(found) if found != color => {
                out.push(format!("'{}' is {}, expected {}", name, found, color))
            }
            Some(_) => {}
        }
    }
    for name in actual.keys() {
        if !desired.contains_key(name) {
            out.push(format!("unexpected '{}'", name));
        }
    }
    out
}

//! # Value Types
//!
//! Plain value objects passed between the managers and returned to callers:
//! branches, identities, commits, tags, push results, labels and issues.
//! None of them hold references back into a repository, so they can be kept,
//! compared and serialised freely after the manager that produced them is
//! closed.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::sha::GitSha;

/// The hosting platform a remote repository lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProvider {
    #[default]
    GitHub,
    BitBucket,
}

impl ServiceProvider {
    /// Lowercase name, used as a property key prefix.
    pub fn key(&self) -> &'static str {
        match self {
            ServiceProvider::GitHub => "github",
            ServiceProvider::BitBucket => "bitbucket",
        }
    }
}

impl fmt::Display for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ServiceProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(ServiceProvider::GitHub),
            "bitbucket" => Ok(ServiceProvider::BitBucket),
            other => Err(Error::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}

/// A local branch, identified by its short name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
}

impl Branch {
    pub const MASTER: &'static str = "master";
    pub const DEVELOP: &'static str = "develop";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn master() -> Self {
        Self::new(Self::MASTER)
    }

    pub fn develop() -> Self {
        Self::new(Self::DEVELOP)
    }

    /// Full ref path, `refs/heads/<name>`.
    pub fn reference(&self) -> String {
        format!("refs/heads/{}", self.name)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A person as recorded on commits and annotated tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A commit read from repository history.
///
/// Two commits are equal when their hashes are equal; the remaining fields
/// are descriptive only.
#[derive(Debug, Clone, Serialize)]
pub struct Commit {
    pub hash: GitSha,
    pub full_message: String,
    pub short_message: String,
    pub author: Identity,
    pub committer: Identity,
    pub author_date: DateTime<FixedOffset>,
    pub commit_date: DateTime<FixedOffset>,
}

impl Commit {
    pub fn new(
        hash: GitSha,
        full_message: impl Into<String>,
        author: Identity,
        committer: Identity,
        author_date: DateTime<FixedOffset>,
        commit_date: DateTime<FixedOffset>,
    ) -> Self {
        let full_message = full_message.into();
        let short_message = full_message.lines().next().unwrap_or_default().to_string();
        Self {
            hash,
            full_message,
            short_message,
            author,
            committer,
            author_date,
            commit_date,
        }
    }
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Commit {}

impl Hash for Commit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

/// Annotation data of an annotated tag, as reported by the Git collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAnnotation {
    pub tagger: Identity,
    pub tagged_at: DateTime<FixedOffset>,
    pub message: String,
}

/// A raw tag entry: its name, the commit it resolves to and, for annotated
/// tags, the annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub commit: GitSha,
    pub annotation: Option<TagAnnotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Lightweight,
    Annotated,
    /// Marks the latest commit without a tag existing in Git.
    Pseudo,
}

/// A tag with its pointed commit resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    pub release_date: DateTime<FixedOffset>,
    pub commit_date: DateTime<FixedOffset>,
    pub tagger: Identity,
    pub full_message: String,
    pub commit: Commit,
    pub kind: TagKind,
}

impl Tag {
    /// Name given to the pseudo tag built by [`Tag::current_build`].
    pub const CURRENT_BUILD: &'static str = "current build";

    /// Builds a tag from a raw record and the commit it points at.
    ///
    /// Lightweight tags carry no tagger or date of their own, so both are
    /// taken from the commit's committer. That is an approximation: the
    /// commit may have been tagged long after it was made.
    pub fn from_record(record: TagRecord, commit: Commit) -> Self {
        match record.annotation {
            Some(annotation) => Self {
                name: record.name,
                release_date: annotation.tagged_at,
                commit_date: commit.commit_date,
                tagger: annotation.tagger,
                full_message: annotation.message,
                commit,
                kind: TagKind::Annotated,
            },
            None => Self {
                name: record.name,
                release_date: commit.commit_date,
                commit_date: commit.commit_date,
                tagger: commit.committer.clone(),
                full_message: String::new(),
                commit,
                kind: TagKind::Lightweight,
            },
        }
    }

    /// A pseudo tag on `commit`, representing a build not yet tagged in Git.
    pub fn current_build(commit: Commit) -> Self {
        Self {
            name: Self::CURRENT_BUILD.to_string(),
            release_date: commit.commit_date,
            commit_date: commit.commit_date,
            tagger: commit.committer.clone(),
            full_message: "Pseudo tag on latest commit".to_string(),
            commit,
            kind: TagKind::Pseudo,
        }
    }

    /// Segment used when building a browse URL for this tag. A pseudo tag
    /// has no tree of its own, so it browses the develop branch.
    pub fn url_segment(&self) -> &str {
        match self.kind {
            TagKind::Pseudo => Branch::DEVELOP,
            _ => &self.name,
        }
    }
}

/// Outcome of a single ref update in a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefUpdateStatus {
    Ok,
    UpToDate,
    RejectedNonFastForward,
    RejectedRemoteChanged,
    RejectedOther,
    RemoteRejected,
    NotAttempted,
}

impl RefUpdateStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RefUpdateStatus::Ok | RefUpdateStatus::UpToDate)
    }
}

impl fmt::Display for RefUpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RefUpdateStatus::Ok => "OK",
            RefUpdateStatus::UpToDate => "UP_TO_DATE",
            RefUpdateStatus::RejectedNonFastForward => "REJECTED_NONFASTFORWARD",
            RefUpdateStatus::RejectedRemoteChanged => "REJECTED_REMOTE_CHANGED",
            RefUpdateStatus::RejectedOther => "REJECTED_OTHER_REASON",
            RefUpdateStatus::RemoteRejected => "REJECTED_BY_REMOTE",
            RefUpdateStatus::NotAttempted => "NOT_ATTEMPTED",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefUpdate {
    pub ref_name: String,
    pub status: RefUpdateStatus,
    pub message: Option<String>,
}

impl RefUpdate {
    pub fn new(ref_name: impl Into<String>, status: RefUpdateStatus) -> Self {
        Self {
            ref_name: ref_name.into(),
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The per-ref outcome of a push.
///
/// `local_failure` is set when the push never reached the remote in a
/// useful way, for example a wiki push that was attempted before the wiki
/// was enabled on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub updates: Vec<RefUpdate>,
    pub local_failure: bool,
}

impl PushResult {
    /// A result recording that the push failed before any ref was updated.
    pub fn local_failure() -> Self {
        Self {
            updates: Vec::new(),
            local_failure: true,
        }
    }

    pub fn add(&mut self, update: RefUpdate) {
        self.updates.push(update);
    }

    pub fn is_successful(&self) -> bool {
        !self.local_failure && self.updates.iter().all(|u| u.status.is_accepted())
    }

    /// One line per ref update, `<ref>  :  <status>`.
    pub fn messages(&self) -> String {
        let mut out = String::new();
        if self.local_failure {
            out.push_str("local failure\n");
        }
        for update in &self.updates {
            out.push_str(&format!("{}  :  {}", update.ref_name, update.status));
            if let Some(message) = &update.message {
                out.push_str(&format!(" ({})", message));
            }
            out.push('\n');
        }
        out
    }
}

/// An issue label on the hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub color: String,
}

impl Label {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// An issue or pull request on the hosted repository.
///
/// Identity is the pair `(number, html_url)`; ordering is by URL first, so
/// issues from different repositories sort apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: BTreeSet<String>,
    pub html_url: String,
    pub pull_request: bool,
}

impl Issue {
    pub fn new(number: u64, title: impl Into<String>, html_url: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: String::new(),
            labels: BTreeSet::new(),
            html_url: html_url.into(),
            pull_request: false,
        }
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number && self.html_url == other.html_url
    }
}

impl Eq for Issue {}

impl Hash for Issue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
        self.html_url.hash(state);
    }
}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Issue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.html_url
            .cmp(&other.html_url)
            .then(self.number.cmp(&other.number))
    }
}

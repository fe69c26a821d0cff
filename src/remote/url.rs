//! Hosted repository URLs: building them from coordinates and parsing them
//! back into coordinates.

use std::fmt;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::config::RemoteConfiguration;
use crate::error::{Error, Result};
use crate::model::ServiceProvider;

/// Status endpoint of the GitHub-like provider.
pub const STATUS_API_URL: &str = "https://status.github.com/api/status.json";

/// Root of the GitHub-like REST API.
pub const API_URL: &str = "https://api.github.com";

/// Builds the URLs of one hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMapper {
    provider: ServiceProvider,
    base_url: String,
    user: String,
    name: String,
}

impl UrlMapper {
    pub fn new(
        provider: ServiceProvider,
        base_url: impl Into<String>,
        user: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            user: user.into(),
            name: name.into(),
        }
    }

    pub fn from_configuration(provider: ServiceProvider, remote: &RemoteConfiguration) -> Self {
        Self::new(
            provider,
            remote.provider_base_url.clone(),
            remote.repo_user.clone().unwrap_or_default(),
            remote.repo_name.clone().unwrap_or_default(),
        )
    }

    /// `https://<host>/<user>/<name>`, the same for every provider.
    pub fn repo_base_url(&self) -> String {
        format!("https://{}/{}/{}", self.base_url, self.user, self.name)
    }

    /// The URL to clone and push over HTTPS.
    ///
    /// BitBucket expects the user in the authority, as in
    /// `https://alice@bitbucket.org/alice/demo.git`.
    pub fn clone_url(&self) -> String {
        match self.provider {
            ServiceProvider::GitHub => format!("{}.git", self.repo_base_url()),
            ServiceProvider::BitBucket => format!(
                "https://{}@{}/{}/{}.git",
                self.user, self.base_url, self.user, self.name
            ),
        }
    }

    /// Prefix for browsing a tag or branch tree; append the tag name.
    pub fn tag_url(&self) -> String {
        format!("{}/tree/", self.repo_base_url())
    }

    /// Prefix for an issue page; append the issue number.
    pub fn issues_url(&self) -> String {
        format!("{}/issues/", self.repo_base_url())
    }

    pub fn wiki_url(&self) -> String {
        format!("{}/wiki", self.repo_base_url())
    }

    pub fn wiki_clone_url(&self) -> String {
        format!("{}.wiki.git", self.repo_base_url())
    }

    pub fn api_url(&self) -> &'static str {
        API_URL
    }
}

/// A hosted repository identified from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoDescriptor {
    pub host: String,
    pub user: String,
    pub name: String,
    pub provider: ServiceProvider,
}

impl RepoDescriptor {
    /// `host/user/name`.
    pub fn to_url(&self) -> String {
        format!("{}/{}/{}", self.host, self.user, self.name)
    }
}

impl fmt::Display for RepoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// An issue identified from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDescriptor {
    pub repo: RepoDescriptor,
    pub number: u64,
}

impl IssueDescriptor {
    /// `host/user/name/issues/number`.
    pub fn to_url(&self) -> String {
        format!("{}/issues/{}", self.repo.to_url(), self.number)
    }
}

/// Parses repository and issue URLs.
///
/// Accepts `https://` (or `http://`, `ssh://`) URLs whose path begins with
/// `/<user>/<repo>`, and scp-style origins such as
/// `git@github.com:alice/demo.git`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlParser;

const SCP_PATTERN: &str = r"^(?:[A-Za-z0-9._-]+@)?([A-Za-z0-9.-]+):([A-Za-z0-9._-]+)/([A-Za-z0-9._-]+?)(?:\.git)?/?$";

impl UrlParser {
    pub fn repo_descriptor(&self, url: &str) -> Result<RepoDescriptor> {
        let (repo, _) = self.parse(url)?;
        Ok(repo)
    }

    pub fn issue_descriptor(&self, url: &str) -> Result<IssueDescriptor> {
        let (repo, rest) = self.parse(url)?;
        match rest.as_slice() {
            [issues, number, ..] if issues == "issues" => match number.parse::<u64>() {
                Ok(number) if number > 0 => Ok(IssueDescriptor { repo, number }),
                _ => Err(not_recognised(url, "an issue")),
            },
            _ => Err(not_recognised(url, "an issue")),
        }
    }

    fn parse(&self, url: &str) -> Result<(RepoDescriptor, Vec<String>)> {
        log::debug!("parsing {}", url);
        if !url.contains("://") {
            let scp = Regex::new(SCP_PATTERN)?;
            let captures = scp
                .captures(url)
                .ok_or_else(|| not_recognised(url, "a repository"))?;
            let host = captures[1].to_string();
            return Ok((
                RepoDescriptor {
                    provider: provider_for_host(&host),
                    host,
                    user: captures[2].to_string(),
                    name: captures[3].to_string(),
                },
                Vec::new(),
            ));
        }

        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| not_recognised(url, "a repository"))?
            .to_string();
        let segments: Vec<String> = parsed
            .path_segments()
            .map(|s| s.map(str::to_string).collect())
            .unwrap_or_default();
        if segments.len() < 2 || segments[0].is_empty() || segments[1].is_empty() {
            return Err(not_recognised(url, "a repository"));
        }
        let name = segments[1]
            .strip_suffix(".git")
            .unwrap_or(&segments[1])
            .to_string();
        Ok((
            RepoDescriptor {
                provider: provider_for_host(&host),
                host,
                user: segments[0].clone(),
                name,
            },
            segments[2..].to_vec(),
        ))
    }
}

fn provider_for_host(host: &str) -> ServiceProvider {
    if host.contains("bitbucket") {
        ServiceProvider::BitBucket
    } else {
        ServiceProvider::GitHub
    }
}

fn not_recognised(url: &str, what: &str) -> Error {
    Error::Configuration {
        message: format!("{} is not recognised as {} URL", url, what),
        hint: None,
    }
}

//! # Repository Configuration
//!
//! This module defines the settings that drive one orchestration run: what to
//! do with the local working copy, the hosted remote and the wiki, which
//! hosting provider to talk to, and where to look for properties such as API
//! tokens.
//!
//! ## Key Components
//!
//! - **`LocalConfiguration`**: Where the project lives on disk, whether to
//!   create or clone it, what to do if a clone target already exists, and the
//!   tagger identity.
//!
//! - **`RemoteConfiguration`**: Repository coordinates on the host, creation
//!   options, the desired issue labels, and the delete confirmation phrase.
//!
//! - **`WikiConfiguration`**: Flags for the wiki repository. Its location and
//!   identity are always derived from the local configuration.
//!
//! - **`Settings`**: The whole document, as read from `tandem.yaml`.
//!
//! ## Validation
//!
//! Configurations are plain data until they are validated. Validation fills
//! in defaults taken from the counterpart configuration (the remote repository
//! name defaults from the local project name and vice versa) and fails with
//! `Error::Configuration` if a required field is still missing. No I/O is
//! performed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Identity, ServiceProvider};
use crate::remote::url::UrlParser;

/// What to do when a clone target directory already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneExistsResponse {
    /// Delete the directory, if the delete approver agrees, then clone.
    Delete,
    /// Pull into the existing directory instead of cloning.
    Pull,
    /// Fail with `Error::CloneTargetExists`.
    #[default]
    Exception,
}

/// Settings for the local working copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfiguration {
    pub active: bool,
    pub create: bool,
    pub clone_from_remote: bool,
    pub project_dir_parent: PathBuf,
    pub project_name: Option<String>,
    pub clone_exists_response: CloneExistsResponse,
    pub tagger_name: Option<String>,
    pub tagger_email: Option<String>,
}

impl Default for LocalConfiguration {
    fn default() -> Self {
        Self {
            active: true,
            create: false,
            clone_from_remote: false,
            project_dir_parent: PathBuf::from("."),
            project_name: None,
            clone_exists_response: CloneExistsResponse::Exception,
            tagger_name: None,
            tagger_email: None,
        }
    }
}

impl LocalConfiguration {
    /// The project directory, `project_dir_parent/project_name`.
    pub fn project_dir(&self) -> PathBuf {
        match &self.project_name {
            Some(name) => self.project_dir_parent.join(name),
            None => self.project_dir_parent.clone(),
        }
    }

    /// The configured tagger, if both name and email are set.
    pub fn tagger(&self) -> Option<Identity> {
        match (&self.tagger_name, &self.tagger_email) {
            (Some(name), Some(email)) => Some(Identity::new(name, email)),
            _ => None,
        }
    }

    /// Fails if the configuration asks for contradictory actions.
    pub fn check_flags(&self) -> Result<()> {
        if self.create && self.clone_from_remote {
            return Err(Error::Configuration {
                message: "Local repo cannot be both created and cloned".to_string(),
                hint: Some("set only one of 'create' and 'clone_from_remote'".to_string()),
            });
        }
        Ok(())
    }

    /// Validates this configuration, defaulting the project name from the
    /// remote repository name.
    pub fn validate(&mut self, remote: &RemoteConfiguration) -> Result<()> {
        self.check_flags()?;

        if self.project_name.is_none() {
            self.project_name = remote.repo_name.clone();
        }

        if self.project_name.is_none() {
            return Err(Error::Configuration {
                message: "project name must be set".to_string(),
                hint: Some("set either local.project_name or remote.repo_name".to_string()),
            });
        }
        Ok(())
    }
}

/// The eleven issue labels applied to a new repository unless configured
/// otherwise.
pub fn default_issue_labels() -> BTreeMap<String, String> {
    [
        ("bug", "fc2929"),
        ("duplicate", "cccccc"),
        ("enhancement", "84b6eb"),
        ("question", "cc317c"),
        ("wontfix", "d7e102"),
        ("task", "0b02e1"),
        ("quality", "02d7e1"),
        ("documentation", "eb6420"),
        ("build", "fbca04"),
        ("performance", "d4c5f9"),
        ("critical", "e11d21"),
    ]
    .into_iter()
    .map(|(name, color)| (name.to_string(), color.to_string()))
    .collect()
}

/// Default host for repository URLs
pub const DEFAULT_PROVIDER_BASE_URL: &str = "github.com";

/// Settings for the hosted remote repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfiguration {
    pub active: bool,
    pub create: bool,
    pub repo_user: Option<String>,
    pub repo_name: Option<String>,
    pub project_description: String,
    pub project_home_page: String,
    pub public_project: bool,
    pub issue_labels: BTreeMap<String, String>,
    pub merge_issue_labels: bool,
    pub provider_base_url: String,
    /// Must equal [`RemoteConfiguration::delete_confirmation_phrase`] for a
    /// remote delete to be approved.
    pub confirm_delete: String,
}

impl Default for RemoteConfiguration {
    fn default() -> Self {
        Self {
            active: true,
            create: false,
            repo_user: None,
            repo_name: None,
            project_description: String::new(),
            project_home_page: String::new(),
            public_project: false,
            issue_labels: default_issue_labels(),
            merge_issue_labels: false,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            confirm_delete: String::new(),
        }
    }
}

impl RemoteConfiguration {
    /// `user/name`. Unset parts render as empty strings.
    pub fn full_name(&self) -> String {
        format!(
            "{}/{}",
            self.repo_user.as_deref().unwrap_or_default(),
            self.repo_name.as_deref().unwrap_or_default()
        )
    }

    /// The phrase `confirm_delete` must hold before the remote repository
    /// may be deleted.
    pub fn delete_confirmation_phrase(&self) -> String {
        format!(
            "I really, really want to delete the {} repo from GitHub",
            self.full_name()
        )
    }

    /// Validates this configuration, defaulting the repository name from the
    /// local project name.
    pub fn validate(&mut self, local: &LocalConfiguration) -> Result<()> {
        if self.repo_name.is_none() {
            self.repo_name = local.project_name.clone();
        }
        if self.repo_name.is_none() {
            return Err(Error::Configuration {
                message: "'repo_name' must be specified".to_string(),
                hint: Some("set remote.repo_name or local.project_name".to_string()),
            });
        }
        if self.repo_user.is_none() {
            return Err(Error::configuration("'repo_user' must be specified"));
        }
        Ok(())
    }

    /// Fills host, user and repository name from an origin URL, either
    /// `https://github.com/alice/demo.git` or `git@github.com:alice/demo.git`.
    pub fn setup_from_origin(&mut self, origin: &str) -> Result<()> {
        let descriptor = UrlParser.repo_descriptor(origin)?;
        self.provider_base_url = descriptor.host;
        self.repo_user = Some(descriptor.user);
        self.repo_name = Some(descriptor.name);
        Ok(())
    }

    /// Checks that values already set agree with `origin`, and fills in any
    /// that are missing.
    pub fn verify_against_origin(&mut self, origin: &str) -> Result<()> {
        let descriptor = UrlParser.repo_descriptor(origin)?;
        let mismatch = |field: &str, configured: &str, found: &str| Error::Configuration {
            message: format!(
                "remote {} is '{}' but the local origin '{}' has '{}'",
                field, configured, origin, found
            ),
            hint: None,
        };
        if let Some(configured) = &self.repo_user {
            if configured != &descriptor.user {
                return Err(mismatch("repo_user", configured, &descriptor.user));
            }
        }
        if let Some(configured) = &self.repo_name {
            if configured != &descriptor.name {
                return Err(mismatch("repo_name", configured, &descriptor.name));
            }
        }
        self.setup_from_origin(origin)
    }
}

/// Settings for the wiki repository.
///
/// The wiki lives next to the project, in `<project>.wiki`, and shares the
/// project's tagger identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfiguration {
    pub active: bool,
    pub create: bool,
    pub clone_from_remote: bool,
    pub clone_exists_response: CloneExistsResponse,
}

impl WikiConfiguration {
    /// Derives the local configuration for the wiki from the project's.
    pub fn to_local(&self, local: &LocalConfiguration) -> LocalConfiguration {
        LocalConfiguration {
            active: self.active,
            create: self.create,
            clone_from_remote: self.clone_from_remote,
            project_dir_parent: local.project_dir_parent.clone(),
            project_name: local.project_name.as_ref().map(|n| format!("{}.wiki", n)),
            clone_exists_response: self.clone_exists_response,
            tagger_name: local.tagger_name.clone(),
            tagger_email: local.tagger_email.clone(),
        }
    }
}

/// Which property sources to consult, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySources {
    /// Read `TANDEM_*` environment variables first.
    pub environment: bool,
    /// Additional `key=value` files, consulted in the order given.
    pub files: Vec<PathBuf>,
    /// Read the user's `tandem.properties`.
    pub user_file: bool,
    /// Read `gradle.properties` from `GRADLE_USER_HOME` or `~/.gradle`.
    pub gradle: bool,
}

impl Default for PropertySources {
    fn default() -> Self {
        Self {
            environment: true,
            files: Vec::new(),
            user_file: true,
            gradle: false,
        }
    }
}

/// The complete settings document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ServiceProvider,
    pub local: LocalConfiguration,
    pub remote: RemoteConfiguration,
    pub wiki: WikiConfiguration,
    pub properties: PropertySources,
}

impl Settings {
    /// Parses settings from a YAML string.
    pub fn parse(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml_content).map_err(Error::Yaml)
    }

    /// Reads settings from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }

    /// Reads settings from `path` if given, otherwise from the default
    /// location when a file exists there. Falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = crate::defaults::default_settings_path();
                if default_path.is_file() {
                    log::debug!("reading settings from {}", default_path.display());
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Renders the settings as YAML, for debug logging.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::Yaml)
    }
}

//! # Orchestration
//!
//! The [`Orchestrator`] turns one high-level intent ("create both", "clone
//! both", "use the remote only") into the ordered steps that keep a local
//! working copy, its hosted remote and an optional wiki consistent.
//!
//! ## Lifecycle
//!
//! 1. [`Orchestrator::evaluate`] validates and cross-defaults the local,
//!    remote and wiki configurations, picks the [`Workflow`] and resolves
//!    the remote manager for the configured provider. No I/O happens here.
//! 2. [`Orchestrator::execute`] runs the selected workflow. Every failure
//!    after evaluation is wrapped in a single `Error::Orchestration`.
//!    Completed steps are not rolled back.
//!
//! ## Workflows
//!
//! | Settings                         | Workflow           |
//! |----------------------------------|--------------------|
//! | `local.create` + `remote.create` | `CreateBoth`       |
//! | `remote.create`                  | `CreateRemote`     |
//! | `local.clone_from_remote`        | `CloneLocal`       |
//! | `local.create`                   | `CreateLocal`      |
//! | `local.active`                   | `UseExistingLocal` |
//! | otherwise                        | `RemoteOnly`       |
//!
//! Every workflow except `CreateRemote` finishes by processing the wiki,
//! when the wiki is active.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{CloneExistsResponse, LocalConfiguration, RemoteConfiguration, Settings};
use crate::error::{Error, Result};
use crate::local::clone::{CloneAction, DeleteApprover, RefuseDeletes};
use crate::local::creator::ProjectCreator;
use crate::local::{LocalRepositoryManager, RemoteLink, RepoRole};
use crate::model::{Branch, PushResult};
use crate::properties::{PropertiesResolver, Property};
use crate::remote::resolver::RemoteResolver;
use crate::remote::RemoteRepositoryManager;
use crate::repository::{GitOperations, SystemGit};
use crate::sha::GitSha;

/// Message of the error wrapping any workflow failure.
pub const EXECUTION_FAILED: &str = "Failed to create or clone repository";

/// The workflow [`Orchestrator::execute`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    /// Create the local repository and the hosted remote, push `master`
    /// and leave `develop` checked out.
    CreateBoth,
    CreateRemote,
    CloneLocal,
    CreateLocal,
    /// Use an existing local repository, deriving the remote from its
    /// `origin`.
    UseExistingLocal,
    RemoteOnly,
}

impl Workflow {
    pub fn select(local: &LocalConfiguration, remote: &RemoteConfiguration) -> Self {
        if local.active && local.create && remote.create {
            Workflow::CreateBoth
        } else if remote.create {
            Workflow::CreateRemote
        } else if local.active && local.clone_from_remote {
            Workflow::CloneLocal
        } else if local.active && local.create {
            Workflow::CreateLocal
        } else if local.active {
            Workflow::UseExistingLocal
        } else {
            Workflow::RemoteOnly
        }
    }

    /// Whether the remote user and repository name must be known before
    /// the workflow starts.
    fn needs_remote_coordinates(&self, remote_active: bool) -> bool {
        match self {
            Workflow::CreateBoth | Workflow::CreateRemote | Workflow::CloneLocal => true,
            Workflow::UseExistingLocal => false,
            Workflow::CreateLocal | Workflow::RemoteOnly => remote_active,
        }
    }
}

/// Validated configurations and the resolved remote, ready to execute.
pub struct Evaluation {
    pub workflow: Workflow,
    pub local: LocalConfiguration,
    pub wiki: LocalConfiguration,
    pub wiki_active: bool,
    pub remote: RemoteRepositoryManager,
}

/// What [`Orchestrator::execute`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    pub workflow: Workflow,
    /// `user/name` of the remote, as finally configured.
    pub remote: String,
    pub initial_commit: Option<GitSha>,
    pub clone: Option<CloneAction>,
    /// Result of the first push of `master`.
    pub push: Option<PushResult>,
    pub wiki_processed: bool,
}

impl ExecutionReport {
    fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            remote: String::new(),
            initial_commit: None,
            clone: None,
            push: None,
            wiki_processed: false,
        }
    }
}

pub struct Orchestrator {
    settings: Settings,
    git: Arc<dyn GitOperations>,
    resolver: RemoteResolver,
    properties: Arc<PropertiesResolver>,
    creator: Option<Box<dyn ProjectCreator>>,
    delete_approver: Box<dyn DeleteApprover>,
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        git: Arc<dyn GitOperations>,
        resolver: RemoteResolver,
        properties: Arc<PropertiesResolver>,
    ) -> Self {
        Self {
            settings,
            git,
            resolver,
            properties,
            creator: None,
            delete_approver: Box::new(RefuseDeletes),
        }
    }

    /// An orchestrator using the system `git`, no hosting API and the
    /// property sources named in `settings`.
    pub fn from_settings(settings: Settings) -> Self {
        let properties = Arc::new(PropertiesResolver::from_sources(&settings.properties));
        Self::new(settings, Arc::new(SystemGit), RemoteResolver::new(), properties)
    }

    /// Replaces the default project creator, which writes a README.
    pub fn with_creator(mut self, creator: Box<dyn ProjectCreator>) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Consulted before an existing clone target is deleted.
    pub fn with_delete_approver(mut self, approver: Box<dyn DeleteApprover>) -> Self {
        self.delete_approver = approver;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Configures the creation of a new local repository, its hosted
    /// remote and, if `include_wiki`, the wiki.
    pub fn create_local_and_remote(
        &mut self,
        parent_dir: impl Into<PathBuf>,
        user: &str,
        project_name: &str,
        include_wiki: bool,
        public_project: bool,
    ) -> &mut Self {
        let parent_dir = parent_dir.into();
        let s = &mut self.settings;
        s.remote.repo_user = Some(user.to_string());
        s.remote.repo_name = Some(project_name.to_string());
        s.remote.create = true;
        s.remote.public_project = public_project;

        s.local.active = true;
        s.local.project_dir_parent = parent_dir;
        s.local.project_name = Some(project_name.to_string());
        s.local.clone_from_remote = false;
        s.local.create = true;

        s.wiki.active = include_wiki;
        s.wiki.clone_from_remote = false;
        s.wiki.create = true;
        self
    }

    /// Configures cloning an existing remote and, if `include_wiki`, its
    /// wiki, into `parent_dir`.
    pub fn clone_from_remote(
        &mut self,
        parent_dir: impl Into<PathBuf>,
        user: &str,
        project_name: &str,
        include_wiki: bool,
        response: CloneExistsResponse,
    ) -> &mut Self {
        let parent_dir = parent_dir.into();
        let s = &mut self.settings;
        s.remote.repo_user = Some(user.to_string());
        s.remote.repo_name = Some(project_name.to_string());

        s.local.active = true;
        s.local.project_dir_parent = parent_dir;
        s.local.project_name = Some(project_name.to_string());
        s.local.clone_from_remote = true;
        s.local.create = false;
        s.local.clone_exists_response = response;

        s.wiki.active = include_wiki;
        s.wiki.clone_from_remote = true;
        s.wiki.create = false;
        s.wiki.clone_exists_response = response;
        self
    }

    /// Works with the hosted repository only; nothing local is touched.
    pub fn use_remote_only(&mut self, user: &str, project_name: &str) -> &mut Self {
        self.settings.local.active = false;
        self.settings.remote.repo_user = Some(user.to_string());
        self.settings.remote.repo_name = Some(project_name.to_string());
        self
    }

    pub fn create_remote_only(
        &mut self,
        user: &str,
        project_name: &str,
        public_project: bool,
    ) -> &mut Self {
        self.use_remote_only(user, project_name);
        self.settings.remote.create = true;
        self.settings.remote.public_project = public_project;
        self
    }

    /// Validates and cross-defaults the configurations and resolves the
    /// remote. Fails with `Error::Configuration` if anything required is
    /// still missing.
    pub fn evaluate(&self) -> Result<Evaluation> {
        let mut local = self.settings.local.clone();
        let mut remote = self.settings.remote.clone();

        local.check_flags()?;
        if local.active {
            local.validate(&remote)?;
        }

        let workflow = Workflow::select(&local, &remote);
        if matches!(workflow, Workflow::CreateBoth | Workflow::CreateLocal) {
            // commits need a tagger; a missing property leaves it unset
            let provider = self.settings.provider;
            if local.tagger_name.is_none() {
                local.tagger_name = self.properties.find(Property::TaggerName, provider);
            }
            if local.tagger_email.is_none() {
                local.tagger_email = self.properties.find(Property::TaggerEmail, provider);
            }
        }
        if workflow.needs_remote_coordinates(remote.active) {
            remote.validate(&local)?;
        } else if remote.repo_name.is_none() && workflow != Workflow::UseExistingLocal {
            // an existing checkout takes its coordinates from origin
            remote.repo_name = local.project_name.clone();
        }
        if matches!(workflow, Workflow::CreateBoth | Workflow::CreateRemote) && !remote.active {
            return Err(Error::Configuration {
                message: "the remote repository cannot be created while the remote is inactive"
                    .to_string(),
                hint: Some("set remote.active, or clear remote.create".to_string()),
            });
        }

        let wiki_active = self.settings.wiki.active;
        let wiki = self.settings.wiki.to_local(&local);
        if wiki_active {
            wiki.check_flags()?;
            if wiki.project_name.is_none() {
                return Err(Error::Configuration {
                    message: "the wiki needs a project name".to_string(),
                    hint: Some("set local.project_name or remote.repo_name".to_string()),
                });
            }
        }

        let remote =
            self.resolver
                .resolve(self.settings.provider, &remote, Arc::clone(&self.properties));
        log::debug!("evaluation complete, workflow is {:?}", workflow);
        Ok(Evaluation {
            workflow,
            local,
            wiki,
            wiki_active,
            remote,
        })
    }

    /// Evaluates the settings and runs the selected workflow.
    pub fn execute(&self) -> Result<ExecutionReport> {
        let mut evaluation = self.evaluate()?;
        if log::log_enabled!(log::Level::Debug) {
            log_configuration(&evaluation);
        }
        self.run(&mut evaluation).map_err(|e| Error::Orchestration {
            message: EXECUTION_FAILED.to_string(),
            source: Box::new(e),
        })
    }

    fn run(&self, evaluation: &mut Evaluation) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::new(evaluation.workflow);
        match evaluation.workflow {
            Workflow::CreateBoth => {
                log::debug!("creating both local and remote repos");
                let link = self.project_link(&mut evaluation.remote);
                let mut local = self.manager(evaluation.local.clone(), RepoRole::Project, link);
                local.open();
                local.create_and_initialise()?;
                report.initial_commit = Some(local.commit("Initial commit")?);
                evaluation.remote.create_repo()?;
                local.set_origin()?;
                report.push = Some(local.push(false, false)?);
                local.checkout_new_branch(&Branch::develop())?;
                local.close();
            }
            Workflow::CreateRemote => {
                evaluation.remote.create_repo()?;
                report.remote = evaluation.remote.configuration().full_name();
                return Ok(report);
            }
            Workflow::CloneLocal => {
                let link = self.project_link(&mut evaluation.remote);
                let mut local = self.manager(evaluation.local.clone(), RepoRole::Project, link);
                local.open();
                report.clone = local.clone_remote()?;
                local.close();
            }
            Workflow::CreateLocal => {
                let link = self.project_link(&mut evaluation.remote);
                let mut local = self.manager(evaluation.local.clone(), RepoRole::Project, link);
                local.open();
                local.create_and_initialise()?;
                local.close();
            }
            Workflow::UseExistingLocal => {
                let mut local =
                    self.manager(evaluation.local.clone(), RepoRole::Project, RemoteLink::inactive());
                local.open();
                let origin = local.get_origin()?;
                local.close();
                let mut configuration = evaluation.remote.configuration().clone();
                configuration.verify_against_origin(&origin)?;
                log::debug!("remote derived from origin '{}'", origin);
                evaluation.remote.reconfigure(configuration);
            }
            Workflow::RemoteOnly => {}
        }
        report.wiki_processed = self.process_wiki(evaluation)?;
        report.remote = evaluation.remote.configuration().full_name();
        Ok(report)
    }

    fn process_wiki(&self, evaluation: &mut Evaluation) -> Result<bool> {
        if !evaluation.wiki_active {
            log::debug!("wiki is not active, nothing done for the wiki");
            return Ok(false);
        }
        let url = evaluation.remote.wiki_clone_url();
        let link = RemoteLink {
            active: evaluation.remote.configuration().active,
            clone_source: url.clone(),
            origin_url: url.clone(),
            credentials: credentials(&mut evaluation.remote),
        };
        let mut wiki = self.manager(evaluation.wiki.clone(), RepoRole::Wiki, link);
        wiki.open();
        if evaluation.wiki.clone_from_remote {
            wiki.clone_remote()?;
        } else if evaluation.wiki.create {
            wiki.create_and_initialise()?;
            wiki.set_origin()?;
        } else if wiki.is_initialised() {
            let origin = wiki.get_origin()?;
            if origin != url {
                return Err(Error::configuration(format!(
                    "wiki origin is '{}' but the remote wiki is '{}'",
                    origin, url
                )));
            }
        } else {
            log::debug!("no local wiki at {}", wiki.project_dir().display());
        }
        wiki.close();
        Ok(true)
    }

    fn project_link(&self, remote: &mut RemoteRepositoryManager) -> RemoteLink {
        RemoteLink {
            active: remote.configuration().active,
            clone_source: remote.repo_base_url(),
            origin_url: remote.clone_url(),
            credentials: credentials(remote),
        }
    }

    fn manager(
        &self,
        configuration: LocalConfiguration,
        role: RepoRole,
        link: RemoteLink,
    ) -> LocalRepositoryManager<'_> {
        let approver = self.delete_approver.as_ref();
        let mut manager = LocalRepositoryManager::new(self.git.as_ref(), configuration, role)
            .with_remote(link)
            .with_delete_approver(Box::new(move |dir: &Path| approver.approve(dir)));
        if let (RepoRole::Project, Some(creator)) = (role, self.creator.as_deref()) {
            manager = manager.with_creator(Box::new(
                move |dir: &Path, configuration: &LocalConfiguration| creator.create(dir, configuration),
            ));
        }
        manager
    }
}

/// Push credentials from the remote's restricted token. Without a token,
/// pushes fall back to git's own credential helpers.
fn credentials(remote: &mut RemoteRepositoryManager) -> Option<crate::repository::Credentials> {
    if !remote.configuration().active {
        return None;
    }
    match remote.push_credentials() {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            log::debug!("no push credentials, using git's credential helpers: {}", e);
            None
        }
    }
}

fn log_configuration(evaluation: &Evaluation) {
    let render = |value: Result<String>| value.unwrap_or_else(|e| format!("<unrenderable: {}>", e));
    log::debug!(
        "executing with configuration of:\nlocal:\n{}\nremote:\n{}\nwiki:\n{}",
        render(serde_yaml::to_string(&evaluation.local).map_err(Error::Yaml)),
        render(serde_yaml::to_string(evaluation.remote.configuration()).map_err(Error::Yaml)),
        render(serde_yaml::to_string(&evaluation.wiki).map_err(Error::Yaml)),
    );
}

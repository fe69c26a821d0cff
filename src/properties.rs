//! # Property Resolution
//!
//! API tokens and the tagger identity are kept out of the settings file and
//! looked up at run time through an ordered list of loaders. The first loader
//! with a value wins, so an environment variable can override a value in the
//! user's properties file, which in turn can override `gradle.properties`.
//!
//! ## Keys
//!
//! Tagger properties use bare keys (`tagger-name`, `tagger-email`). Token
//! properties are prefixed with the lowercase provider name, for example
//! `github-repo-create-token`. `EnvPropertiesLoader` maps a key to an
//! environment variable by upper-casing it, replacing `-` with `_` and adding
//! a `TANDEM_` prefix: `TANDEM_GITHUB_REPO_CREATE_TOKEN`.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use ini::Ini;
use log::{debug, error, warn};

use crate::config::PropertySources;
use crate::defaults;
use crate::error::{Error, Result};
use crate::model::{Identity, ServiceProvider};
use crate::remote::hosting::{ApiToken, TokenScope};

/// A value the resolver can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    IssueCreateToken,
    RepoCreateToken,
    RepoDeleteToken,
    TaggerName,
    TaggerEmail,
}

impl Property {
    fn name(&self) -> &'static str {
        match self {
            Property::IssueCreateToken => "issue-create-token",
            Property::RepoCreateToken => "repo-create-token",
            Property::RepoDeleteToken => "repo-delete-token",
            Property::TaggerName => "tagger-name",
            Property::TaggerEmail => "tagger-email",
        }
    }

    /// The lookup key for this property with `provider`.
    pub fn key(&self, provider: ServiceProvider) -> String {
        match self {
            Property::TaggerName | Property::TaggerEmail => self.name().to_string(),
            _ => format!("{}-{}", provider.key(), self.name()),
        }
    }

    /// The token property that grants `scope`.
    pub fn for_scope(scope: TokenScope) -> Self {
        match scope {
            TokenScope::Restricted => Property::IssueCreateToken,
            TokenScope::CreateRepo => Property::RepoCreateToken,
            TokenScope::DeleteRepo => Property::RepoDeleteToken,
        }
    }
}

/// A source of property values.
pub trait PropertiesLoader {
    /// Returns the value for `property`, or `None` if this source does not
    /// specify it.
    fn value(&self, property: Property, provider: ServiceProvider) -> Result<Option<String>>;

    /// Short description used in log messages.
    fn describe(&self) -> String;
}

/// Reads `key=value` pairs from a file.
///
/// The file is read on every lookup. A missing file, or a missing key,
/// answers "not specified".
#[derive(Debug, Clone)]
pub struct FilePropertiesLoader {
    source: PathBuf,
}

impl FilePropertiesLoader {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The user's `tandem.properties`.
    pub fn user_default() -> Self {
        Self::new(defaults::default_properties_path())
    }

    /// `gradle.properties` from `GRADLE_USER_HOME` or `~/.gradle`.
    pub fn gradle() -> Self {
        let source = defaults::gradle_properties_path();
        if !source.exists() {
            warn!(
                "Cannot find a gradle.properties file at {}. If any properties are required the application may fail",
                source.display()
            );
        }
        Self::new(source)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl PropertiesLoader for FilePropertiesLoader {
    fn value(&self, property: Property, provider: ServiceProvider) -> Result<Option<String>> {
        if !self.source.is_file() {
            return Ok(None);
        }
        let ini = Ini::load_from_file(&self.source)?;
        let key = property.key(provider);
        Ok(ini
            .general_section()
            .get(&key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()))
    }

    fn describe(&self) -> String {
        format!("file {}", self.source.display())
    }
}

/// Reads `TANDEM_<KEY>` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvPropertiesLoader;

impl EnvPropertiesLoader {
    pub fn variable_name(property: Property, provider: ServiceProvider) -> String {
        format!(
            "TANDEM_{}",
            property.key(provider).to_uppercase().replace('-', "_")
        )
    }
}

impl PropertiesLoader for EnvPropertiesLoader {
    fn value(&self, property: Property, provider: ServiceProvider) -> Result<Option<String>> {
        Ok(env::var(Self::variable_name(property, provider))
            .ok()
            .filter(|value| !value.is_empty()))
    }

    fn describe(&self) -> String {
        "environment".to_string()
    }
}

/// Holds values in memory, keyed by property key.
#[derive(Debug, Clone, Default)]
pub struct MapPropertiesLoader {
    values: HashMap<String, String>,
}

impl MapPropertiesLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl PropertiesLoader for MapPropertiesLoader {
    fn value(&self, property: Property, provider: ServiceProvider) -> Result<Option<String>> {
        Ok(self.values.get(&property.key(provider)).cloned())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} values)", self.values.len())
    }
}

/// Looks a property up in each loader in turn.
pub struct PropertiesResolver {
    loaders: Vec<Box<dyn PropertiesLoader>>,
}

impl PropertiesResolver {
    pub fn new(loaders: Vec<Box<dyn PropertiesLoader>>) -> Self {
        Self { loaders }
    }

    /// A resolver with no loaders. Every lookup fails with
    /// `Error::MissingProperty`.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Builds the loader chain described by `sources`: environment, extra
    /// files, the user's file, then `gradle.properties`.
    pub fn from_sources(sources: &PropertySources) -> Self {
        let mut loaders: Vec<Box<dyn PropertiesLoader>> = Vec::new();
        if sources.environment {
            loaders.push(Box::new(EnvPropertiesLoader));
        }
        for file in &sources.files {
            loaders.push(Box::new(FilePropertiesLoader::new(file)));
        }
        if sources.user_file {
            loaders.push(Box::new(FilePropertiesLoader::user_default()));
        }
        if sources.gradle {
            loaders.push(Box::new(FilePropertiesLoader::gradle()));
        }
        Self::new(loaders)
    }

    pub fn push(&mut self, loader: Box<dyn PropertiesLoader>) {
        self.loaders.push(loader);
    }

    /// Returns the first value any loader specifies.
    ///
    /// A loader that fails is logged and skipped, as if it had no value.
    pub fn resolve(&self, property: Property, provider: ServiceProvider) -> Result<String> {
        self.find(property, provider).ok_or_else(|| {
            let key = property.key(provider);
            error!("No value found for property {}", key);
            Error::MissingProperty { key }
        })
    }

    /// As [`resolve`](Self::resolve), for optional properties: a missing
    /// value is `None` and is not logged as an error.
    pub fn find(&self, property: Property, provider: ServiceProvider) -> Option<String> {
        self.loaders
            .iter()
            .find_map(|loader| match loader.value(property, provider) {
                Ok(value) => value,
                Err(e) => {
                    debug!(
                        "properties loader '{}' failed for {}: {}",
                        loader.describe(),
                        property.key(provider),
                        e
                    );
                    None
                }
            })
    }

    /// An API token granting `scope` on `provider`.
    pub fn api_token(&self, scope: TokenScope, provider: ServiceProvider) -> Result<ApiToken> {
        let value = self.resolve(Property::for_scope(scope), provider)?;
        Ok(ApiToken::new(scope, value))
    }

    pub fn tagger_name(&self) -> Result<String> {
        // tagger keys ignore the provider
        self.resolve(Property::TaggerName, ServiceProvider::GitHub)
    }

    pub fn tagger_email(&self) -> Result<String> {
        self.resolve(Property::TaggerEmail, ServiceProvider::GitHub)
    }

    pub fn tagger(&self) -> Result<Identity> {
        Ok(Identity::new(self.tagger_name()?, self.tagger_email()?))
    }
}

impl Default for PropertiesResolver {
    fn default() -> Self {
        Self::from_sources(&PropertySources::default())
    }
}

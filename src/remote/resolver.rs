//! Choosing the hosting API for a provider.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RemoteConfiguration;
use crate::model::ServiceProvider;
use crate::properties::PropertiesResolver;
use crate::remote::hosting::{HostingApi, OfflineHosting};
use crate::remote::RemoteRepositoryManager;

/// Maps each service provider to the hosting API that talks to it.
#[derive(Default, Clone)]
pub struct RemoteResolver {
    hosts: HashMap<ServiceProvider, Arc<dyn HostingApi>>,
}

impl RemoteResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `hosting` for `provider`, replacing any earlier registration.
    pub fn register(mut self, provider: ServiceProvider, hosting: Arc<dyn HostingApi>) -> Self {
        self.hosts.insert(provider, hosting);
        self
    }

    pub fn is_registered(&self, provider: ServiceProvider) -> bool {
        self.hosts.contains_key(&provider)
    }

    /// Builds a remote manager for `provider` over a snapshot of
    /// `configuration`. Later edits to `configuration` are not seen by the
    /// returned manager.
    ///
    /// A provider with nothing registered gets [`OfflineHosting`], which is
    /// enough for URL mapping but fails every API call.
    pub fn resolve(
        &self,
        provider: ServiceProvider,
        configuration: &RemoteConfiguration,
        properties: Arc<PropertiesResolver>,
    ) -> RemoteRepositoryManager {
        let hosting = match self.hosts.get(&provider) {
            Some(hosting) => Arc::clone(hosting),
            None => {
                log::debug!("no hosting API registered for {}, working offline", provider);
                Arc::new(OfflineHosting)
            }
        };
        RemoteRepositoryManager::new(provider, configuration.clone(), hosting, properties)
    }
}

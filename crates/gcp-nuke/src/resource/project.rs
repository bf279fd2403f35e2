//! Target project and its client cache

use super::ClientHandle;
use crate::config::ConfigError;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Credentials used by adapters to build their clients
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Service-account key file; `None` uses application default credentials
    pub keyfile: Option<PathBuf>,
    /// Project to nuke
    pub project: String,
}

impl Credentials {
    pub fn use_app_default_creds(&self) -> bool {
        self.keyfile.is_none()
    }

    /// Check that a project is named and the keyfile, if any, exists
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project.is_empty() {
            return Err(ConfigError::MissingProject);
        }
        match &self.keyfile {
            Some(keyfile) if !keyfile.exists() => {
                Err(ConfigError::MissingKeyfile(keyfile.display().to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// The project being nuked.
///
/// Holds at most one provider client per resource type for the lifetime of
/// the run. Lookups and inserts are safe from concurrent tasks.
#[derive(Debug)]
pub struct Project {
    name: String,
    credentials: Credentials,
    locations: Vec<String>,
    clients: Mutex<HashMap<String, ClientHandle>>,
}

impl Project {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            name: credentials.project.clone(),
            credentials,
            locations: Vec::new(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Regions/zones adapters should restrict listing to
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn cached_client(&self, resource_type: &str) -> Option<ClientHandle> {
        self.lock_clients().get(resource_type).cloned()
    }

    /// Return the cached client for `resource_type`, creating it on first use.
    ///
    /// If two tasks race to create the same client, the first one stored wins
    /// and both callers receive it.
    pub async fn client_for<F, Fut>(&self, resource_type: &str, create: F) -> Result<ClientHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ClientHandle>>,
    {
        if let Some(client) = self.cached_client(resource_type) {
            return Ok(client);
        }

        let created = create().await?;
        debug!(project = %self.name, resource_type, "Created client");

        let mut clients = self.lock_clients();
        Ok(clients
            .entry(resource_type.to_string())
            .or_insert(created)
            .clone())
    }

    pub fn client_count(&self) -> usize {
        self.lock_clients().len()
    }

    /// Drop every cached client
    pub fn close_clients(&self) {
        let mut clients = self.lock_clients();
        debug!(project = %self.name, count = clients.len(), "Closing clients");
        clients.clear();
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, HashMap<String, ClientHandle>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

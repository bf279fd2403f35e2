//! In-memory fake cloud
//!
//! A [`FakeCloud`] holds the live resources of every fake resource type and
//! counts how often clients are created, types are listed and resources are
//! removed. Adapters built from it share that state, so a test can watch the
//! engine converge.

use anyhow::{Result, bail};
use async_trait::async_trait;
use gcp_nuke::config::FeatureFlags;
use gcp_nuke::resource::{
    Capabilities, ClientHandle, ClientProvider, Credentials, FilterVerdict, Lister, Project,
    Resource, ResourceType,
};
use gcp_nuke_common::Properties;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Marker for the bucket-like fake kind
#[derive(Debug)]
pub struct Bucket;

/// Marker for the instance-like fake kind
#[derive(Debug)]
pub struct Instance;

/// What happens when a fake resource is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveBehavior {
    /// Disappears from the next listing
    #[default]
    Delete,
    /// Remove always errors
    Fail,
    /// Remove succeeds but the resource never disappears
    Stuck,
    /// Remove succeeds, the resource stays listed and the operation reports an error
    OperationError,
}

/// Self-exclusion of a fake resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protection {
    #[default]
    None,
    /// Rejected by its own filter unless the feature flag disables protection
    Enabled,
    /// Its own filter check errors
    CheckFails,
}

/// Definition of one fake resource
#[derive(Debug, Clone, Default)]
pub struct FakeSpec {
    pub name: String,
    pub properties: Properties,
    pub behavior: RemoveBehavior,
    pub protection: Protection,
    /// Remove errors when called without a client
    pub needs_client: bool,
}

impl FakeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            properties: Properties::new().set("Name", &name),
            name,
            ..Default::default()
        }
    }

    pub fn with_property(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.properties.insert(key, value);
        self
    }

    pub fn with_behavior(mut self, behavior: RemoveBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    pub fn needs_client(mut self) -> Self {
        self.needs_client = true;
        self
    }
}

#[derive(Debug, Default)]
struct CloudState {
    resources: BTreeMap<String, Vec<FakeSpec>>,
    list_calls: HashMap<String, usize>,
    client_creations: HashMap<String, usize>,
    remove_calls: HashMap<String, usize>,
    failing_listers: HashSet<String>,
    failing_clients: HashSet<String>,
}

/// Shared fake cloud
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a live resource of `resource_type`
    pub fn add(&self, resource_type: &str, spec: FakeSpec) {
        self.lock()
            .resources
            .entry(resource_type.to_string())
            .or_default()
            .push(spec);
    }

    pub fn contains(&self, resource_type: &str, name: &str) -> bool {
        self.lock()
            .resources
            .get(resource_type)
            .is_some_and(|specs| specs.iter().any(|s| s.name == name))
    }

    pub fn live_count(&self, resource_type: &str) -> usize {
        self.lock()
            .resources
            .get(resource_type)
            .map_or(0, Vec::len)
    }

    pub fn list_calls(&self, resource_type: &str) -> usize {
        self.lock().list_calls.get(resource_type).copied().unwrap_or(0)
    }

    pub fn client_creations(&self, resource_type: &str) -> usize {
        self.lock()
            .client_creations
            .get(resource_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn remove_calls(&self, name: &str) -> usize {
        self.lock().remove_calls.get(name).copied().unwrap_or(0)
    }

    /// Make every listing of `resource_type` fail
    pub fn fail_listing(&self, resource_type: &str) {
        self.lock().failing_listers.insert(resource_type.to_string());
    }

    /// Make client creation for `resource_type` fail
    pub fn fail_clients(&self, resource_type: &str) {
        self.lock().failing_clients.insert(resource_type.to_string());
    }

    fn delete(&self, resource_type: &str, name: &str) {
        if let Some(specs) = self.lock().resources.get_mut(resource_type) {
            specs.retain(|s| s.name != name);
        }
    }

    /// A registrable resource type of kind `K` backed by this cloud
    pub fn resource_type<K>(&self, name: &str, capabilities: Capabilities) -> ResourceType
    where
        K: fmt::Debug + Send + Sync + 'static,
    {
        ResourceType::new(
            name,
            FakeClientProvider {
                cloud: self.clone(),
                resource_type: name.to_string(),
            },
            FakeLister::<K> {
                cloud: self.clone(),
                resource_type: name.to_string(),
                kind: PhantomData,
            },
        )
        .with_capabilities(capabilities)
    }
}

/// Every optional capability
pub fn all_capabilities() -> Capabilities {
    Capabilities::none()
        .with_dynamic_filter()
        .with_legacy_identity()
        .with_properties()
        .with_async_operation()
        .with_feature_flags()
}

/// A project with application default credentials
pub fn test_project(name: &str) -> Arc<Project> {
    Arc::new(Project::new(Credentials {
        keyfile: None,
        project: name.to_string(),
    }))
}

/// Client handed out by [`FakeClientProvider`]
#[derive(Debug)]
pub struct FakeClient {
    pub resource_type: String,
}

struct FakeClientProvider {
    cloud: FakeCloud,
    resource_type: String,
}

#[async_trait]
impl ClientProvider for FakeClientProvider {
    async fn create(&self, _project: &Project) -> Result<ClientHandle> {
        let mut state = self.cloud.lock();
        *state
            .client_creations
            .entry(self.resource_type.clone())
            .or_default() += 1;
        if state.failing_clients.contains(&self.resource_type) {
            bail!("permission denied creating {} client", self.resource_type);
        }
        Ok(Arc::new(FakeClient {
            resource_type: self.resource_type.clone(),
        }))
    }
}

struct FakeLister<K> {
    cloud: FakeCloud,
    resource_type: String,
    kind: PhantomData<fn() -> K>,
}

#[async_trait]
impl<K> Lister for FakeLister<K>
where
    K: fmt::Debug + Send + Sync + 'static,
{
    async fn list(&self, _project: &Project, client: &ClientHandle) -> Result<Vec<Box<dyn Resource>>> {
        let Some(client) = client.downcast_ref::<FakeClient>() else {
            bail!("unexpected client for {}", self.resource_type);
        };
        if client.resource_type != self.resource_type {
            bail!("client for {} used to list {}", client.resource_type, self.resource_type);
        }

        let mut state = self.cloud.lock();
        *state.list_calls.entry(self.resource_type.clone()).or_default() += 1;
        if state.failing_listers.contains(&self.resource_type) {
            bail!("listing {} failed", self.resource_type);
        }

        let specs = state
            .resources
            .get(&self.resource_type)
            .cloned()
            .unwrap_or_default();
        Ok(specs
            .into_iter()
            .map(|spec| {
                Box::new(FakeResource::<K> {
                    resource_type: self.resource_type.clone(),
                    spec,
                    protection_disabled: false,
                    cloud: self.cloud.clone(),
                    kind: PhantomData,
                }) as Box<dyn Resource>
            })
            .collect())
    }
}

/// A fake resource instance of kind `K`
pub struct FakeResource<K> {
    resource_type: String,
    spec: FakeSpec,
    protection_disabled: bool,
    cloud: FakeCloud,
    kind: PhantomData<fn() -> K>,
}

impl<K> fmt::Debug for FakeResource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeResource")
            .field("resource_type", &self.resource_type)
            .field("name", &self.spec.name)
            .field("kind", &std::any::type_name::<K>())
            .finish()
    }
}

#[async_trait]
impl<K> Resource for FakeResource<K>
where
    K: fmt::Debug + Send + Sync + 'static,
{
    async fn remove(&mut self, _project: &Project, client: Option<&ClientHandle>) -> Result<()> {
        *self
            .cloud
            .lock()
            .remove_calls
            .entry(self.spec.name.clone())
            .or_default() += 1;

        if client.is_none() && self.spec.needs_client {
            bail!("no client to remove {}", self.spec.name);
        }

        match self.spec.behavior {
            RemoveBehavior::Delete => {
                self.cloud.delete(&self.resource_type, &self.spec.name);
                Ok(())
            }
            RemoveBehavior::Fail => bail!("cannot remove {}: resource in use", self.spec.name),
            RemoveBehavior::Stuck | RemoveBehavior::OperationError => Ok(()),
        }
    }

    async fn operation_error(&self, _project: &Project) -> Result<()> {
        if self.spec.behavior == RemoveBehavior::OperationError {
            bail!("delete operation for {} failed", self.spec.name);
        }
        Ok(())
    }

    async fn dynamic_filter(&self) -> Result<FilterVerdict> {
        match self.spec.protection {
            Protection::Enabled if !self.protection_disabled => Ok(FilterVerdict::Reject(
                "deletion protection enabled".to_string(),
            )),
            Protection::CheckFails => bail!("could not read protection of {}", self.spec.name),
            _ => Ok(FilterVerdict::Keep),
        }
    }

    fn legacy_identity(&self) -> String {
        self.spec.name.clone()
    }

    fn properties(&self) -> Properties {
        self.spec.properties.clone()
    }

    fn apply_feature_flags(&mut self, flags: &FeatureFlags) {
        self.protection_disabled = flags.deletion_protection_disabled(&self.resource_type);
    }
}

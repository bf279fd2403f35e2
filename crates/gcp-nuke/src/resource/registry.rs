//! Registry of resource-type adapters
//!
//! Built once at startup from every adapter's registration and passed by
//! reference to the resolver and scanner. Registering the same name twice is a
//! configuration error.

use super::{ClientHandle, ClientProvider, Lister, Project, Resource};
use crate::config::ConfigError;
use anyhow::{Context, Result};
use gcp_nuke_common::Collection;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Optional [`Resource`] behaviour an adapter supports.
///
/// Declared once per resource type so the engine never has to probe
/// individual instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// [`Resource::dynamic_filter`] may reject instances
    pub dynamic_filter: bool,
    /// [`Resource::legacy_identity`] returns a meaningful identity
    pub legacy_identity: bool,
    /// [`Resource::properties`] returns a meaningful description
    pub properties: bool,
    /// [`Resource::operation_error`] reports asynchronous delete outcomes
    pub async_operation: bool,
    /// [`Resource::apply_feature_flags`] consumes the run's feature flags
    pub feature_flags: bool,
}

impl Capabilities {
    pub const fn none() -> Self {
        Self {
            dynamic_filter: false,
            legacy_identity: false,
            properties: false,
            async_operation: false,
            feature_flags: false,
        }
    }

    pub const fn with_dynamic_filter(mut self) -> Self {
        self.dynamic_filter = true;
        self
    }

    pub const fn with_legacy_identity(mut self) -> Self {
        self.legacy_identity = true;
        self
    }

    pub const fn with_properties(mut self) -> Self {
        self.properties = true;
        self
    }

    pub const fn with_async_operation(mut self) -> Self {
        self.async_operation = true;
        self
    }

    pub const fn with_feature_flags(mut self) -> Self {
        self.feature_flags = true;
        self
    }
}

/// One registered resource type: its name, client provider, lister and capabilities
pub struct ResourceType {
    name: String,
    client_provider: Arc<dyn ClientProvider>,
    lister: Arc<dyn Lister>,
    capabilities: Capabilities,
}

impl ResourceType {
    pub fn new(
        name: impl Into<String>,
        client_provider: impl ClientProvider + 'static,
        lister: impl Lister + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            client_provider: Arc::new(client_provider),
            lister: Arc::new(lister),
            capabilities: Capabilities::none(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The project's client for this type, created on first use
    pub async fn client(&self, project: &Project) -> Result<ClientHandle> {
        project
            .client_for(&self.name, || self.client_provider.create(project))
            .await
    }

    /// List every live instance of this type in `project`
    pub async fn list(&self, project: &Project) -> Result<Vec<Box<dyn Resource>>> {
        let client = self
            .client(project)
            .await
            .with_context(|| format!("failed to create client for {}", self.name))?;
        self.lister
            .list(project, &client)
            .await
            .with_context(|| format!("failed to list {}", self.name))
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// All resource types known to this run
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    types: BTreeMap<String, Arc<ResourceType>>,
}

impl ResourceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.types.get(name)
    }

    /// Names of every registered type
    pub fn names(&self) -> Collection {
        self.types.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Collects adapter registrations and checks them for duplicates
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<ResourceType>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, resource_type: ResourceType) -> Self {
        self.types.push(resource_type);
        self
    }

    pub fn build(self) -> Result<ResourceRegistry, ConfigError> {
        let mut types = BTreeMap::new();
        for resource_type in self.types {
            let name = resource_type.name.clone();
            if types.insert(name.clone(), Arc::new(resource_type)).is_some() {
                return Err(ConfigError::DuplicateResourceType(name));
            }
        }
        Ok(ResourceRegistry { types })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Credentials, MockClientProvider, MockLister};

    fn project() -> Project {
        Project::new(Credentials {
            keyfile: None,
            project: "dev".to_string(),
        })
    }

    fn empty_type(name: &str) -> ResourceType {
        let mut provider = MockClientProvider::new();
        provider
            .expect_create()
            .returning(|_| Ok(Arc::new(()) as ClientHandle));
        let mut lister = MockLister::new();
        lister.expect_list().returning(|_, _| Ok(Vec::new()));
        ResourceType::new(name, provider, lister)
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = ResourceRegistry::builder()
            .register(empty_type("Bucket"))
            .register(empty_type("Disk"))
            .register(empty_type("Bucket"))
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::DuplicateResourceType(name)) if name == "Bucket"
        ));
    }

    #[test]
    fn test_names() {
        let registry = ResourceRegistry::builder()
            .register(empty_type("Disk"))
            .register(empty_type("Bucket"))
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), Collection::from(vec!["Bucket", "Disk"]));
        assert!(registry.get("Bucket").is_some());
        assert!(registry.get("Firewall").is_none());
    }

    #[test]
    fn test_capabilities_builder() {
        let caps = Capabilities::none().with_legacy_identity().with_async_operation();
        assert!(caps.legacy_identity);
        assert!(caps.async_operation);
        assert!(!caps.properties);
        assert!(!caps.dynamic_filter);
        assert_eq!(Capabilities::default(), Capabilities::none());
    }

    #[tokio::test]
    async fn test_list_reuses_cached_client() {
        let mut provider = MockClientProvider::new();
        provider
            .expect_create()
            .times(1)
            .returning(|_| Ok(Arc::new(7u8) as ClientHandle));
        let mut lister = MockLister::new();
        lister
            .expect_list()
            .times(3)
            .returning(|_, client| {
                assert_eq!(client.downcast_ref::<u8>(), Some(&7));
                Ok(Vec::new())
            });

        let resource_type = ResourceType::new("Bucket", provider, lister);
        let project = project();
        for _ in 0..3 {
            assert!(resource_type.list(&project).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_list_reports_client_failure() {
        let mut provider = MockClientProvider::new();
        provider
            .expect_create()
            .returning(|_| Err(anyhow::anyhow!("permission denied")));
        let mut lister = MockLister::new();
        lister.expect_list().never();

        let resource_type = ResourceType::new("Bucket", provider, lister);
        let err = resource_type.list(&project()).await.unwrap_err();
        assert!(format!("{err:#}").contains("permission denied"));
    }
}

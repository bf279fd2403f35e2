//! Items and the queue they live in
//!
//! The queue is filled by the scanner and its membership never changes after
//! that. The removal engine only moves items between states.

use crate::error::FailedItem;
use crate::resource::{Capabilities, ClientHandle, Project, Resource, ResourceType};
use anyhow::Result;
use gcp_nuke_common::Properties;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Lifecycle state of an [`Item`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Discovered and eligible for removal
    New,
    /// Removal was just triggered
    Pending,
    /// Removal triggered, waiting for the resource to disappear
    Waiting,
    /// The last removal or liveness check failed; retried next pass
    Failed,
    /// Excluded from removal
    Filtered,
    /// Gone
    Finished,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Filtered | ItemState::Finished)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::New => "new",
            ItemState::Pending => "pending",
            ItemState::Waiting => "waiting",
            ItemState::Failed => "failed",
            ItemState::Filtered => "filtered",
            ItemState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Concrete kind of a resource behind the trait object
fn kind(resource: &dyn Resource) -> TypeId {
    resource.as_any().type_id()
}

/// Whether two resources describe the same cloud instance.
///
/// Resources of different concrete kinds are never equal. Otherwise the
/// legacy identity is compared when both types expose it, then the
/// properties, and resources exposing neither are never equal.
pub fn resources_equal(
    a: &dyn Resource,
    a_caps: Capabilities,
    b: &dyn Resource,
    b_caps: Capabilities,
) -> bool {
    if kind(a) != kind(b) {
        return false;
    }

    if a_caps.legacy_identity && b_caps.legacy_identity {
        return a.legacy_identity() == b.legacy_identity();
    }

    if a_caps.properties && b_caps.properties {
        return a.properties() == b.properties();
    }

    false
}

/// One discovered resource instance under lifecycle tracking
#[derive(Debug)]
pub struct Item {
    resource: Box<dyn Resource>,
    resource_type: Arc<ResourceType>,
    project: Arc<Project>,
    state: ItemState,
    reason: String,
}

impl Item {
    pub fn new(
        resource: Box<dyn Resource>,
        resource_type: Arc<ResourceType>,
        project: Arc<Project>,
    ) -> Self {
        Self {
            resource,
            resource_type,
            project,
            state: ItemState::New,
            reason: String::new(),
        }
    }

    pub fn resource(&self) -> &dyn Resource {
        self.resource.as_ref()
    }

    pub fn resource_mut(&mut self) -> &mut dyn Resource {
        self.resource.as_mut()
    }

    /// Name of the item's resource type
    pub fn resource_type(&self) -> &str {
        self.resource_type.name()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.resource_type.capabilities()
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Why the item is Failed or Filtered; empty otherwise
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Move to `state`, clearing the reason
    pub fn set_state(&mut self, state: ItemState) {
        self.state = state;
        self.reason.clear();
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = ItemState::Failed;
        self.reason = reason.into();
    }

    pub fn filter(&mut self, reason: impl Into<String>) {
        self.state = ItemState::Filtered;
        self.reason = reason.into();
    }

    /// Legacy identity, or an empty string if the type has none
    pub fn identity(&self) -> String {
        if self.capabilities().legacy_identity {
            self.resource.legacy_identity()
        } else {
            String::new()
        }
    }

    pub fn properties(&self) -> Option<Properties> {
        self.capabilities()
            .properties
            .then(|| self.resource.properties())
    }

    /// Value a filter compares against.
    ///
    /// An empty key selects the legacy identity. A key the resource's
    /// properties lack reads as an empty string. Returns `None` only when the
    /// type has no legacy identity or no properties at all.
    pub fn get_property(&self, key: &str) -> Option<String> {
        let caps = self.capabilities();
        if key.is_empty() {
            return caps.legacy_identity.then(|| self.resource.legacy_identity());
        }
        if !caps.properties {
            return None;
        }
        Some(
            self.resource
                .properties()
                .get(key)
                .unwrap_or_default()
                .to_string(),
        )
    }

    pub fn equals(&self, other: &Item) -> bool {
        resources_equal(
            self.resource(),
            self.capabilities(),
            other.resource(),
            other.capabilities(),
        )
    }

    /// Whether `other`, freshly listed for this item's type, is this item
    pub fn matches_listed(&self, other: &dyn Resource) -> bool {
        let caps = self.capabilities();
        resources_equal(self.resource(), caps, other, caps)
    }

    /// Ask the adapter to delete the resource.
    ///
    /// A client that cannot be created is logged and the adapter is called
    /// without one.
    pub async fn remove(&mut self) -> Result<()> {
        let client: Option<ClientHandle> = match self.resource_type.client(&self.project).await {
            Ok(client) => Some(client),
            Err(e) => {
                error!(
                    project = %self.project.name(),
                    resource_type = %self.resource_type.name(),
                    error = ?e,
                    "Failed to get client"
                );
                None
            }
        };
        self.resource.remove(&self.project, client.as_ref()).await
    }

    /// Fresh listing of every instance of this item's type in its project
    pub async fn list(&self) -> Result<Vec<Box<dyn Resource>>> {
        self.resource_type.list(&self.project).await
    }
}

impl From<&Item> for FailedItem {
    fn from(item: &Item) -> Self {
        let identity = match item.properties() {
            Some(properties) if item.identity().is_empty() => properties.to_string(),
            _ => item.identity(),
        };
        FailedItem {
            resource_type: item.resource_type().to_string(),
            identity,
            reason: item.reason().to_string(),
        }
    }
}

/// Ordered collection of items
#[derive(Debug, Default)]
pub struct Queue {
    items: Vec<Item>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn count_total(&self) -> usize {
        self.items.len()
    }

    /// Number of items in any of `states`
    pub fn count(&self, states: &[ItemState]) -> usize {
        self.items
            .iter()
            .filter(|item| states.contains(&item.state))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Item> {
        self.items.iter_mut()
    }

    pub fn in_state(&self, state: ItemState) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |item| item.state == state)
    }
}

impl<'a> IntoIterator for &'a Queue {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

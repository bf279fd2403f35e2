//! Resource adapter contract
//!
//! Each cloud resource kind is supported by an adapter that provides:
//! - a [`ClientProvider`] creating the provider SDK client for a project,
//! - a [`Lister`] enumerating live instances as [`Resource`] trait objects,
//! - the [`Resource`] implementation itself, which knows how to remove one
//!   instance and optionally how to describe or self-exclude it.
//!
//! Adapters are collected into a [`ResourceRegistry`] once at startup. Which
//! optional [`Resource`] methods the engine consults is decided by the
//! [`Capabilities`] declared at registration, not by probing each instance.

mod project;
mod registry;

pub use project::{Credentials, Project};
pub use registry::{Capabilities, RegistryBuilder, ResourceRegistry, ResourceType};

use crate::config::FeatureFlags;
use anyhow::Result;
use async_trait::async_trait;
use gcp_nuke_common::Properties;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque provider client shared by every item of one resource type in a project.
///
/// Adapters downcast it to their concrete SDK client.
pub type ClientHandle = Arc<dyn Any + Send + Sync>;

/// Outcome of a resource's own exclusion check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Nothing prevents removal
    Keep,
    /// The instance must not be removed, with a human-readable reason
    Reject(String),
}

/// Access to the concrete type behind a trait object
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One live cloud resource instance
#[async_trait]
pub trait Resource: AsAny + Send + Sync + fmt::Debug {
    /// Delete the instance. May start a long-running provider operation.
    ///
    /// `client` is `None` when the client could not be created; adapters
    /// decide how to fail in that case.
    async fn remove(&mut self, project: &Project, client: Option<&ClientHandle>) -> Result<()>;

    /// Outcome of the asynchronous delete started by [`Resource::remove`].
    ///
    /// Consulted when [`Capabilities::async_operation`] is set.
    async fn operation_error(&self, _project: &Project) -> Result<()> {
        Ok(())
    }

    /// The instance's own exclusion check, e.g. deletion protection.
    ///
    /// Consulted when [`Capabilities::dynamic_filter`] is set. An `Err` means
    /// the check itself could not run.
    async fn dynamic_filter(&self) -> Result<FilterVerdict> {
        Ok(FilterVerdict::Keep)
    }

    /// Single identity string. Consulted when [`Capabilities::legacy_identity`] is set.
    fn legacy_identity(&self) -> String {
        String::new()
    }

    /// Structured description. Consulted when [`Capabilities::properties`] is set.
    fn properties(&self) -> Properties {
        Properties::new()
    }

    /// Receive the run's feature flags before filtering.
    ///
    /// Consulted when [`Capabilities::feature_flags`] is set.
    fn apply_feature_flags(&mut self, _flags: &FeatureFlags) {}
}

/// Enumerates the live instances of one resource type
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Lister: Send + Sync {
    async fn list(&self, project: &Project, client: &ClientHandle) -> Result<Vec<Box<dyn Resource>>>;
}

/// Creates the provider client for one resource type
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn create(&self, project: &Project) -> Result<ClientHandle>;
}

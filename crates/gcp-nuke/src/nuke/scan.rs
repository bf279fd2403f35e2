//! Scanner: lists every resolved resource type and builds the queue

use super::filter::apply_filters;
use super::queue::{Item, Queue};
use super::report::Reporter;
use crate::config::{FeatureFlags, FilterSet};
use crate::error::NukeError;
use crate::resource::{Project, Resource, ResourceRegistry, ResourceType};
use futures::{StreamExt, TryStreamExt, stream};
use gcp_nuke_common::Collection;
use gcp_nuke_common::defaults::SCAN_CONCURRENCY;
use std::pin::pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Scanner<'a> {
    registry: &'a ResourceRegistry,
    project: Arc<Project>,
    filters: &'a FilterSet,
    feature_flags: &'a FeatureFlags,
    reporter: Reporter,
}

impl<'a> Scanner<'a> {
    pub fn new(
        registry: &'a ResourceRegistry,
        project: Arc<Project>,
        filters: &'a FilterSet,
        feature_flags: &'a FeatureFlags,
        reporter: Reporter,
    ) -> Self {
        Self {
            registry,
            project,
            filters,
            feature_flags,
            reporter,
        }
    }

    /// List every type in `resource_types` and return the filtered queue.
    ///
    /// Types are listed concurrently and each listing is reported as it
    /// arrives, in resolution order. A single listing failure aborts the scan.
    pub async fn scan(&self, resource_types: &Collection) -> Result<Queue, NukeError> {
        let types: Vec<Arc<ResourceType>> = resource_types
            .iter()
            .filter_map(|name| {
                let resource_type = self.registry.get(name).cloned();
                if resource_type.is_none() {
                    warn!(resource_type = %name, "Skipping unregistered resource type");
                }
                resource_type
            })
            .collect();

        info!(
            project = %self.project.name(),
            types = types.len(),
            "Scanning resources"
        );

        let mut listings = pin!(
            stream::iter(types)
                .map(|resource_type| {
                    let project = Arc::clone(&self.project);
                    async move {
                        let resources = resource_type.list(&project).await.map_err(|source| {
                            NukeError::Scan {
                                resource_type: resource_type.name().to_string(),
                                source,
                            }
                        })?;
                        debug!(
                            resource_type = %resource_type.name(),
                            count = resources.len(),
                            "Listed resources"
                        );
                        Ok::<_, NukeError>((resource_type, resources))
                    }
                })
                .buffered(SCAN_CONCURRENCY)
        );

        let mut queue = Queue::new();
        while let Some((resource_type, resources)) = listings.try_next().await? {
            self.enqueue(&mut queue, &resource_type, resources).await?;
        }

        Ok(queue)
    }

    /// Wrap, filter and report one type's listing as soon as it arrives
    async fn enqueue(
        &self,
        queue: &mut Queue,
        resource_type: &Arc<ResourceType>,
        resources: Vec<Box<dyn Resource>>,
    ) -> Result<(), NukeError> {
        let filters = self.filters.get(resource_type.name()).unwrap_or_default();
        for resource in resources {
            let mut item = Item::new(resource, Arc::clone(resource_type), Arc::clone(&self.project));
            if item.capabilities().feature_flags {
                item.resource_mut().apply_feature_flags(self.feature_flags);
            }
            apply_filters(&mut item, filters).await?;
            self.reporter.item(&item);
            queue.push(item);
        }
        Ok(())
    }
}

//! Helpers shared by the integration tests

#![allow(dead_code)]

use gcp_nuke::config::{FeatureFlags, FilterSet};
use gcp_nuke::nuke::{Queue, RemovalEngine, Reporter, Scanner};
use gcp_nuke::resource::{Capabilities, Project, ResourceRegistry};
use gcp_nuke::NukeError;
use gcp_nuke_test_utils::{Bucket, FakeCloud, Instance};
use std::sync::Arc;
use std::time::Duration;

pub const BUCKET: &str = "Bucket";
pub const INSTANCE: &str = "Instance";

/// Registry with a bucket-kind and an instance-kind type backed by `cloud`
pub fn registry(cloud: &FakeCloud, capabilities: Capabilities) -> ResourceRegistry {
    ResourceRegistry::builder()
        .register(cloud.resource_type::<Bucket>(BUCKET, capabilities))
        .register(cloud.resource_type::<Instance>(INSTANCE, capabilities))
        .build()
        .unwrap()
}

pub fn reporter() -> Reporter {
    Reporter::plain(true)
}

/// Scan every registered type without config filters
pub async fn scan_all(
    registry: &ResourceRegistry,
    project: &Arc<Project>,
) -> Result<Queue, NukeError> {
    scan_with(registry, project, &FilterSet::new(), &FeatureFlags::default()).await
}

pub async fn scan_with(
    registry: &ResourceRegistry,
    project: &Arc<Project>,
    filters: &FilterSet,
    flags: &FeatureFlags,
) -> Result<Queue, NukeError> {
    Scanner::new(registry, Arc::clone(project), filters, flags, reporter())
        .scan(&registry.names())
        .await
}

/// Removal engine without a delay between passes
pub fn engine(max_wait_retries: u32) -> RemovalEngine {
    RemovalEngine::new(max_wait_retries, reporter()).with_pass_delay(Duration::ZERO)
}

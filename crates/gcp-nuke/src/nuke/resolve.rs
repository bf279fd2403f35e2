//! Resource-type resolver
//!
//! Target layers are ordered by priority (run, global config, project). The
//! first non-empty one replaces the registered set; excludes from every layer
//! are removed; a non-empty allow list restricts the rest.

use gcp_nuke_common::Collection;
use tracing::{debug, warn};

pub fn resolve_resource_types(
    registered: &Collection,
    targets: &[&Collection],
    excludes: &[&Collection],
    allow_list: Option<&Collection>,
) -> Collection {
    let mut resolved = match targets.iter().find(|layer| !layer.is_empty()) {
        Some(layer) => {
            for unknown in layer.remove(registered).iter() {
                warn!(resource_type = %unknown, "Target resource type is not registered");
            }
            layer.intersect(registered)
        }
        None => registered.clone(),
    };

    let excluded = excludes
        .iter()
        .fold(Collection::new(), |acc, layer| acc.union(layer));
    resolved = resolved.remove(&excluded);

    if let Some(allow_list) = allow_list.filter(|list| !list.is_empty()) {
        resolved = resolved.intersect(allow_list);
    }

    debug!(count = resolved.len(), "Resolved resource types");
    resolved
}

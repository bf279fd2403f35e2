//! Per-item filtering during the scan

use super::queue::Item;
use crate::config::Filter;
use crate::error::NukeError;
use crate::resource::FilterVerdict;
use gcp_nuke_common::defaults::FILTERED_BY_CONFIG;
use tracing::{debug, warn};

/// Decide whether `item` is excluded from removal, marking it Filtered if so.
///
/// The resource's own check runs first and wins with its message. A failing
/// check is logged and ignored. Config rules are evaluated in order and the
/// first match filters the item.
pub async fn apply_filters(item: &mut Item, filters: &[Filter]) -> Result<(), NukeError> {
    if item.capabilities().dynamic_filter {
        let verdict = item.resource().dynamic_filter().await;
        match verdict {
            Ok(FilterVerdict::Reject(reason)) => {
                item.filter(reason);
                return Ok(());
            }
            Ok(FilterVerdict::Keep) => {}
            Err(e) => {
                warn!(
                    resource_type = %item.resource_type(),
                    identity = %item.identity(),
                    error = ?e,
                    "Resource filter check failed, keeping resource"
                );
            }
        }
    }

    if config_filter_matches(item, filters)? {
        item.filter(FILTERED_BY_CONFIG);
    }
    Ok(())
}

fn config_filter_matches(item: &Item, filters: &[Filter]) -> Result<bool, NukeError> {
    for filter in filters {
        let Some(value) = item.get_property(&filter.property) else {
            warn!(
                resource_type = %item.resource_type(),
                property = %filter.property,
                "Resource type has no value for filter property, skipping rule"
            );
            continue;
        };

        let matched = filter
            .evaluate(&value)
            .map_err(|source| NukeError::InvalidFilter {
                resource_type: item.resource_type().to_string(),
                source,
            })?;

        if matched {
            debug!(
                resource_type = %item.resource_type(),
                property = %filter.property,
                value = %value,
                "Filter matched"
            );
            return Ok(true);
        }
    }
    Ok(false)
}

//! Run-level error taxonomy
//!
//! Per-item removal and liveness errors never surface here; they are recorded
//! on the item and retried. Only configuration problems, scan failures and
//! convergence failures abort a run.

use crate::config::{ConfigError, FilterError};
use std::fmt;
use thiserror::Error;

/// An item that was still failing when the run gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub resource_type: String,
    pub identity: String,
    pub reason: String,
}

impl fmt::Display for FailedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}: {}", self.resource_type, self.identity, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum NukeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listing one resource type failed, so the whole inventory is untrustworthy
    #[error("failed to scan {resource_type}")]
    Scan {
        resource_type: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid filter for {resource_type}")]
    InvalidFilter {
        resource_type: String,
        #[source]
        source: FilterError,
    },

    /// Only failed items were left for consecutive passes
    #[error("there are resources in failed state, but none are ready for deletion, anymore ({} failed after {passes} passes)", failed.len())]
    Stalled { passes: u32, failed: Vec<FailedItem> },

    #[error("max wait retries of {max_wait_retries} exceeded after {passes} passes ({} still waiting)", waiting.len())]
    MaxWaitRetriesExceeded {
        max_wait_retries: u32,
        passes: u32,
        waiting: Vec<FailedItem>,
    },

    #[error("aborted by user")]
    Aborted,
}

impl NukeError {
    /// Items the run gave up on, if this error carries any
    pub fn items(&self) -> &[FailedItem] {
        match self {
            NukeError::Stalled { failed, .. } => failed,
            NukeError::MaxWaitRetriesExceeded { waiting, .. } => waiting,
            _ => &[],
        }
    }

    pub fn is_convergence_failure(&self) -> bool {
        matches!(
            self,
            NukeError::Stalled { .. } | NukeError::MaxWaitRetriesExceeded { .. }
        )
    }
}

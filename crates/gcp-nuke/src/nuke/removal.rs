//! Removal engine
//!
//! Sweeps the queue pass after pass until every item is Filtered or Finished.
//! Each pass triggers removal of new and failed items and checks whether
//! previously removed items are gone, re-listing each resource type at most
//! once per pass. Two passes in a row with nothing but failed items, or too
//! many passes with nothing but waiting items, abort the run.

use super::queue::{Item, ItemState, Queue};
use super::report::{self, Reporter};
use crate::error::{FailedItem, NukeError};
use crate::resource::{FilterVerdict, Resource};
use anyhow::Result;
use gcp_nuke_common::defaults::{MAX_CONSECUTIVE_FAILED_PASSES, PASS_DELAY};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Listings taken during one pass, keyed by project then resource type.
///
/// Only successful listings are kept. Dropped at the end of the pass.
#[derive(Default)]
pub struct ListingCache {
    listings: HashMap<String, HashMap<String, Vec<Box<dyn Resource>>>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The listing for `item`'s project and type, fetched on first request
    pub async fn get_or_list<'c>(&'c mut self, item: &Item) -> Result<&'c [Box<dyn Resource>]> {
        let by_type = self
            .listings
            .entry(item.project().name().to_string())
            .or_default();

        if !by_type.contains_key(item.resource_type()) {
            let listing = item.list().await?;
            debug!(
                project = %item.project().name(),
                resource_type = %item.resource_type(),
                count = listing.len(),
                "Refreshed listing"
            );
            by_type.insert(item.resource_type().to_string(), listing);
        }

        Ok(by_type
            .get(item.resource_type())
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Number of listings taken so far
    pub fn len(&self) -> usize {
        self.listings.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trigger removal: Pending on success, Failed with the error otherwise
pub async fn handle_remove(item: &mut Item) {
    match item.remove().await {
        Ok(()) => item.set_state(ItemState::Pending),
        Err(e) => item.fail(format!("{e:#}")),
    }
}

/// Check whether a removed item is gone.
///
/// An asynchronous delete that reported an error, or a listing that fails,
/// marks the item Failed. An item no longer listed, or listed but now
/// rejected by its own filter or failing that check, is Finished. Otherwise the state is unchanged.
pub async fn handle_wait(item: &mut Item, cache: &mut ListingCache) {
    let caps = item.capabilities();

    if caps.async_operation {
        let operation = item.resource().operation_error(item.project()).await;
        if let Err(e) = operation {
            item.fail(format!("{e:#}"));
            return;
        }
    }

    let listing = match cache.get_or_list(item).await {
        Ok(listing) => listing,
        Err(e) => {
            item.fail(format!("{e:#}"));
            return;
        }
    };

    let Some(live) = listing.iter().find(|r| item.matches_listed(&***r)) else {
        item.set_state(ItemState::Finished);
        return;
    };

    if caps.dynamic_filter {
        let verdict = live.dynamic_filter().await;
        match verdict {
            Ok(FilterVerdict::Keep) => {}
            Ok(FilterVerdict::Reject(reason)) => {
                debug!(
                    resource_type = %item.resource_type(),
                    reason = %reason,
                    "Listed resource is now filtered, treating as removed"
                );
                item.set_state(ItemState::Finished);
            }
            Err(e) => {
                warn!(
                    resource_type = %item.resource_type(),
                    identity = %item.identity(),
                    error = ?e,
                    "Filter check on listed resource failed, treating as removed"
                );
                item.set_state(ItemState::Finished);
            }
        }
    }
}

/// Run one pass over the queue
pub async fn handle_queue(queue: &mut Queue, reporter: &Reporter) {
    let mut cache = ListingCache::new();

    for item in queue.iter_mut() {
        match item.state() {
            ItemState::New => {
                handle_remove(item).await;
            }
            ItemState::Failed => {
                handle_remove(item).await;
                handle_wait(item, &mut cache).await;
            }
            ItemState::Pending => {
                handle_wait(item, &mut cache).await;
                // always observe one more pass as Waiting
                item.set_state(ItemState::Waiting);
            }
            ItemState::Waiting => {
                handle_wait(item, &mut cache).await;
            }
            ItemState::Filtered | ItemState::Finished => continue,
        }
        reporter.item(item);
    }

    debug!(listings = cache.len(), "Pass complete");
    reporter.line("");
    reporter.line(&report::pass_summary(queue));
    reporter.line("");
}

/// Item counts the convergence check looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub new: usize,
    pub pending: usize,
    pub waiting: usize,
    pub failed: usize,
}

impl PassCounts {
    pub fn of(queue: &Queue) -> Self {
        Self {
            new: queue.count(&[ItemState::New]),
            pending: queue.count(&[ItemState::Pending]),
            waiting: queue.count(&[ItemState::Waiting]),
            failed: queue.count(&[ItemState::Failed]),
        }
    }

    pub fn is_done(&self) -> bool {
        self.new + self.pending + self.waiting + self.failed == 0
    }
}

/// What to do after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Done,
    Stalled,
    WaitRetriesExceeded,
}

/// Consecutive-pass counters
#[derive(Debug, Default)]
pub struct Convergence {
    max_wait_retries: u32,
    failed_passes: u32,
    waiting_passes: u32,
}

impl Convergence {
    /// `max_wait_retries` of zero disables the waiting limit
    pub fn new(max_wait_retries: u32) -> Self {
        Self {
            max_wait_retries,
            ..Default::default()
        }
    }

    pub fn observe(&mut self, counts: PassCounts) -> Verdict {
        if counts.is_done() {
            return Verdict::Done;
        }

        if counts.new + counts.pending + counts.waiting == 0 && counts.failed > 0 {
            self.failed_passes += 1;
            if self.failed_passes >= MAX_CONSECUTIVE_FAILED_PASSES {
                return Verdict::Stalled;
            }
        } else {
            self.failed_passes = 0;
        }

        if self.max_wait_retries > 0 && counts.waiting + counts.pending > 0 && counts.new == 0 {
            if self.waiting_passes >= self.max_wait_retries {
                return Verdict::WaitRetriesExceeded;
            }
            self.waiting_passes += 1;
        } else {
            self.waiting_passes = 0;
        }

        Verdict::Continue
    }
}

/// Result of a removal run that converged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub passes: u32,
}

/// Drives the queue to quiescence
#[derive(Debug, Clone)]
pub struct RemovalEngine {
    max_wait_retries: u32,
    pass_delay: Duration,
    reporter: Reporter,
}

impl RemovalEngine {
    pub fn new(max_wait_retries: u32, reporter: Reporter) -> Self {
        Self {
            max_wait_retries,
            pass_delay: PASS_DELAY,
            reporter,
        }
    }

    /// Delay between passes
    pub fn with_pass_delay(mut self, pass_delay: Duration) -> Self {
        self.pass_delay = pass_delay;
        self
    }

    pub async fn run(&self, queue: &mut Queue) -> Result<RemovalOutcome, NukeError> {
        let mut convergence = Convergence::new(self.max_wait_retries);
        let mut passes = 0;

        loop {
            handle_queue(queue, &self.reporter).await;
            passes += 1;

            match convergence.observe(PassCounts::of(queue)) {
                Verdict::Done => {
                    info!(passes, "All resources removed or skipped");
                    return Ok(RemovalOutcome { passes });
                }
                Verdict::Stalled => {
                    let failed = items_in(queue, &[ItemState::Failed]);
                    for item in &failed {
                        error!(
                            resource_type = %item.resource_type,
                            identity = %item.identity,
                            reason = %item.reason,
                            "Resource failed"
                        );
                    }
                    return Err(NukeError::Stalled { passes, failed });
                }
                Verdict::WaitRetriesExceeded => {
                    return Err(NukeError::MaxWaitRetriesExceeded {
                        max_wait_retries: self.max_wait_retries,
                        passes,
                        waiting: items_in(queue, &[ItemState::Waiting, ItemState::Pending]),
                    });
                }
                Verdict::Continue => {}
            }

            if !self.pass_delay.is_zero() {
                tokio::time::sleep(self.pass_delay).await;
            }
        }
    }
}

fn items_in(queue: &Queue, states: &[ItemState]) -> Vec<FailedItem> {
    queue
        .iter()
        .filter(|item| states.contains(&item.state()))
        .map(FailedItem::from)
        .collect()
}

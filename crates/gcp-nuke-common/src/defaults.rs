//! Default run parameters and engine constants
//!
//! Shared by the CLI and the engine so both agree on the same values.

use std::time::Duration;

/// Default wait before continuing when `--force` skips the prompt (seconds)
pub const DEFAULT_FORCE_SLEEP_SECS: u64 = 15;

/// Smallest `--force-sleep` accepted together with `--no-dry-run` (seconds)
pub const MIN_FORCE_SLEEP_SECS: u64 = 3;

/// Default for `--max-wait-retries` (0 disables the limit)
pub const DEFAULT_MAX_WAIT_RETRIES: u32 = 0;

/// Delay between two removal passes
pub const PASS_DELAY: Duration = Duration::from_secs(5);

/// Consecutive passes with only failed items left before the run aborts
pub const MAX_CONSECUTIVE_FAILED_PASSES: u32 = 2;

/// Number of resource types listed concurrently during a scan
pub const SCAN_CONCURRENCY: usize = 8;

/// Reason recorded on items excluded by a config filter
pub const FILTERED_BY_CONFIG: &str = "filtered by config";

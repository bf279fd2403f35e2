//! Nuke run driver
//!
//! Ties the pieces together: resolve the resource types in scope, scan them
//! into a queue, confirm with the operator and drive the removal engine.

pub mod filter;
pub mod queue;
pub mod removal;
pub mod report;
pub mod resolve;
pub mod scan;

pub use queue::{Item, ItemState, Queue};
pub use removal::{RemovalEngine, RemovalOutcome};
pub use report::Reporter;
pub use resolve::resolve_resource_types;
pub use scan::Scanner;

use crate::config::{ConfigError, NukeConfig};
use crate::error::NukeError;
use crate::prompt::{self, Confirm, Confirmation, StdinConfirm};
use crate::resource::{Project, ResourceRegistry};
use gcp_nuke_common::Collection;
use gcp_nuke_common::defaults::{
    DEFAULT_FORCE_SLEEP_SECS, DEFAULT_MAX_WAIT_RETRIES, MIN_FORCE_SLEEP_SECS, PASS_DELAY,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run-level switches, usually from the command line
#[derive(Debug, Clone)]
pub struct NukeParameters {
    /// Run-level target layer
    pub targets: Collection,
    /// Run-level exclude layer
    pub excludes: Collection,
    /// Actually delete resources
    pub no_dry_run: bool,
    /// Skip the confirmation prompts and sleep instead
    pub force: bool,
    pub force_sleep: Duration,
    /// Passes with only waiting items before giving up; 0 disables the limit
    pub max_wait_retries: u32,
    /// Hide filtered items from the report
    pub quiet: bool,
    /// Delay between removal passes
    pub pass_delay: Duration,
}

impl Default for NukeParameters {
    fn default() -> Self {
        Self {
            targets: Collection::new(),
            excludes: Collection::new(),
            no_dry_run: false,
            force: false,
            force_sleep: Duration::from_secs(DEFAULT_FORCE_SLEEP_SECS),
            max_wait_retries: DEFAULT_MAX_WAIT_RETRIES,
            quiet: false,
            pass_delay: PASS_DELAY,
        }
    }
}

impl NukeParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let actual = self.force_sleep.as_secs();
        if self.no_dry_run && actual < MIN_FORCE_SLEEP_SECS {
            return Err(ConfigError::ForceSleepTooShort {
                min: MIN_FORCE_SLEEP_SECS,
                actual,
            });
        }
        Ok(())
    }

    fn confirmation(&self) -> Confirmation {
        if self.force {
            Confirmation::Sleep(self.force_sleep)
        } else {
            Confirmation::Interactive
        }
    }
}

/// What a finished run left behind
#[derive(Debug)]
pub struct RunReport {
    pub queue: Queue,
    /// `None` when nothing was removed (dry run or nothing to delete)
    pub removal: Option<RemovalOutcome>,
}

/// One nuke run against one project
pub struct Nuke {
    parameters: NukeParameters,
    config: NukeConfig,
    registry: Arc<ResourceRegistry>,
    project: Arc<Project>,
    confirm: Box<dyn Confirm>,
    reporter: Reporter,
}

impl Nuke {
    pub fn new(
        parameters: NukeParameters,
        config: NukeConfig,
        registry: Arc<ResourceRegistry>,
        project: Arc<Project>,
    ) -> Self {
        let reporter = Reporter::new(parameters.quiet);
        Self {
            parameters,
            config,
            registry,
            project,
            confirm: Box::new(StdinConfirm),
            reporter,
        }
    }

    pub fn with_confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    /// Resource types in scope for this run
    pub fn resource_types(&self) -> Collection {
        let global = &self.config.resource_types;
        let account = self
            .config
            .project(self.project.name())
            .map(|p| p.resource_types.clone())
            .unwrap_or_default();

        let allow_list = [global, &account]
            .into_iter()
            .map(|layer| &layer.allow_list)
            .find(|list| !list.is_empty());

        resolve_resource_types(
            &self.registry.names(),
            &[&self.parameters.targets, &global.targets, &account.targets],
            &[&self.parameters.excludes, &global.excludes, &account.excludes],
            allow_list,
        )
    }

    /// List and filter every resource in scope
    pub async fn scan(&self) -> Result<Queue, NukeError> {
        let filters = self.config.filters_for(self.project.name())?;
        let resource_types = self.resource_types();

        let scanner = Scanner::new(
            &self.registry,
            Arc::clone(&self.project),
            &filters,
            &self.config.feature_flags,
            self.reporter,
        );
        let queue = scanner.scan(&resource_types).await?;

        self.reporter.line("");
        self.reporter.line(&report::scan_summary(&queue));
        self.reporter.line("");
        Ok(queue)
    }

    /// Remove everything in `queue` that is not filtered
    pub async fn remove(&self, queue: &mut Queue) -> Result<RemovalOutcome, NukeError> {
        RemovalEngine::new(self.parameters.max_wait_retries, self.reporter)
            .with_pass_delay(self.parameters.pass_delay)
            .run(queue)
            .await
    }

    /// Validate, confirm, scan and, unless this is a dry run, remove.
    ///
    /// Cached clients are dropped when the run ends, whatever the outcome.
    pub async fn run(&self) -> Result<RunReport, NukeError> {
        let result = self.run_inner().await;
        self.project.close_clients();
        result
    }

    async fn run_inner(&self) -> Result<RunReport, NukeError> {
        self.parameters.validate()?;
        self.project.credentials().validate()?;
        self.config.validate_project(self.project.name())?;

        let project_id = self.project.name();
        let confirmation = self.parameters.confirmation();

        prompt::prompt(
            self.confirm.as_ref(),
            confirmation,
            &format!(
                "Do you really want to nuke the project with the ID {project_id}?\n\
                 Do you want to continue? Enter project ID to continue."
            ),
            project_id,
        )
        .await?;

        let mut queue = self.scan().await?;

        if queue.count(&[ItemState::New]) == 0 {
            self.reporter.line("No resource to delete.");
            return Ok(RunReport {
                queue,
                removal: None,
            });
        }

        if !self.parameters.no_dry_run {
            self.reporter.line(
                "The above resources would be deleted with the supplied configuration. \
                 Provide --no-dry-run to actually destroy resources.",
            );
            return Ok(RunReport {
                queue,
                removal: None,
            });
        }

        prompt::prompt(
            self.confirm.as_ref(),
            confirmation,
            &format!(
                "Do you really want to nuke these resources on the project with the ID {project_id}?\n\
                 Do you want to continue? Enter project ID to continue."
            ),
            project_id,
        )
        .await?;

        info!(
            project = %project_id,
            items = queue.count(&[ItemState::New]),
            "Removing resources"
        );
        let outcome = self.remove(&mut queue).await?;

        self.reporter.line(&report::final_summary(&queue));
        Ok(RunReport {
            queue,
            removal: Some(outcome),
        })
    }
}

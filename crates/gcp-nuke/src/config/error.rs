//! Configuration errors
//!
//! Everything here is fatal and raised before any resource is listed.

use thiserror::Error;

/// Configuration and setup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the expected schema
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The restricted-project list is empty
    #[error(
        "the config file contains an empty restricted list; for safety reasons you need to \
         specify at least one project ID, which should be your production project"
    )]
    EmptyRestrictedList,

    /// Target project is in the restricted list
    #[error("you are trying to nuke the project '{0}', but it is restricted; aborting")]
    RestrictedProject(String),

    /// Target project has no entry under `projects`
    #[error("your project '{0}' isn't listed in the config; aborting")]
    UnknownProject(String),

    /// A project references a preset that is not defined
    #[error("could not find filter preset '{0}'")]
    MissingPreset(String),

    /// Two adapters registered the same resource-type name
    #[error("a resource type named '{0}' is already registered")]
    DuplicateResourceType(String),

    /// Keyfile passed on the command line does not exist
    #[error("credentials are invalid: key file '{0}' not found")]
    MissingKeyfile(String),

    /// `--force-sleep` too short for a destructive run
    #[error(
        "value for --force-sleep cannot be less than {min} seconds if --no-dry-run is set, got {actual}"
    )]
    ForceSleepTooShort { min: u64, actual: u64 },

    /// No project given to nuke
    #[error("no project given; use --project")]
    MissingProject,
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

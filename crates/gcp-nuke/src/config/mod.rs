//! Nuke configuration
//!
//! Loaded from a YAML file. Holds the restricted-project list, per-project
//! resource-type selections, filters and preset references, the global preset
//! map and the feature flags handed to adapters.

mod error;
pub mod filter;

pub use error::ConfigError;
pub use filter::{Filter, FilterError, FilterSet, FilterType};

use gcp_nuke_common::Collection;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Resource-type selection for one config layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResourceTypes {
    /// Only nuke these types (empty = no restriction from this layer)
    #[serde(default)]
    pub targets: Collection,
    /// Never nuke these types
    #[serde(default)]
    pub excludes: Collection,
    /// Further restrict the resolved set to these types
    #[serde(default)]
    pub allow_list: Collection,
}

/// Per-project settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    /// Regions/zones adapters should scan
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub resource_types: ResourceTypes,
    /// Names of presets merged into `filters`, in order
    #[serde(default)]
    pub presets: Vec<String>,
}

/// Reusable filter fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetDefinition {
    #[serde(default)]
    pub filters: FilterSet,
}

/// Global switches handed to adapters before filtering
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FeatureFlags {
    /// Resource types whose deletion protection may be switched off
    #[serde(default)]
    pub disable_deletion_protection: BTreeMap<String, bool>,
}

impl FeatureFlags {
    pub fn deletion_protection_disabled(&self, resource_type: &str) -> bool {
        self.disable_deletion_protection
            .get(resource_type)
            .copied()
            .unwrap_or(false)
    }
}

/// Top-level nuke configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NukeConfig {
    /// Projects that must never be nuked
    #[serde(default)]
    pub project_restricted_list: Vec<String>,
    #[serde(default)]
    pub projects: HashMap<String, ProjectConfig>,
    /// Global resource-type layer
    #[serde(default)]
    pub resource_types: ResourceTypes,
    #[serde(default)]
    pub presets: HashMap<String, PresetDefinition>,
    #[serde(default)]
    pub feature_flags: FeatureFlags,
}

impl NukeConfig {
    /// Load and strictly parse a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn has_restricted_list(&self) -> bool {
        !self.project_restricted_list.is_empty()
    }

    pub fn in_restricted_list(&self, project_id: &str) -> bool {
        self.project_restricted_list.iter().any(|p| p == project_id)
    }

    /// Check that `project_id` may be nuked with this config.
    ///
    /// Requires a non-empty restricted list that does not contain the project,
    /// and an entry for the project under `projects`.
    pub fn validate_project(&self, project_id: &str) -> Result<(), ConfigError> {
        if !self.has_restricted_list() {
            return Err(ConfigError::EmptyRestrictedList);
        }

        if self.in_restricted_list(project_id) {
            return Err(ConfigError::RestrictedProject(project_id.to_string()));
        }

        if !self.projects.contains_key(project_id) {
            return Err(ConfigError::UnknownProject(project_id.to_string()));
        }

        Ok(())
    }

    pub fn project(&self, project_id: &str) -> Option<&ProjectConfig> {
        self.projects.get(project_id)
    }

    /// Resolve the filters for a project: its own rules first, then each
    /// referenced preset's rules appended in listed order.
    pub fn filters_for(&self, project_id: &str) -> Result<FilterSet, ConfigError> {
        let Some(project) = self.projects.get(project_id) else {
            return Ok(FilterSet::new());
        };

        let mut filters = project.filters.clone();
        for preset_name in &project.presets {
            let preset = self
                .presets
                .get(preset_name)
                .ok_or_else(|| ConfigError::MissingPreset(preset_name.clone()))?;
            filters.merge(&preset.filters);
        }

        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
project-restricted-list:
  - production-project

resource-types:
  targets: [DynamoDBTable, S3Bucket, S3Object]
  excludes: [IAMRole]

projects:
  gcp-test-project:
    locations: [eu-west-1]
    presets: [terraform]
    filters:
      IAMRole:
        - uber.admin
      IAMRolePolicyAttachment:
        - "uber.admin -> AdministratorAccess"
    resource-types:
      targets: [S3Bucket]

presets:
  terraform:
    filters:
      S3Bucket:
        - type: glob
          value: "my-statebucket-*"

feature-flags:
  disable-deletion-protection:
    ComputeInstance: true
"#;

    fn example() -> NukeConfig {
        serde_yaml::from_str(EXAMPLE).unwrap()
    }

    #[test]
    fn test_restricted_list() {
        let mut config = NukeConfig::default();
        assert!(!config.has_restricted_list());
        assert!(!config.in_restricted_list("blubber"));

        config.project_restricted_list.push("bim".to_string());
        assert!(config.has_restricted_list());
        assert!(config.in_restricted_list("bim"));
        assert!(!config.in_restricted_list("baz"));
    }

    #[test]
    fn test_parse_example() {
        let config = example();
        assert_eq!(config.project_restricted_list, vec!["production-project"]);
        assert_eq!(
            config.resource_types.targets,
            Collection::from(vec!["DynamoDBTable", "S3Bucket", "S3Object"])
        );

        let project = config.project("gcp-test-project").unwrap();
        assert_eq!(project.locations, vec!["eu-west-1"]);
        assert_eq!(project.presets, vec!["terraform"]);
        assert_eq!(
            project.filters.get("IAMRole").unwrap(),
            &[Filter::exact("uber.admin")]
        );
        assert!(config.feature_flags.deletion_protection_disabled("ComputeInstance"));
        assert!(!config.feature_flags.deletion_protection_disabled("Bucket"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<NukeConfig, _> = serde_yaml::from_str("accounts: {}");
        assert!(result.is_err());

        let misspelled = r#"
project-restricted-list: [prod]
projects:
  dev:
    filters:
      Bucket:
        - proprety: Name
          value: keep-me
"#;
        let result: Result<NukeConfig, _> = serde_yaml::from_str(misspelled);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_project() {
        let config = NukeConfig {
            project_restricted_list: vec!["prod".to_string()],
            projects: HashMap::from([("dev".to_string(), ProjectConfig::default())]),
            ..Default::default()
        };

        assert!(matches!(
            config.validate_project("prod"),
            Err(ConfigError::RestrictedProject(_))
        ));
        assert!(matches!(
            config.validate_project("staging"),
            Err(ConfigError::UnknownProject(_))
        ));
        assert!(config.validate_project("dev").is_ok());
    }

    #[test]
    fn test_validate_requires_restricted_list() {
        let config = NukeConfig {
            projects: HashMap::from([("dev".to_string(), ProjectConfig::default())]),
            ..Default::default()
        };
        assert!(matches!(
            config.validate_project("dev"),
            Err(ConfigError::EmptyRestrictedList)
        ));
    }

    #[test]
    fn test_filters_merge_presets() {
        let config = example();
        let filters = config.filters_for("gcp-test-project").unwrap();

        assert_eq!(
            filters.get("S3Bucket").unwrap(),
            &[Filter::new(FilterType::Glob, "my-statebucket-*")]
        );
        assert_eq!(
            filters.get("IAMRole").unwrap(),
            &[Filter::exact("uber.admin")]
        );
        assert_eq!(
            filters.get("IAMRolePolicyAttachment").unwrap(),
            &[Filter::exact("uber.admin -> AdministratorAccess")]
        );
    }

    #[test]
    fn test_account_rules_precede_preset_rules() {
        let mut config = example();
        config
            .projects
            .get_mut("gcp-test-project")
            .unwrap()
            .filters
            .push("S3Bucket", Filter::exact("own-bucket"));

        let filters = config.filters_for("gcp-test-project").unwrap();
        let buckets = filters.get("S3Bucket").unwrap();
        assert_eq!(buckets[0], Filter::exact("own-bucket"));
        assert_eq!(buckets[1].filter_type, FilterType::Glob);
    }

    #[test]
    fn test_missing_preset() {
        let mut config = example();
        config.presets.clear();
        assert!(matches!(
            config.filters_for("gcp-test-project"),
            Err(ConfigError::MissingPreset(name)) if name == "terraform"
        ));
    }
}

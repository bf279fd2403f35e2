//! Config filter rules and matchers
//!
//! A [`Filter`] protects matching resources from removal. Filters are grouped
//! per resource type in a [`FilterSet`]; presets are merged into an account's
//! set by concatenation.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while evaluating a filter
#[derive(Debug, Error)]
pub enum FilterError {
    /// Pattern of a `regex` or `glob` filter does not compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Value of a `dateOlderThan` filter is not a duration
    #[error("invalid duration '{value}': {source}")]
    InvalidDuration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    /// Value of a `dateOlderThan` filter does not fit a timestamp offset
    #[error("duration '{0}' is out of range")]
    DurationOutOfRange(String),

    /// Property compared by a `dateOlderThan` filter is not a date
    #[error("cannot parse '{0}' as a date")]
    InvalidDate(String),
}

/// Matcher kinds understood by config filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// String equality
    #[default]
    Exact,
    /// Substring match
    Contains,
    /// Shell-style wildcard (`*`, `?`), anchored at both ends
    Glob,
    /// Regular expression, anchored only if the pattern says so
    Regex,
    /// Protects resources whose timestamp plus the duration lies in the future
    DateOlderThan,
}

/// A single property-match rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FilterDef")]
pub struct Filter {
    /// Property to compare; empty compares the legacy identity string
    pub property: String,
    pub filter_type: FilterType,
    pub value: String,
    /// Negate the match result
    pub invert: bool,
}

/// YAML forms accepted for a filter: a bare string is an exact legacy-identity match
#[derive(Deserialize)]
#[serde(untagged)]
enum FilterDef {
    Exact(String),
    Full(FilterFields),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterFields {
    #[serde(default)]
    property: String,
    #[serde(default, rename = "type")]
    filter_type: FilterType,
    value: String,
    #[serde(default)]
    invert: bool,
}

impl From<FilterDef> for Filter {
    fn from(def: FilterDef) -> Self {
        match def {
            FilterDef::Exact(value) => Filter::exact(value),
            FilterDef::Full(FilterFields {
                property,
                filter_type,
                value,
                invert,
            }) => Filter {
                property,
                filter_type,
                value,
                invert,
            },
        }
    }
}

impl Filter {
    /// Exact match against the legacy identity
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn new(filter_type: FilterType, value: impl Into<String>) -> Self {
        Self {
            filter_type,
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn on_property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Evaluate the matcher, ignoring `invert`
    pub fn matches(&self, value: &str) -> Result<bool, FilterError> {
        self.matches_at(value, Utc::now())
    }

    /// Evaluate the matcher against a fixed clock, ignoring `invert`
    pub fn matches_at(&self, value: &str, now: DateTime<Utc>) -> Result<bool, FilterError> {
        match self.filter_type {
            FilterType::Exact => Ok(value == self.value),
            FilterType::Contains => Ok(value.contains(self.value.as_str())),
            FilterType::Glob => Ok(compile(&glob_to_regex(&self.value))?.is_match(value)),
            FilterType::Regex => Ok(compile(&self.value)?.is_match(value)),
            FilterType::DateOlderThan => {
                if value.is_empty() {
                    return Ok(false);
                }
                let offset = parse_duration(&self.value)?;
                let timestamp = parse_date(value)?;
                Ok(timestamp + offset > now)
            }
        }
    }

    /// Evaluate the matcher and apply `invert`
    pub fn evaluate(&self, value: &str) -> Result<bool, FilterError> {
        Ok(self.matches(value)? != self.invert)
    }
}

fn compile(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn glob_to_regex(pattern: &str) -> String {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    re.push('$');
    re
}

/// Parse a signed duration such as `24h`, `-7d` or `1h 30m`.
fn parse_duration(input: &str) -> Result<TimeDelta, FilterError> {
    let trimmed = input.trim();
    let (negative, magnitude) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let duration =
        humantime::parse_duration(magnitude).map_err(|source| FilterError::InvalidDuration {
            value: input.to_string(),
            source,
        })?;
    let delta = TimeDelta::from_std(duration)
        .map_err(|_| FilterError::DurationOutOfRange(input.to_string()))?;

    Ok(if negative { -delta } else { delta })
}

/// Parse a resource timestamp: Unix seconds, `YYYY-MM-DD`, `YYYY/MM/DD` or RFC 3339.
fn parse_date(input: &str) -> Result<DateTime<Utc>, FilterError> {
    if let Ok(secs) = input.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| FilterError::InvalidDate(input.to_string()));
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Some(midnight) = NaiveDate::parse_from_str(input, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(midnight.and_utc());
        }
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| FilterError::InvalidDate(input.to_string()))
}

/// Filter rules keyed by resource-type name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, Vec<Filter>>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for one resource type, in evaluation order
    pub fn get(&self, resource_type: &str) -> Option<&[Filter]> {
        self.0.get(resource_type).map(Vec::as_slice)
    }

    pub fn push(&mut self, resource_type: impl Into<String>, filter: Filter) {
        self.0.entry(resource_type.into()).or_default().push(filter);
    }

    /// Append every rule of `other` after this set's rules for the same type.
    ///
    /// No de-duplication: merging is plain concatenation per resource type.
    pub fn merge(&mut self, other: &FilterSet) {
        for (resource_type, filters) in &other.0 {
            self.0
                .entry(resource_type.clone())
                .or_default()
                .extend(filters.iter().cloned());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<Filter>)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, Vec<Filter>)>>(iter: I) -> Self {
        FilterSet(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

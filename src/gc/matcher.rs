//! Predicate builders for container selection and exclusion.
//!
//! Prefix matching is exact and case-sensitive. Exclusion patterns use shell
//! glob syntax (`*`, `?`, `[...]`), where `*` also matches `/`.

use crate::config::ArgumentError;
use crate::container::{ContainerSnapshot, ImageSummary};
use glob::Pattern;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Matches subjects starting with any of a set of prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatcher {
    prefixes: Vec<String>,
}

impl PrefixMatcher {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, subject: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| subject.starts_with(prefix.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Selects running containers for the stop-stale-containers tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerMatcher {
    /// Match on the container name
    Name(PrefixMatcher),
    /// Match on the image reference the container was created from
    Image(PrefixMatcher),
}

impl ContainerMatcher {
    /// The field of `container` this matcher looks at.
    pub fn subject<'a>(&self, container: &'a ContainerSnapshot) -> &'a str {
        match self {
            ContainerMatcher::Name(_) => &container.name,
            ContainerMatcher::Image(_) => &container.image,
        }
    }

    pub fn matches(&self, container: &ContainerSnapshot) -> bool {
        let subject = self.subject(container);
        match self {
            ContainerMatcher::Name(prefixes) | ContainerMatcher::Image(prefixes) => {
                prefixes.matches(subject)
            }
        }
    }
}

fn compile(pattern: &str) -> Result<Pattern, ArgumentError> {
    Pattern::new(pattern).map_err(|e| ArgumentError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}

/// A `key[=value]` label exclusion rule.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    key: Pattern,
    value: Option<Pattern>,
}

impl ExclusionRule {
    pub fn new(key: &str, value: Option<&str>) -> Result<Self, ArgumentError> {
        Ok(Self {
            key: compile(key)?,
            value: value.map(compile).transpose()?,
        })
    }

    /// True when some label key matches the key pattern and, if a value
    /// pattern is set, one of those matching labels also has a matching value.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let mut matching = labels.iter().filter(|(key, _)| self.key.matches(key));
        match &self.value {
            None => matching.next().is_some(),
            Some(value) => matching.any(|(_, v)| value.matches(v)),
        }
    }
}

impl FromStr for ExclusionRule {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once('=') {
            Some((key, value)) => (key, Some(value).filter(|v| !v.is_empty())),
            None => (s, None),
        };

        if key.is_empty() {
            return Err(ArgumentError::InvalidLabelRule(s.to_string()));
        }

        ExclusionRule::new(key, value)
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Excludes resources carrying a label matched by any rule.
#[derive(Debug, Clone, Default)]
pub struct LabelMatcher {
    rules: Vec<ExclusionRule>,
}

impl LabelMatcher {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        Self { rules }
    }

    /// Parse `key[=value]` rules in order.
    pub fn parse<I, S>(rules: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|rule| rule.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.rules.iter().any(|rule| rule.matches(labels))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Tag globs protecting images from removal.
#[derive(Debug, Clone, Default)]
pub struct ImageExclusion {
    patterns: Vec<Pattern>,
}

impl ImageExclusion {
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether any tag of `image` matches an exclusion pattern.
    ///
    /// Untagged images are never excluded.
    pub fn excludes(&self, image: &ImageSummary) -> bool {
        image
            .tags()
            .iter()
            .any(|tag| self.patterns.iter().any(|pattern| pattern.matches(tag)))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TMSYNC_CONFIG

use crate::retry::RetryPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use syncscan::ValidatorConfig;
use testdoc::jsdoc::{KNOWN_TAGS, TAG_KNOWN_ISSUE, TAG_OBJECTIVE, TAG_PRECONDITION};
use testdoc::{CaseIdPattern, ParserConfig, TestParser};

pub const DEFAULT_CONFIG_FILE: &str = "tmsync.yaml";

pub const ENV_PROJECT_KEY: &str = "TMSYNC_PROJECT_KEY";
pub const ENV_ENFORCE_ACTION_COMMENTS: &str = "TMSYNC_ENFORCE_ACTION_COMMENTS";
pub const ENV_ENFORCE_VERIFICATION_COMMENTS: &str = "TMSYNC_ENFORCE_VERIFICATION_COMMENTS";
pub const ENV_FILE_PATTERNS: &str = "TMSYNC_FILE_PATTERNS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmsyncConfig {
    #[serde(default = "default_project_key")]
    pub project_key: String,
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub documentation: DocumentationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentationConfig {
    #[serde(default = "default_required_tags")]
    pub required_tags: Vec<String>,
    #[serde(default = "default_optional_tags")]
    pub optional_tags: Vec<String>,
    #[serde(default = "default_true")]
    pub enforce_action_comments: bool,
    #[serde(default = "default_true")]
    pub enforce_verification_comments: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_project_key() -> String {
    testdoc::case_id::DEFAULT_PROJECT_KEY.to_string()
}
fn default_file_patterns() -> Vec<String> {
    vec!["**/*.spec.ts".to_string(), "**/*.test.ts".to_string()]
}
fn default_required_tags() -> Vec<String> {
    vec![TAG_OBJECTIVE.to_string()]
}
fn default_optional_tags() -> Vec<String> {
    vec![TAG_PRECONDITION.to_string(), TAG_KNOWN_ISSUE.to_string()]
}
fn default_true() -> bool {
    true
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for TmsyncConfig {
    fn default() -> Self {
        Self {
            project_key: default_project_key(),
            file_patterns: default_file_patterns(),
            parser: ParserConfig::default(),
            documentation: DocumentationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            required_tags: default_required_tags(),
            optional_tags: default_optional_tags(),
            enforce_action_comments: true,
            enforce_verification_comments: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl TmsyncConfig {
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse tmsync.yaml")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or `tmsync.yaml` in the working directory when no path is
    /// given, then applies environment overrides. An explicit path must exist;
    /// a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_yaml::from_str(&yaml)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    let yaml = std::fs::read_to_string(default_path)
                        .context("Failed to read tmsync.yaml")?;
                    serde_yaml::from_str(&yaml).context("Failed to parse tmsync.yaml")?
                } else {
                    log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides read through `lookup`, which stands in for the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_PROJECT_KEY) {
            self.project_key = key.trim().to_string();
        }
        if let Some(value) = lookup(ENV_ENFORCE_ACTION_COMMENTS) {
            self.documentation.enforce_action_comments =
                parse_bool(&value).with_context(|| format!("Invalid {}", ENV_ENFORCE_ACTION_COMMENTS))?;
        }
        if let Some(value) = lookup(ENV_ENFORCE_VERIFICATION_COMMENTS) {
            self.documentation.enforce_verification_comments = parse_bool(&value)
                .with_context(|| format!("Invalid {}", ENV_ENFORCE_VERIFICATION_COMMENTS))?;
        }
        if let Some(value) = lookup(ENV_FILE_PATTERNS) {
            self.file_patterns = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_key.is_empty()
            || !self
                .project_key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            bail!(
                "project_key {:?} must be non-empty uppercase letters or digits",
                self.project_key
            );
        }

        if self.file_patterns.is_empty() {
            bail!("file_patterns must not be empty");
        }

        let doc = &self.documentation;
        for tag in doc.required_tags.iter().chain(&doc.optional_tags) {
            if !KNOWN_TAGS.contains(&tag.as_str()) {
                bail!(
                    "Unknown documentation tag '{}', expected one of {:?}",
                    tag,
                    KNOWN_TAGS
                );
            }
        }
        if let Some(tag) = doc
            .required_tags
            .iter()
            .find(|t| doc.optional_tags.contains(t))
        {
            bail!("Tag '{}' cannot be both required and optional", tag);
        }

        let markers = [
            ("parser.entry_point", &self.parser.entry_point),
            ("parser.skip_modifier", &self.parser.skip_modifier),
            ("parser.fail_modifier", &self.parser.fail_modifier),
            ("parser.action_marker", &self.parser.action_marker),
            ("parser.verification_marker", &self.parser.verification_marker),
        ];
        for (key, value) in markers {
            if value.trim().is_empty() {
                bail!("{} must not be empty", key);
            }
        }
        if self.parser.action_marker == self.parser.verification_marker {
            bail!("parser.action_marker and parser.verification_marker must differ");
        }

        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            bail!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms,
                self.retry.max_delay_ms
            );
        }
        Ok(())
    }

    pub fn case_ids(&self) -> Result<CaseIdPattern> {
        CaseIdPattern::new(&self.project_key)
            .with_context(|| format!("Invalid project key {}", self.project_key))
    }

    pub fn test_parser(&self) -> Result<TestParser> {
        Ok(TestParser::new(self.parser.clone(), self.case_ids()?))
    }

    pub fn validator_config(&self) -> Result<ValidatorConfig> {
        let doc = &self.documentation;
        Ok(ValidatorConfig {
            required_tags: doc.required_tags.iter().cloned().collect::<BTreeSet<_>>(),
            optional_tags: doc.optional_tags.iter().cloned().collect::<BTreeSet<_>>(),
            enforce_action_comments: doc.enforce_action_comments,
            enforce_verification_comments: doc.enforce_verification_comments,
            case_ids: self.case_ids()?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            timeout: Duration::from_millis(self.retry.timeout_ms),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = TmsyncConfig::parse("{}").unwrap();
        assert_eq!(config, TmsyncConfig::default());
        assert_eq!(config.project_key, "MM");
        assert_eq!(config.parser.action_marker, "# ");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let yaml = r#"
project_key: PROJ
documentation:
  enforce_verification_comments: false
parser:
  entry_point: it
"#;
        let config = TmsyncConfig::parse(yaml).unwrap();
        assert_eq!(config.project_key, "PROJ");
        assert!(!config.documentation.enforce_verification_comments);
        assert!(config.documentation.enforce_action_comments);
        assert_eq!(config.documentation.required_tags, vec!["objective"]);
        assert_eq!(config.parser.entry_point, "it");
        assert_eq!(config.parser.skip_modifier, "skip");

        let rules = config.validator_config().unwrap();
        assert_eq!(rules.case_ids.project_key(), "PROJ");
        assert!(!rules.enforce_verification_comments);
    }

    #[test]
    fn test_rejects_bad_values() {
        for yaml in [
            "project_key: mm",
            "project_key: ''",
            "project_key: M-M",
            "documentation: { required_tags: [author] }",
            "documentation: { required_tags: [objective], optional_tags: [objective] }",
            "parser: { action_marker: '' }",
            "parser: { action_marker: '* ' }",
            "retry: { max_attempts: 0 }",
            "retry: { base_delay_ms: 5000, max_delay_ms: 100 }",
            "file_patterns: []",
        ] {
            assert!(TmsyncConfig::parse(yaml).is_err(), "accepted: {}", yaml);
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_PROJECT_KEY, " QA "),
            (ENV_ENFORCE_ACTION_COMMENTS, "false"),
            (ENV_FILE_PATTERNS, "e2e/**/*.spec.ts, ,smoke/*.ts"),
        ]);
        let mut config = TmsyncConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.project_key, "QA");
        assert!(!config.documentation.enforce_action_comments);
        assert!(config.documentation.enforce_verification_comments);
        assert_eq!(config.file_patterns, vec!["e2e/**/*.spec.ts", "smoke/*.ts"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_rejects_non_boolean() {
        let mut config = TmsyncConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_ENFORCE_VERIFICATION_COMMENTS).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_ENFORCE_VERIFICATION_COMMENTS));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "retry:\n  max_attempts: 5\n  timeout_ms: 100\n").unwrap();
        let config = TmsyncConfig::load(Some(&path)).unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.timeout, Duration::from_millis(100));
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TmsyncConfig::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}

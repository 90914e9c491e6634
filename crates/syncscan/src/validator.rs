// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: DOC_VALIDATOR

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use testdoc::jsdoc::{KNOWN_TAGS, TAG_KNOWN_ISSUE, TAG_OBJECTIVE, TAG_PRECONDITION};
use testdoc::{CaseIdPattern, StructuredTest, TestKind};

const MIN_TITLE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    Documentation,
    ActionSteps,
    VerificationSteps,
    CaseId,
    Title,
    Syntax,
}

impl AsRef<str> for IssueCategory {
    fn as_ref(&self) -> &str {
        match self {
            IssueCategory::Documentation => "documentation",
            IssueCategory::ActionSteps => "action-steps",
            IssueCategory::VerificationSteps => "verification-steps",
            IssueCategory::CaseId => "case-id",
            IssueCategory::Title => "title",
            IssueCategory::Syntax => "syntax",
        }
    }
}

/// A single documentation problem found on a test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    /// Machine-readable identifier, e.g. `MISSING_OBJECTIVE`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl ValidationIssue {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Resolved documentation rules.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub required_tags: BTreeSet<String>,
    pub optional_tags: BTreeSet<String>,
    pub enforce_action_comments: bool,
    pub enforce_verification_comments: bool,
    pub case_ids: CaseIdPattern,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            required_tags: BTreeSet::from([TAG_OBJECTIVE.to_string()]),
            optional_tags: BTreeSet::from([
                TAG_PRECONDITION.to_string(),
                TAG_KNOWN_ISSUE.to_string(),
            ]),
            enforce_action_comments: true,
            enforce_verification_comments: true,
            case_ids: CaseIdPattern::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Runs every documentation rule against `test`; issues accumulate.
pub fn validate(test: &StructuredTest, config: &ValidatorConfig) -> ValidationOutcome {
    let mut issues = Vec::new();
    let line = Some(test.declaration_line);
    let issue = |severity, category, code: &str, message: String, fix: &str| ValidationIssue {
        severity,
        category,
        code: code.to_string(),
        message,
        suggested_fix: Some(fix.to_string()),
        source_line: line,
    };

    for tag in &config.required_tags {
        if test.tags.has(tag) {
            continue;
        }
        if tag == TAG_OBJECTIVE {
            issues.push(issue(
                Severity::Error,
                IssueCategory::Documentation,
                "MISSING_OBJECTIVE",
                "Test is missing an @objective tag".to_string(),
                "Add a JSDoc block with `@objective <what the test verifies>`",
            ));
        } else {
            issues.push(issue(
                Severity::Error,
                IssueCategory::Documentation,
                "MISSING_REQUIRED_TAG",
                format!("Test is missing the required @{} tag", tag),
                "Add the tag to the file's JSDoc block",
            ));
        }
    }

    for tag in KNOWN_TAGS {
        if test.tags.has(tag)
            && !config.required_tags.contains(tag)
            && !config.optional_tags.contains(tag)
        {
            issues.push(issue(
                Severity::Info,
                IssueCategory::Documentation,
                "UNEXPECTED_TAG",
                format!(
                    "Test uses @{}, which is neither required nor optional in the documentation config",
                    tag
                ),
                "Add the tag to optional_tags or remove it",
            ));
        }
    }

    if config.enforce_action_comments && test.action_steps.is_empty() {
        issues.push(issue(
            Severity::Error,
            IssueCategory::ActionSteps,
            "MISSING_ACTION_STEPS",
            "Test has no action step comments".to_string(),
            "Describe each user action with a `// # ...` comment",
        ));
    }

    if config.enforce_verification_comments && test.verification_steps.is_empty() {
        issues.push(issue(
            Severity::Error,
            IssueCategory::VerificationSteps,
            "MISSING_VERIFICATION_STEPS",
            "Test has no verification step comments".to_string(),
            "Describe each expected outcome with a `// * ...` comment",
        ));
    }

    match &test.case_id {
        None => issues.push(issue(
            Severity::Warning,
            IssueCategory::CaseId,
            "MISSING_CASE_ID",
            "Test title does not start with a test case ID".to_string(),
            &format!(
                "Prefix the title with `{}-T<number>: `",
                config.case_ids.project_key()
            ),
        )),
        Some(id) if !config.case_ids.is_well_formed(id) => issues.push(issue(
            Severity::Error,
            IssueCategory::CaseId,
            "INVALID_CASE_ID_FORMAT",
            format!(
                "Test case ID {} does not match {}-T<number>",
                id,
                config.case_ids.project_key()
            ),
            &format!("Use the form `{}-T123`", config.case_ids.project_key()),
        )),
        Some(_) => {}
    }

    let bare_title = config.case_ids.strip_prefix(&test.title);
    if bare_title.chars().count() < MIN_TITLE_LEN {
        issues.push(issue(
            Severity::Warning,
            IssueCategory::Title,
            "TITLE_TOO_SHORT",
            format!(
                "Test title \"{}\" is shorter than {} characters",
                bare_title, MIN_TITLE_LEN
            ),
            "Describe the scenario in the title",
        ));
    }

    if let Some(known) = &test.tags.known_issue {
        issues.push(issue(
            Severity::Info,
            IssueCategory::Documentation,
            "KNOWN_ISSUE",
            format!("Test has a known issue: {}", known),
            "Remove @known_issue once the issue is resolved",
        ));
    }

    if test.kind != TestKind::Normal {
        issues.push(issue(
            Severity::Info,
            IssueCategory::Syntax,
            "NON_RUNNING_TEST",
            format!("Test is declared as {}", test.kind.as_ref()),
            "Re-enable the test once it is stable",
        ));
    }

    let passed = !issues.iter().any(|i| i.is_error());
    ValidationOutcome { passed, issues }
}

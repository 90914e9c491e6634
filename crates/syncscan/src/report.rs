// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: DOC_VALIDATOR

use crate::error::{ErrorKind, SyncError};
use crate::scanner::percentage;
use crate::validator::{IssueCategory, Severity, ValidationIssue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_PROBLEM_FILES: usize = 5;

/// Title used for the entry standing in for a file that could not be read.
pub const UNREADABLE_FILE_TITLE: &str = "(file could not be read)";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestValidationResult {
    pub file_path: String,
    pub test_title: String,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl TestValidationResult {
    pub fn new(
        file_path: impl Into<String>,
        test_title: impl Into<String>,
        issues: Vec<ValidationIssue>,
    ) -> Self {
        let count = |s: Severity| issues.iter().filter(|i| i.severity == s).count();
        let error_count = count(Severity::Error);
        let warning_count = count(Severity::Warning);
        let info_count = count(Severity::Info);
        Self {
            file_path: file_path.into(),
            test_title: test_title.into(),
            passed: error_count == 0,
            issues,
            error_count,
            warning_count,
            info_count,
        }
    }

    pub fn file_failure(file_path: impl Into<String>, err: &SyncError) -> Self {
        let source_line = match &err.kind {
            ErrorKind::Parse { line, .. } => *line,
            _ => None,
        };
        let issue = ValidationIssue {
            severity: Severity::Error,
            category: IssueCategory::Syntax,
            code: err.code().to_string(),
            message: err.to_string(),
            suggested_fix: Some("Make sure the file exists and is UTF-8 text".to_string()),
            source_line,
        };
        Self::new(file_path, UNREADABLE_FILE_TITLE, vec![issue])
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemFile {
    pub file_path: String,
    pub error_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_info: usize,
    pub pass_rate: u8,
    pub common_issue_category: Option<IssueCategory>,
    /// Files with the most errors, at most five.
    pub problem_files: Vec<ProblemFile>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub test_results: Vec<TestValidationResult>,
    pub summary: ValidationSummary,
    pub validated_at: DateTime<Utc>,
    /// Wall-clock milliseconds.
    pub duration: u64,
}

impl ValidationReport {
    pub fn build(
        test_results: Vec<TestValidationResult>,
        validated_at: DateTime<Utc>,
        duration: u64,
    ) -> Self {
        let total_tests = test_results.len();
        let passed_tests = test_results.iter().filter(|r| r.passed).count();

        let mut categories: BTreeMap<IssueCategory, usize> = BTreeMap::new();
        let mut errors_by_file: BTreeMap<&str, usize> = BTreeMap::new();
        for result in &test_results {
            for issue in &result.issues {
                *categories.entry(issue.category).or_default() += 1;
            }
            if result.error_count > 0 {
                *errors_by_file.entry(result.file_path.as_str()).or_default() += result.error_count;
            }
        }

        // Ties go to the category declared first.
        let common_issue_category = categories
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(category, _)| category);

        let mut problem_files: Vec<ProblemFile> = errors_by_file
            .into_iter()
            .map(|(path, error_count)| ProblemFile {
                file_path: path.to_string(),
                error_count,
            })
            .collect();
        problem_files.sort_by(|a, b| {
            b.error_count
                .cmp(&a.error_count)
                .then(a.file_path.cmp(&b.file_path))
        });
        problem_files.truncate(MAX_PROBLEM_FILES);

        let summary = ValidationSummary {
            total_errors: test_results.iter().map(|r| r.error_count).sum(),
            total_warnings: test_results.iter().map(|r| r.warning_count).sum(),
            total_info: test_results.iter().map(|r| r.info_count).sum(),
            pass_rate: percentage(passed_tests, total_tests),
            common_issue_category,
            problem_files,
        };

        Self {
            total_tests,
            passed_tests,
            failed_tests: total_tests - passed_tests,
            test_results,
            summary,
            validated_at,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity, category: IssueCategory) -> ValidationIssue {
        ValidationIssue {
            severity,
            category,
            code: "X".to_string(),
            message: "x".to_string(),
            suggested_fix: None,
            source_line: None,
        }
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::build(Vec::new(), Utc::now(), 0);
        assert_eq!(report.total_tests, 0);
        assert_eq!(report.summary.pass_rate, 0);
        assert_eq!(report.summary.common_issue_category, None);
        assert!(report.summary.problem_files.is_empty());
    }

    #[test]
    fn test_summary_counts_and_rankings() {
        let mut results = vec![
            TestValidationResult::new("a.spec.ts", "t1", vec![]),
            TestValidationResult::new(
                "b.spec.ts",
                "t2",
                vec![
                    issue(Severity::Error, IssueCategory::ActionSteps),
                    issue(Severity::Warning, IssueCategory::CaseId),
                ],
            ),
            TestValidationResult::new(
                "c.spec.ts",
                "t3",
                vec![
                    issue(Severity::Error, IssueCategory::ActionSteps),
                    issue(Severity::Error, IssueCategory::Documentation),
                    issue(Severity::Info, IssueCategory::Documentation),
                ],
            ),
        ];
        for i in 0..5 {
            results.push(TestValidationResult::new(
                format!("z{}.spec.ts", i),
                "t",
                vec![issue(Severity::Error, IssueCategory::Title)],
            ));
        }

        let report = ValidationReport::build(results, Utc::now(), 12);
        assert_eq!(report.total_tests, 8);
        assert_eq!(report.passed_tests, 1);
        assert_eq!(report.failed_tests, 7);
        assert_eq!(report.summary.total_errors, 8);
        assert_eq!(report.summary.total_warnings, 1);
        assert_eq!(report.summary.total_info, 1);
        assert_eq!(report.summary.pass_rate, 13);
        assert_eq!(
            report.summary.common_issue_category,
            Some(IssueCategory::Title)
        );

        let files: Vec<&str> = report
            .summary
            .problem_files
            .iter()
            .map(|p| p.file_path.as_str())
            .collect();
        assert_eq!(
            files,
            vec!["c.spec.ts", "b.spec.ts", "z0.spec.ts", "z1.spec.ts", "z2.spec.ts"]
        );
    }

    #[test]
    fn test_category_tie_prefers_declaration_order() {
        let results = vec![TestValidationResult::new(
            "a.spec.ts",
            "t",
            vec![
                issue(Severity::Warning, IssueCategory::Title),
                issue(Severity::Warning, IssueCategory::CaseId),
            ],
        )];
        let report = ValidationReport::build(results, Utc::now(), 0);
        assert_eq!(
            report.summary.common_issue_category,
            Some(IssueCategory::CaseId)
        );
    }

    #[test]
    fn test_file_failure_entry() {
        let err = SyncError::new(
            ErrorKind::Parse {
                file_path: "bad.spec.ts".to_string(),
                line: Some(4),
            },
            "bad.spec.ts:4: syntax error",
        );
        let result = TestValidationResult::file_failure("bad.spec.ts", &err);
        assert!(!result.passed);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.issues[0].category, IssueCategory::Syntax);
        assert_eq!(result.issues[0].source_line, Some(4));
    }
}

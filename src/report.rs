// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TMSYNC_CLI

use serde::Serialize;
use syncscan::{ScanResult, ValidationReport, fingerprint};
use testdoc::StructuredTest;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Human-readable scan report; files without issues are left out of the detail section.
pub fn render_scan(result: &ScanResult) -> String {
    let s = &result.summary;
    let mut out = String::new();
    out.push_str(&format!("{}\nSYNC SCAN\n{}\n", RULE, RULE));
    out.push_str(&format!("Files:             {}\n", s.total_files));
    out.push_str(&format!("Tests:             {}\n", s.total_tests));
    out.push_str(&format!("Synced:            {}\n", s.synced_tests));
    out.push_str(&format!("Unmapped:          {}\n", s.unmapped_tests));
    out.push_str(&format!("Out of sync:       {}\n", s.out_of_sync_tests));
    out.push_str(&format!("Validation errors: {}\n", s.validation_errors));
    out.push_str(&format!(
        "Sync coverage:     {}%\nDoc compliance:    {}%\n",
        result.metrics.sync_coverage, result.metrics.documentation_compliance
    ));

    for file in result.file_results.iter().filter(|f| !f.issues.is_empty()) {
        out.push_str(&format!("\n{}\n", file.file_path));
        for issue in &file.issues {
            let title = if issue.test_title.is_empty() {
                "(file)"
            } else {
                issue.test_title.as_str()
            };
            out.push_str(&format!(
                "  - [{}] {}: {}\n",
                status_label(issue.sync_status),
                title,
                issue.message
            ));
        }
    }
    out.push_str(&format!("\nScanned in {}ms\n", result.duration));
    out
}

fn status_label(status: syncscan::ReportedStatus) -> &'static str {
    match status {
        syncscan::ReportedStatus::Synced => "SYNCED",
        syncscan::ReportedStatus::Unmapped => "UNMAPPED",
        syncscan::ReportedStatus::OutOfSync => "OUT OF SYNC",
        syncscan::ReportedStatus::ValidationError => "INVALID",
    }
}

pub fn render_validation(report: &ValidationReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str(&format!("{}\nDOCUMENTATION VALIDATION\n{}\n", RULE, RULE));
    out.push_str(&format!(
        "Tests: {} ({} passed, {} failed, {}% pass rate)\n",
        report.total_tests, report.passed_tests, report.failed_tests, s.pass_rate
    ));
    out.push_str(&format!(
        "Issues: {} errors, {} warnings, {} info\n",
        s.total_errors, s.total_warnings, s.total_info
    ));
    if let Some(category) = s.common_issue_category {
        out.push_str(&format!("Most common issue: {}\n", category.as_ref()));
    }
    if !s.problem_files.is_empty() {
        out.push_str("Problem files:\n");
        for file in &s.problem_files {
            out.push_str(&format!("  - {} ({} errors)\n", file.file_path, file.error_count));
        }
    }

    for result in report.test_results.iter().filter(|r| !r.issues.is_empty()) {
        let verdict = if result.passed { "PASS" } else { "FAIL" };
        out.push_str(&format!(
            "\n{}: {} > {}\n",
            verdict, result.file_path, result.test_title
        ));
        for issue in &result.issues {
            let line = issue
                .source_line
                .map(|l| format!(":{}", l))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {:<7} {}{} {}\n",
                severity_label(issue.severity),
                issue.code,
                line,
                issue.message
            ));
            if let Some(fix) = &issue.suggested_fix {
                out.push_str(&format!("          fix: {}\n", fix));
            }
        }
    }
    out
}

fn severity_label(severity: syncscan::Severity) -> &'static str {
    match severity {
        syncscan::Severity::Error => "ERROR",
        syncscan::Severity::Warning => "WARN",
        syncscan::Severity::Info => "INFO",
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestDigest {
    pub title: String,
    pub case_id: Option<String>,
    pub digest: String,
}

impl TestDigest {
    pub fn of(test: &StructuredTest) -> Self {
        Self {
            title: test.title.clone(),
            case_id: test.case_id.clone(),
            digest: fingerprint(test),
        }
    }
}

/// One line per test: digest, then title.
pub fn render_digests(digests: &[TestDigest]) -> String {
    digests
        .iter()
        .map(|d| format!("{}  {}\n", d.digest, d.title))
        .collect()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: SYNC_SCANNER

use crate::classify::{SyncState, classify};
use crate::error::SyncError;
use crate::fingerprint::fingerprint;
use crate::mapping::{JsonMappingStore, MappingStore, find_by_case_id};
use crate::report::{TestValidationResult, ValidationReport};
use crate::validator::{ValidationOutcome, ValidatorConfig, validate};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use testdoc::{StructuredTest, TestParser};

pub const MSG_UNMAPPED: &str = "Test is not mapped to a TMS test case";
pub const MSG_OUT_OF_SYNC: &str = "Test content has changed since last sync";

/// Category a test is reported under. `Unsynced` splits into
/// `ValidationError` and `Unmapped` depending on its validation outcome.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportedStatus {
    Synced,
    Unmapped,
    OutOfSync,
    ValidationError,
}

impl ReportedStatus {
    pub fn from_state(state: SyncState, validation: &ValidationOutcome) -> Self {
        match state {
            SyncState::Synced => ReportedStatus::Synced,
            SyncState::NeedsUpdate => ReportedStatus::OutOfSync,
            _ if !validation.passed => ReportedStatus::ValidationError,
            _ => ReportedStatus::Unmapped,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanIssue {
    pub test_title: String,
    pub sync_status: ReportedStatus,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileScanResult {
    pub file_path: String,
    pub test_count: usize,
    pub synced_count: usize,
    pub unmapped_count: usize,
    pub out_of_sync_count: usize,
    pub validation_error_count: usize,
    pub issues: Vec<ScanIssue>,
}

impl FileScanResult {
    /// Stand-in result for a file whose source or mappings could not be read.
    pub fn failed(file_path: impl Into<String>, err: &SyncError) -> Self {
        Self {
            file_path: file_path.into(),
            validation_error_count: 1,
            issues: vec![ScanIssue {
                test_title: String::new(),
                sync_status: ReportedStatus::ValidationError,
                message: format!("Failed to scan file: {}", err.render()),
            }],
            ..Default::default()
        }
    }

    fn record(&mut self, test: &StructuredTest, status: ReportedStatus, validation: &ValidationOutcome) {
        self.test_count += 1;
        let message = match status {
            ReportedStatus::Synced => {
                self.synced_count += 1;
                return;
            }
            ReportedStatus::Unmapped => {
                self.unmapped_count += 1;
                MSG_UNMAPPED.to_string()
            }
            ReportedStatus::OutOfSync => {
                self.out_of_sync_count += 1;
                MSG_OUT_OF_SYNC.to_string()
            }
            ReportedStatus::ValidationError => {
                self.validation_error_count += 1;
                validation
                    .errors()
                    .map(|i| i.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        };
        self.issues.push(ScanIssue {
            test_title: test.title.clone(),
            sync_status: status,
            message,
        });
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub total_files: usize,
    pub total_tests: usize,
    pub synced_tests: usize,
    pub unmapped_tests: usize,
    pub out_of_sync_tests: usize,
    pub validation_errors: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetrics {
    /// Share of tests that are mapped at all, current or not.
    pub sync_coverage: u8,
    pub documentation_compliance: u8,
}

impl ScanMetrics {
    pub fn from_summary(summary: &ScanSummary) -> Self {
        let total = summary.total_tests;
        Self {
            sync_coverage: percentage(summary.synced_tests + summary.out_of_sync_tests, total),
            documentation_compliance: percentage(
                total.saturating_sub(summary.validation_errors),
                total,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub summary: ScanSummary,
    pub metrics: ScanMetrics,
    pub file_results: Vec<FileScanResult>,
    pub scanned_at: DateTime<Utc>,
    /// Wall-clock milliseconds.
    pub duration: u64,
}

impl ScanResult {
    pub fn from_files(file_results: Vec<FileScanResult>, scanned_at: DateTime<Utc>, duration: u64) -> Self {
        let mut summary = ScanSummary {
            total_files: file_results.len(),
            ..Default::default()
        };
        for file in &file_results {
            summary.total_tests += file.test_count;
            summary.synced_tests += file.synced_count;
            summary.unmapped_tests += file.unmapped_count;
            summary.out_of_sync_tests += file.out_of_sync_count;
            summary.validation_errors += file.validation_error_count;
        }
        Self {
            metrics: ScanMetrics::from_summary(&summary),
            summary,
            file_results,
            scanned_at,
            duration,
        }
    }
}

/// Rounded integer share of `part` in `total`, 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * part as f64 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

pub struct Scanner<S = JsonMappingStore> {
    parser: TestParser,
    rules: ValidatorConfig,
    store: S,
}

impl Scanner<JsonMappingStore> {
    pub fn with_json_store(parser: TestParser, rules: ValidatorConfig) -> Self {
        Self::new(parser, rules, JsonMappingStore::new())
    }
}

impl<S: MappingStore> Scanner<S> {
    pub fn new(parser: TestParser, rules: ValidatorConfig, store: S) -> Self {
        Self {
            parser,
            rules,
            store,
        }
    }

    /// Files under `root` matching any of `patterns`, honoring gitignore, sorted.
    pub fn discover(&self, root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            anyhow::bail!("Scan root {} is not a directory", root.display());
        }
        let mut overrides = OverrideBuilder::new(root);
        for pattern in patterns {
            overrides
                .add(pattern)
                .with_context(|| format!("Invalid file pattern: {}", pattern))?;
        }
        let overrides = overrides.build().context("Failed to build file patterns")?;

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            .build();

        let mut files = Vec::new();
        for result in walker {
            match result {
                Ok(entry) => {
                    if entry.file_type().is_some_and(|ft| ft.is_file()) {
                        files.push(entry.into_path());
                    }
                }
                Err(err) => log::warn!("Walk error: {}", err),
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn scan_file(&self, path: &Path) -> Result<FileScanResult, SyncError> {
        let tests = self.parser.parse_file(path)?;
        let mappings = self.store.load(path)?;

        let mut result = FileScanResult {
            file_path: path.to_string_lossy().to_string(),
            ..Default::default()
        };
        for test in &tests {
            let digest = fingerprint(test);
            let validation = validate(test, &self.rules);
            let mapping = test
                .case_id
                .as_deref()
                .and_then(|id| find_by_case_id(&mappings, id));
            let state = classify(test, &validation, mapping, &digest);
            result.record(test, ReportedStatus::from_state(state, &validation), &validation);
        }
        Ok(result)
    }

    pub fn scan_directory(&self, root: &Path, patterns: &[String]) -> Result<ScanResult> {
        let started = Instant::now();
        let scanned_at = Utc::now();
        let files = self.discover(root, patterns)?;
        log::debug!("Scanning {} files under {}", files.len(), root.display());

        let mut file_results = Vec::with_capacity(files.len());
        for path in &files {
            let rel_path = relative_path(root, path);
            let mut result = match self.scan_file(path) {
                Ok(result) => result,
                Err(err) => {
                    log::warn!("Skipping {}: {}", rel_path, err.render());
                    FileScanResult::failed(rel_path.clone(), &err)
                }
            };
            result.file_path = rel_path;
            file_results.push(result);
        }

        let result = ScanResult::from_files(
            file_results,
            scanned_at,
            started.elapsed().as_millis() as u64,
        );
        log::info!(
            "Scanned {} tests in {} files: {} synced, {} unmapped, {} out of sync, {} validation errors",
            result.summary.total_tests,
            result.summary.total_files,
            result.summary.synced_tests,
            result.summary.unmapped_tests,
            result.summary.out_of_sync_tests,
            result.summary.validation_errors
        );
        Ok(result)
    }

    pub fn validate_file(&self, path: &Path) -> Result<Vec<TestValidationResult>, SyncError> {
        let tests = self.parser.parse_file(path)?;
        let file_path = path.to_string_lossy().to_string();
        Ok(tests
            .iter()
            .map(|test| {
                let outcome = validate(test, &self.rules);
                TestValidationResult::new(file_path.clone(), test.title.clone(), outcome.issues)
            })
            .collect())
    }

    pub fn validate_directory(&self, root: &Path, patterns: &[String]) -> Result<ValidationReport> {
        let started = Instant::now();
        let validated_at = Utc::now();
        let files = self.discover(root, patterns)?;

        let mut results = Vec::new();
        for path in &files {
            let rel_path = relative_path(root, path);
            match self.validate_file(path) {
                Ok(file_results) => results.extend(file_results.into_iter().map(|mut r| {
                    r.file_path = rel_path.clone();
                    r
                })),
                Err(err) => {
                    log::warn!("Skipping {}: {}", rel_path, err.render());
                    results.push(TestValidationResult::file_failure(rel_path, &err));
                }
            }
        }

        let report = ValidationReport::build(results, validated_at, started.elapsed().as_millis() as u64);
        log::info!(
            "Validated {} tests: {} passed, {} failed",
            report.total_tests,
            report.passed_tests,
            report.failed_tests
        );
        Ok(report)
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(7, 3), 100);
    }

    #[test]
    fn test_metrics_from_summary() {
        let summary = ScanSummary {
            total_files: 2,
            total_tests: 8,
            synced_tests: 3,
            unmapped_tests: 2,
            out_of_sync_tests: 1,
            validation_errors: 2,
        };
        let metrics = ScanMetrics::from_summary(&summary);
        assert_eq!(metrics.sync_coverage, 50);
        assert_eq!(metrics.documentation_compliance, 75);

        let empty = ScanMetrics::from_summary(&ScanSummary::default());
        assert_eq!(empty, ScanMetrics::default());
    }

    #[test]
    fn test_failed_file_result() {
        let err = SyncError::timeout(10);
        let result = FileScanResult::failed("a.spec.ts", &err);
        assert_eq!(result.test_count, 0);
        assert_eq!(result.validation_error_count, 1);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].message.starts_with("Failed to scan file: [TIMEOUT]"));
    }

    #[test]
    fn test_compliance_never_negative() {
        let files = vec![
            FileScanResult::failed("a.spec.ts", &SyncError::timeout(1)),
            FileScanResult::failed("b.spec.ts", &SyncError::timeout(1)),
            FileScanResult {
                file_path: "c.spec.ts".to_string(),
                test_count: 1,
                synced_count: 1,
                ..Default::default()
            },
        ];
        let result = ScanResult::from_files(files, Utc::now(), 0);
        assert_eq!(result.summary.validation_errors, 2);
        assert_eq!(result.metrics.documentation_compliance, 0);
        assert_eq!(result.metrics.sync_coverage, 100);
    }
}

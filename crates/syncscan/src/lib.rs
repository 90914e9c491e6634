// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: SYNC_SCANNER

pub mod classify;
pub mod error;
pub mod fingerprint;
pub mod mapping;
pub mod report;
pub mod scanner;
pub mod validator;

pub use classify::{SyncState, classify, classify_test};
pub use error::{ErrorKind, FsOperation, SyncError};
pub use fingerprint::{ChangeReport, detect_changes, fingerprint, has_changed};
pub use mapping::{JsonMappingStore, MappingError, MappingRecord, MappingStore};
pub use report::{TestValidationResult, ValidationReport, ValidationSummary};
pub use scanner::{FileScanResult, ReportedStatus, ScanResult, Scanner};
pub use validator::{IssueCategory, Severity, ValidationIssue, ValidatorConfig, validate};

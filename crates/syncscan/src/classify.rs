// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: SYNC_CLASSIFIER

use crate::mapping::MappingRecord;
use crate::validator::{ValidationOutcome, ValidatorConfig, validate};
use serde::{Deserialize, Serialize};
use testdoc::StructuredTest;

/// Relationship between a local test and its remote test case.
///
/// Only `Synced`, `Unsynced` and `NeedsUpdate` are derived locally;
/// `Conflict` and `Orphaned` are written by the remote sync workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Synced,
    Unsynced,
    NeedsUpdate,
    Conflict,
    Orphaned,
}

impl AsRef<str> for SyncState {
    fn as_ref(&self) -> &str {
        match self {
            SyncState::Synced => "synced",
            SyncState::Unsynced => "unsynced",
            SyncState::NeedsUpdate => "needs_update",
            SyncState::Conflict => "conflict",
            SyncState::Orphaned => "orphaned",
        }
    }
}

/// Classifies a test from its validation outcome, its mapping record (looked
/// up by case ID) and the digest of its current content. First match wins:
/// failing documentation, then a missing mapping, then a digest mismatch.
pub fn classify(
    test: &StructuredTest,
    validation: &ValidationOutcome,
    mapping: Option<&MappingRecord>,
    current_digest: &str,
) -> SyncState {
    if !validation.passed {
        return SyncState::Unsynced;
    }
    let Some(case_id) = test.case_id.as_deref() else {
        return SyncState::Unsynced;
    };
    let Some(mapping) = mapping.filter(|m| m.case_id.as_deref() == Some(case_id)) else {
        return SyncState::Unsynced;
    };
    if mapping.last_digest.as_deref() != Some(current_digest) {
        return SyncState::NeedsUpdate;
    }
    SyncState::Synced
}

/// Validates `test` against `config`, then classifies it.
pub fn classify_test(
    test: &StructuredTest,
    mapping: Option<&MappingRecord>,
    current_digest: &str,
    config: &ValidatorConfig,
) -> SyncState {
    classify(test, &validate(test, config), mapping, current_digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use chrono::Utc;
    use testdoc::{CaseIdPattern, Step};

    fn documented(title: &str) -> StructuredTest {
        let mut t = StructuredTest::new("a.spec.ts", title, 1);
        t.case_id = CaseIdPattern::default().extract(title);
        t.tags.objective = Some("Verify it".to_string());
        t.action_steps.push(Step::new("Act", 2));
        t.verification_steps.push(Step::new("Check", 3));
        t
    }

    fn mapped(test: &StructuredTest, digest: &str) -> MappingRecord {
        let mut m = MappingRecord::new(&test.file_id, &test.title, test.case_id.clone(), "ci");
        m.mark_synced(digest, Utc::now());
        m
    }

    fn run(test: &StructuredTest, mapping: Option<&MappingRecord>, digest: &str) -> SyncState {
        let outcome = validate(test, &ValidatorConfig::default());
        classify(test, &outcome, mapping, digest)
    }

    #[test]
    fn test_synced_when_digest_matches() {
        let t = documented("MM-T10: Everything is in sync");
        let digest = fingerprint(&t);
        let m = mapped(&t, &digest);
        assert_eq!(run(&t, Some(&m), &digest), SyncState::Synced);
    }

    #[test]
    fn test_needs_update_when_digest_differs() {
        let t = documented("MM-T11: Content changed since sync");
        let m = mapped(&t, &"0".repeat(64));
        let digest = fingerprint(&t);
        let outcome = validate(&t, &ValidatorConfig::default());
        assert_eq!(outcome.errors().count(), 0);
        assert_eq!(classify(&t, &outcome, Some(&m), &digest), SyncState::NeedsUpdate);
    }

    #[test]
    fn test_mapping_without_digest_needs_update() {
        let t = documented("MM-T12: Mapped but never synced");
        let m = MappingRecord::new(&t.file_id, &t.title, t.case_id.clone(), "ci");
        assert_eq!(run(&t, Some(&m), &fingerprint(&t)), SyncState::NeedsUpdate);
    }

    #[test]
    fn test_unsynced_without_case_id_even_with_mapping() {
        let t = documented("No case id in this title");
        let digest = fingerprint(&t);
        let m = mapped(&t, &digest);
        assert_eq!(run(&t, None, &digest), SyncState::Unsynced);
        assert_eq!(run(&t, Some(&m), &digest), SyncState::Unsynced);
    }

    #[test]
    fn test_unsynced_without_matching_mapping() {
        let t = documented("MM-T13: Mapping belongs to another case");
        let digest = fingerprint(&t);
        let other = documented("MM-T14: Some other test case");
        let m = mapped(&other, &digest);
        assert_eq!(run(&t, Some(&m), &digest), SyncState::Unsynced);
        assert_eq!(run(&t, None, &digest), SyncState::Unsynced);
    }

    #[test]
    fn test_validation_errors_override_matching_digest() {
        let mut t = documented("MM-T15: Missing the objective tag");
        t.tags.objective = None;
        let digest = fingerprint(&t);
        let m = mapped(&t, &digest);
        assert_eq!(run(&t, Some(&m), &digest), SyncState::Unsynced);
    }

    #[test]
    fn test_classify_test_runs_validation() {
        let mut t = documented("MM-T17: Verification comments missing");
        t.verification_steps.clear();
        let digest = fingerprint(&t);
        let m = mapped(&t, &digest);
        let strict = ValidatorConfig::default();
        assert_eq!(classify_test(&t, Some(&m), &digest, &strict), SyncState::Unsynced);
        let relaxed = ValidatorConfig {
            enforce_verification_comments: false,
            ..Default::default()
        };
        assert_eq!(classify_test(&t, Some(&m), &digest, &relaxed), SyncState::Synced);
    }

    #[test]
    fn test_warnings_do_not_block_sync() {
        let t = documented("MM-T16: Short");
        let digest = fingerprint(&t);
        let m = mapped(&t, &digest);
        assert_eq!(run(&t, Some(&m), &digest), SyncState::Synced);
    }
}

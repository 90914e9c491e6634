// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: CHANGE_DETECTOR

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use testdoc::{Step, StructuredTest};

/// Bumped whenever the canonical form changes; digests of different versions never compare equal.
pub const CANONICAL_VERSION: &str = "v2";

/// Marker reported in [`ChangeReport::changed_fields`]. Only the digest of the
/// previous content is stored, so the changed field itself cannot be named.
pub const CHANGED_CONTENT: &str = "content";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    pub changed: bool,
    pub changed_fields: Vec<String>,
}

/// The exact string that is hashed for `test`: compact JSON with sorted keys.
///
/// Leaf texts are trimmed but not collapsed, steps are ordered by source
/// line, preconditions keep their source order and absent sections are
/// left out entirely. JSON string escaping keeps any leaf text from
/// bleeding into a neighbouring section or item.
pub fn canonical_form(test: &StructuredTest) -> String {
    let mut map = Map::new();
    map.insert("version".to_string(), Value::from(CANONICAL_VERSION));

    if let Some(objective) = &test.tags.objective {
        map.insert("objective".to_string(), Value::from(objective.trim()));
    }
    if !test.tags.preconditions.is_empty() {
        let items: Vec<Value> = test
            .tags
            .preconditions
            .iter()
            .map(|p| Value::from(p.trim()))
            .collect();
        map.insert("preconditions".to_string(), Value::Array(items));
    }
    if !test.action_steps.is_empty() {
        map.insert("actions".to_string(), steps_section(&test.action_steps));
    }
    if !test.verification_steps.is_empty() {
        map.insert(
            "verifications".to_string(),
            steps_section(&test.verification_steps),
        );
    }
    if let Some(known) = &test.tags.known_issue {
        map.insert("known_issue".to_string(), Value::from(known.trim()));
    }

    sort_keys(&mut map);
    Value::Object(map).to_string()
}

fn steps_section(steps: &[Step]) -> Value {
    let mut ordered: Vec<(usize, &str)> = steps
        .iter()
        .map(|s| (s.source_line, s.text.trim()))
        .collect();
    ordered.sort();
    Value::Array(ordered.into_iter().map(|(_, text)| Value::from(text)).collect())
}

// A no-op with the default BTreeMap backing; keeps the order fixed if
// `preserve_order` is ever enabled somewhere in the dependency graph.
fn sort_keys(map: &mut Map<String, Value>) {
    let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    *map = entries.into_iter().collect();
}

/// SHA-256 of the canonical form, as 64 lowercase hex characters.
pub fn fingerprint(test: &StructuredTest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(test).as_bytes());
    hex::encode(hasher.finalize())
}

pub fn has_changed(test: &StructuredTest, prior_digest: &str) -> bool {
    fingerprint(test) != prior_digest
}

pub fn detect_changes(test: &StructuredTest, prior_digest: &str) -> ChangeReport {
    let changed = has_changed(test, prior_digest);
    ChangeReport {
        changed,
        changed_fields: if changed {
            vec![CHANGED_CONTENT.to_string()]
        } else {
            Vec::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructuredTest {
        let mut t = StructuredTest::new("a.spec.ts", "MM-T1: Sample test title", 3);
        t.tags.objective = Some("Verify the sample".to_string());
        t.tags.preconditions = vec!["First".to_string(), "Second".to_string()];
        t.action_steps = vec![Step::new("Open the page", 4), Step::new("Click save", 6)];
        t.verification_steps = vec![Step::new("Saved banner shows", 7)];
        t
    }

    #[test]
    fn test_digest_shape() {
        let digest = fingerprint(&sample());
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(digest, fingerprint(&sample()));
    }

    #[test]
    fn test_outer_whitespace_is_ignored() {
        let mut padded = sample();
        padded.action_steps[0].text = "   Open the page\t".to_string();
        padded.tags.objective = Some("  Verify the sample ".to_string());
        assert_eq!(fingerprint(&padded), fingerprint(&sample()));
    }

    #[test]
    fn test_interior_whitespace_is_significant() {
        let mut spaced = sample();
        spaced.action_steps[0].text = "Open  the page".to_string();
        assert_ne!(fingerprint(&spaced), fingerprint(&sample()));
    }

    #[test]
    fn test_in_memory_step_order_is_normalized_by_line() {
        let mut shuffled = sample();
        shuffled.action_steps.reverse();
        assert_eq!(fingerprint(&shuffled), fingerprint(&sample()));
    }

    #[test]
    fn test_moving_steps_between_lines_changes_digest() {
        let mut moved = sample();
        moved.action_steps[0].source_line = 10;
        assert_ne!(fingerprint(&moved), fingerprint(&sample()));
    }

    #[test]
    fn test_precondition_order_is_significant() {
        let mut swapped = sample();
        swapped.tags.preconditions.reverse();
        assert_ne!(fingerprint(&swapped), fingerprint(&sample()));
    }

    #[test]
    fn test_sections_are_omitted_not_blank() {
        let base = sample();
        let mut with_issue = sample();
        with_issue.tags.known_issue = Some(String::new());
        assert_ne!(fingerprint(&with_issue), fingerprint(&base));
        assert!(!canonical_form(&base).contains("known_issue"));
    }

    #[test]
    fn test_canonical_form_is_versioned_json() {
        let form = canonical_form(&sample());
        let parsed: Value = serde_json::from_str(&form).unwrap();
        assert_eq!(parsed["version"], "v2");
        assert_eq!(parsed["preconditions"], serde_json::json!(["First", "Second"]));
        assert_eq!(
            parsed["actions"],
            serde_json::json!(["Open the page", "Click save"])
        );
        assert!(form.starts_with("{\"actions\":"));
    }

    #[test]
    fn test_control_characters_in_text_do_not_collide() {
        let mut joined = sample();
        joined.tags.preconditions = vec!["a\u{1f}b".to_string()];
        let mut split = sample();
        split.tags.preconditions = vec!["a".to_string(), "b".to_string()];
        assert_ne!(fingerprint(&joined), fingerprint(&split));

        let mut smuggled = sample();
        smuggled.action_steps.clear();
        smuggled.tags.objective = Some("Verify\u{1e}actions:Open the page".to_string());
        let mut honest = sample();
        honest.action_steps = vec![Step::new("Open the page", 4)];
        honest.tags.objective = Some("Verify".to_string());
        assert_ne!(fingerprint(&smuggled), fingerprint(&honest));
    }

    #[test]
    fn test_item_boundaries_are_significant() {
        let mut one = sample();
        one.tags.preconditions = vec!["First, Second".to_string()];
        let mut two = sample();
        two.tags.preconditions = vec!["First".to_string(), "Second".to_string()];
        assert_ne!(fingerprint(&one), fingerprint(&two));
    }

    #[test]
    fn test_step_kind_is_part_of_the_form() {
        let mut t = sample();
        let moved = t.verification_steps.pop().unwrap();
        t.action_steps.push(moved);
        assert_ne!(fingerprint(&t), fingerprint(&sample()));
    }

    #[test]
    fn test_native_tags_do_not_affect_digest() {
        let mut t = sample();
        t.tags.native_tags.push("@smoke".to_string());
        assert_eq!(fingerprint(&t), fingerprint(&sample()));
    }

    #[test]
    fn test_detect_changes_reports_generic_marker() {
        let t = sample();
        let digest = fingerprint(&t);
        assert!(!has_changed(&t, &digest));
        assert_eq!(
            detect_changes(&t, &digest),
            ChangeReport {
                changed: false,
                changed_fields: vec![]
            }
        );

        let mut edited = sample();
        edited.verification_steps[0].text = "Saved toast shows".to_string();
        let report = detect_changes(&edited, &digest);
        assert!(report.changed);
        assert_eq!(report.changed_fields, vec!["content".to_string()]);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TEST_DOC_PARSER

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How the test was declared: `test(...)`, `test.skip(...)` or `test.fail(...)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    #[default]
    Normal,
    Skipped,
    ExpectedFailure,
}

impl AsRef<str> for TestKind {
    fn as_ref(&self) -> &str {
        match self {
            TestKind::Normal => "normal",
            TestKind::Skipped => "skipped",
            TestKind::ExpectedFailure => "expected_failure",
        }
    }
}

/// A single annotated comment inside a test body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub text: String,
    /// 1-based line of the comment in the source file.
    pub source_line: usize,
}

impl Step {
    pub fn new(text: impl Into<String>, source_line: usize) -> Self {
        Self {
            text: text.into(),
            source_line,
        }
    }
}

/// Metadata taken from the file's JSDoc block and the test's `{ tag: [...] }` details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocumentationTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    /// Always a list internally; rendered as a bare string when it holds one entry.
    #[serde(
        default,
        serialize_with = "scalar_or_list",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub preconditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub native_tags: Vec<String>,
}

impl DocumentationTags {
    /// Whether a documentation tag (by its JSDoc name) carries a value.
    pub fn has(&self, tag: &str) -> bool {
        match tag {
            crate::jsdoc::TAG_OBJECTIVE => self.objective.is_some(),
            crate::jsdoc::TAG_PRECONDITION => !self.preconditions.is_empty(),
            crate::jsdoc::TAG_KNOWN_ISSUE => self.known_issue.is_some(),
            _ => false,
        }
    }
}

/// One recognized test declaration with everything extracted from its comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredTest {
    pub file_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default)]
    pub kind: TestKind,
    #[serde(default)]
    pub tags: DocumentationTags,
    #[serde(default)]
    pub action_steps: Vec<Step>,
    #[serde(default)]
    pub verification_steps: Vec<Step>,
    pub declaration_line: usize,
}

impl StructuredTest {
    pub fn new(file_id: impl Into<String>, title: impl Into<String>, declaration_line: usize) -> Self {
        Self {
            file_id: file_id.into(),
            title: title.into(),
            case_id: None,
            kind: TestKind::Normal,
            tags: DocumentationTags::default(),
            action_steps: Vec::new(),
            verification_steps: Vec::new(),
            declaration_line,
        }
    }
}

fn scalar_or_list<S: Serializer>(items: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    match items {
        [single] => serializer.serialize_str(single),
        _ => items.serialize(serializer),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

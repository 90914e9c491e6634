// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TEST_DOC_PARSER

pub const TAG_OBJECTIVE: &str = "objective";
pub const TAG_PRECONDITION: &str = "precondition";
pub const TAG_KNOWN_ISSUE: &str = "known_issue";

/// Documentation tags understood by the parser and the validator.
pub const KNOWN_TAGS: [&str; 3] = [TAG_OBJECTIVE, TAG_PRECONDITION, TAG_KNOWN_ISSUE];

/// Values pulled out of a `/** ... */` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsDoc {
    pub objective: Option<String>,
    pub preconditions: Vec<String>,
    pub known_issue: Option<String>,
}

/// Extracts tag values from the body of a JSDoc block.
///
/// Accepts either the raw comment (`/** ... */`) or the text between the
/// delimiters. Each tag's value is its first line plus every continuation line
/// up to the next tag, with leading `*` and surrounding whitespace stripped and
/// the pieces joined by single spaces. `@objective` and `@known_issue` keep the
/// first occurrence; every `@precondition` becomes its own entry.
pub fn parse_block(text: &str) -> JsDoc {
    let body = text.trim();
    let body = body.strip_prefix("/*").unwrap_or(body);
    let body = body.strip_suffix("*/").unwrap_or(body);

    let mut entries: Vec<(String, Vec<String>)> = Vec::new();
    for line in body.lines() {
        let clean = line.trim().trim_start_matches('*').trim();
        if let Some(tagged) = clean.strip_prefix('@') {
            let (name, rest) = match tagged.find(char::is_whitespace) {
                Some(idx) => (&tagged[..idx], tagged[idx..].trim()),
                None => (tagged, ""),
            };
            let mut parts = Vec::new();
            if !rest.is_empty() {
                parts.push(rest.to_string());
            }
            entries.push((name.to_string(), parts));
        } else if !clean.is_empty() {
            // Free text before the first tag is the block's description.
            if let Some((_, parts)) = entries.last_mut() {
                parts.push(clean.to_string());
            }
        }
    }

    let mut doc = JsDoc::default();
    for (name, parts) in entries {
        let value = parts.join(" ");
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            TAG_OBJECTIVE if doc.objective.is_none() => doc.objective = Some(value),
            TAG_PRECONDITION => doc.preconditions.push(value),
            TAG_KNOWN_ISSUE if doc.known_issue.is_none() => doc.known_issue = Some(value),
            _ => {}
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_continuation_lines() {
        let doc = parse_block(
            "*\n * @objective Verify that a user\n *   can log in\n *\n * @known_issue MM-1234\n ",
        );
        assert_eq!(
            doc.objective.as_deref(),
            Some("Verify that a user can log in")
        );
        assert_eq!(doc.known_issue.as_deref(), Some("MM-1234"));
        assert!(doc.preconditions.is_empty());
    }

    #[test]
    fn test_repeated_preconditions_keep_source_order() {
        let doc = parse_block(
            "/**\n * @precondition\n * A team exists\n * @precondition Two users\n *   are members\n */",
        );
        assert_eq!(
            doc.preconditions,
            vec!["A team exists".to_string(), "Two users are members".to_string()]
        );
    }

    #[test]
    fn test_description_and_unknown_tags_are_ignored() {
        let doc = parse_block("*\n * Some description\n * @param foo bar\n * @objective Check it\n");
        assert_eq!(doc.objective.as_deref(), Some("Check it"));
    }

    #[test]
    fn test_interior_whitespace_is_kept() {
        let doc = parse_block("* @objective Keep   this spacing");
        assert_eq!(doc.objective.as_deref(), Some("Keep   this spacing"));
    }

    #[test]
    fn test_empty_tag_is_absent() {
        let doc = parse_block("*\n * @objective\n * @precondition\n");
        assert_eq!(doc, JsDoc::default());
    }
}

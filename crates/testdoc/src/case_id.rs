// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TEST_DOC_PARSER

use regex::Regex;

pub const DEFAULT_PROJECT_KEY: &str = "MM";

/// Matchers for `{KEY}-T<digits>` case identifiers of one project.
#[derive(Debug, Clone)]
pub struct CaseIdPattern {
    project_key: String,
    title_prefix: Regex,
    exact: Regex,
}

impl CaseIdPattern {
    pub fn new(project_key: &str) -> Result<Self, regex::Error> {
        let key = regex::escape(project_key);
        Ok(Self {
            project_key: project_key.to_string(),
            title_prefix: Regex::new(&format!(r"^({key}-T\d+):"))?,
            exact: Regex::new(&format!(r"^{key}-T\d+$"))?,
        })
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Case ID declared at the very start of a title, e.g. `MM-T123: ...`.
    pub fn extract(&self, title: &str) -> Option<String> {
        self.title_prefix
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn is_well_formed(&self, case_id: &str) -> bool {
        self.exact.is_match(case_id)
    }

    /// The title with any leading `{KEY}-T<digits>:` prefix removed and trimmed.
    pub fn strip_prefix<'a>(&self, title: &'a str) -> &'a str {
        match self.title_prefix.find(title) {
            Some(m) => title[m.end()..].trim(),
            None => title.trim(),
        }
    }
}

impl Default for CaseIdPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_KEY).expect("default project key is a valid pattern")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_case_id() {
        let p = CaseIdPattern::new("MM").unwrap();
        assert_eq!(
            p.extract("MM-T12345: User can log in"),
            Some("MM-T12345".to_string())
        );
    }

    #[test]
    fn test_foreign_project_key_is_not_extracted() {
        let p = CaseIdPattern::new("MM").unwrap();
        assert_eq!(p.extract("PROJ-T123: Something happens"), None);
        assert_eq!(p.extract("Login MM-T1: not anchored"), None);
        assert_eq!(p.extract("MM-T12 missing colon"), None);
    }

    #[test]
    fn test_strip_prefix() {
        let p = CaseIdPattern::new("MM").unwrap();
        assert_eq!(p.strip_prefix("MM-T1: short"), "short");
        assert_eq!(p.strip_prefix("no prefix here"), "no prefix here");
    }

    #[test]
    fn test_key_is_escaped() {
        let p = CaseIdPattern::new("A.B").unwrap();
        assert!(p.is_well_formed("A.B-T1"));
        assert!(!p.is_well_formed("AxB-T1"));
    }
}

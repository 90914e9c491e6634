// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TEST_DOC_PARSER

pub mod case_id;
pub mod jsdoc;
pub mod model;
pub mod parser;
mod recover;

pub use case_id::CaseIdPattern;
pub use model::{DocumentationTags, Step, StructuredTest, TestKind};
pub use parser::{ParseError, ParserConfig, TestParser};

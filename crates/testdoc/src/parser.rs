// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TEST_DOC_PARSER

use crate::case_id::{CaseIdPattern, DEFAULT_PROJECT_KEY};
use crate::jsdoc::{self, JsDoc};
use crate::recover;
use crate::model::{DocumentationTags, Step, StructuredTest, TestKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use swc_common::comments::{Comment, CommentKind, SingleThreadedComments};
use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, Globals, SourceMap, Span, Spanned};
use swc_ecma_ast::{
    BlockStmt, BlockStmtOrExpr, CallExpr, Callee, Expr, ExprOrSpread, Lit, MemberProp, Prop,
    PropName, PropOrSpread,
};
use swc_ecma_parser::{Parser, StringInput, Syntax, lexer::Lexer};
use swc_ecma_visit::{Visit, VisitWith};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid project key {key:?}: {source}")]
    ProjectKey {
        key: String,
        #[source]
        source: regex::Error,
    },
}

impl ParseError {
    pub fn path(&self) -> Option<&str> {
        match self {
            ParseError::Read { path, .. } => Some(path),
            ParseError::ProjectKey { .. } => None,
        }
    }
}

/// Names and markers that identify documented tests in a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParserConfig {
    /// Identifier of the framework's test function, e.g. `test`.
    pub entry_point: String,
    pub skip_modifier: String,
    pub fail_modifier: String,
    /// Prefix of a line comment describing a user action.
    pub action_marker: String,
    /// Prefix of a line comment describing an expected outcome.
    pub verification_marker: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            entry_point: "test".to_string(),
            skip_modifier: "skip".to_string(),
            fail_modifier: "fail".to_string(),
            action_marker: "# ".to_string(),
            verification_marker: "* ".to_string(),
        }
    }
}

/// Recognized shapes of a call expression's callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallShape {
    /// `test(...)`
    Plain,
    /// `test.skip(...)` / `test.fail(...)`
    Modified(TestKind),
    Unrecognized,
}

/// Fatal syntax error of one parse attempt.
#[derive(Debug)]
struct SyntaxFailure {
    line: usize,
    message: String,
}

/// A test call found in the syntax tree, before comments are attached.
#[derive(Debug)]
struct Declaration {
    title: String,
    kind: TestKind,
    native_tags: Vec<String>,
    call: Span,
    body: Span,
}

pub struct TestParser {
    config: ParserConfig,
    case_ids: CaseIdPattern,
}

impl Default for TestParser {
    fn default() -> Self {
        Self::new(ParserConfig::default(), CaseIdPattern::default())
    }
}

impl TestParser {
    pub fn new(config: ParserConfig, case_ids: CaseIdPattern) -> Self {
        Self { config, case_ids }
    }

    pub fn with_project_key(project_key: &str) -> Result<Self, ParseError> {
        let case_ids = CaseIdPattern::new(project_key).map_err(|source| ParseError::ProjectKey {
            key: project_key.to_string(),
            source,
        })?;
        Ok(Self::new(ParserConfig::default(), case_ids))
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn case_ids(&self) -> &CaseIdPattern {
        &self.case_ids
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<StructuredTest>, ParseError> {
        let path = path.as_ref();
        let file_id = path.to_string_lossy().to_string();
        let source = fs::read_to_string(path).map_err(|source| ParseError::Read {
            path: file_id.clone(),
            source,
        })?;
        self.parse_source(&source, &file_id)
    }

    /// Returns every documented test declared in `source`, in declaration order.
    ///
    /// Never fails on malformed source: when no syntax tree can be built, open
    /// constructs at the end are closed, and if that is not enough the source is
    /// cut before the offending line until it parses.
    pub fn parse_source(
        &self,
        source: &str,
        file_id: &str,
    ) -> Result<Vec<StructuredTest>, ParseError> {
        let globals = Globals::new();
        Ok(swc_common::GLOBALS.set(&globals, || self.parse_best_effort(source, file_id)))
    }

    fn parse_best_effort(&self, source: &str, file_id: &str) -> Vec<StructuredTest> {
        let mut prefix = source;
        let mut closed = false;
        loop {
            let attempt = if closed {
                recover::close_open_constructs(prefix)
            } else {
                prefix.to_string()
            };
            let failure = match self.try_parse(&attempt, file_id) {
                Ok(tests) => return tests,
                Err(failure) => failure,
            };
            log::warn!(
                "{}:{}: syntax error: {}; recovering",
                file_id,
                failure.line,
                failure.message
            );
            if !closed {
                closed = true;
            } else if prefix.is_empty() {
                return Vec::new();
            } else {
                prefix = recover::truncate_before_line(prefix, failure.line);
            }
        }
    }

    fn try_parse(
        &self,
        source: &str,
        file_id: &str,
    ) -> Result<Vec<StructuredTest>, SyntaxFailure> {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            FileName::Custom(file_id.to_string()).into(),
            source.to_string(),
        );
        let comments = SingleThreadedComments::default();

        let module = {
            let lexer = Lexer::new(
                Syntax::Typescript(Default::default()),
                Default::default(),
                StringInput::from(&*fm),
                Some(&comments),
            );
            let mut parser = Parser::new_from(lexer);
            let module = parser.parse_module().map_err(|e| SyntaxFailure {
                line: cm.lookup_char_pos(e.span().lo).line,
                message: format!("{:?}", e.kind()),
            })?;
            for recovered in parser.take_errors() {
                log::debug!(
                    "{}:{}: recovered from syntax error: {:?}",
                    file_id,
                    cm.lookup_char_pos(recovered.span().lo).line,
                    recovered.kind()
                );
            }
            module
        };

        let mut collector = TestCollector {
            parser: self,
            found: Vec::new(),
        };
        module.visit_with(&mut collector);
        if collector.found.is_empty() {
            return Ok(Vec::new());
        }

        let all_comments = distinct_comments(comments);
        let doc = all_comments
            .iter()
            .find(|c| c.kind == CommentKind::Block && c.text.starts_with('*'))
            .map(|c| jsdoc::parse_block(&c.text))
            .unwrap_or_default();
        let line_of = |pos: BytePos| cm.lookup_char_pos(pos).line;

        let tests = collector
            .found
            .into_iter()
            .map(|decl| self.build_test(decl, file_id, &doc, &all_comments, &line_of))
            .collect();
        Ok(tests)
    }

    fn build_test(
        &self,
        decl: Declaration,
        file_id: &str,
        doc: &JsDoc,
        comments: &[Comment],
        line_of: &dyn Fn(BytePos) -> usize,
    ) -> StructuredTest {
        let mut action_steps = Vec::new();
        let mut verification_steps = Vec::new();

        for comment in comments {
            if comment.kind != CommentKind::Line
                || comment.span.lo < decl.body.lo
                || comment.span.hi > decl.body.hi
            {
                continue;
            }
            let text = comment.text.trim();
            if let Some(rest) = text.strip_prefix(self.config.action_marker.as_str()) {
                action_steps.push(Step::new(rest.trim(), line_of(comment.span.lo)));
            } else if let Some(rest) = text.strip_prefix(self.config.verification_marker.as_str())
            {
                verification_steps.push(Step::new(rest.trim(), line_of(comment.span.lo)));
            }
        }

        StructuredTest {
            file_id: file_id.to_string(),
            case_id: self.case_ids.extract(&decl.title),
            title: decl.title,
            kind: decl.kind,
            tags: DocumentationTags {
                objective: doc.objective.clone(),
                preconditions: doc.preconditions.clone(),
                known_issue: doc.known_issue.clone(),
                native_tags: decl.native_tags,
            },
            action_steps,
            verification_steps,
            declaration_line: line_of(decl.call.lo),
        }
    }

    fn call_shape(&self, callee: &Callee) -> CallShape {
        let Callee::Expr(expr) = callee else {
            return CallShape::Unrecognized;
        };
        let entry = self.config.entry_point.as_str();
        match &**expr {
            Expr::Ident(ident) if &*ident.sym == entry => CallShape::Plain,
            Expr::Member(member) => match (&*member.obj, &member.prop) {
                (Expr::Ident(obj), MemberProp::Ident(prop)) if &*obj.sym == entry => {
                    let modifier: &str = &prop.sym;
                    if modifier == self.config.skip_modifier {
                        CallShape::Modified(TestKind::Skipped)
                    } else if modifier == self.config.fail_modifier {
                        CallShape::Modified(TestKind::ExpectedFailure)
                    } else {
                        CallShape::Unrecognized
                    }
                }
                _ => CallShape::Unrecognized,
            },
            _ => CallShape::Unrecognized,
        }
    }

    fn recognize(&self, call: &CallExpr) -> Option<Declaration> {
        let kind = match self.call_shape(&call.callee) {
            CallShape::Plain => TestKind::Normal,
            CallShape::Modified(kind) => kind,
            CallShape::Unrecognized => return None,
        };

        if call.args.len() < 2 {
            return None;
        }
        let title = string_literal(plain_arg(&call.args[0])?)?;

        let second = plain_arg(&call.args[1])?;
        let (native_tags, body_expr) = if is_function(second) {
            (Vec::new(), second)
        } else {
            (native_tags(second), plain_arg(call.args.get(2)?)?)
        };
        let body = block_body(body_expr)?;

        Some(Declaration {
            title,
            kind,
            native_tags,
            call: call.span,
            body: body.span,
        })
    }
}

struct TestCollector<'a> {
    parser: &'a TestParser,
    found: Vec<Declaration>,
}

impl Visit for TestCollector<'_> {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Some(decl) = self.parser.recognize(call) {
            self.found.push(decl);
        }
        call.visit_children_with(self);
    }
}

/// Every comment in the file exactly once, ordered by source offset.
fn distinct_comments(comments: SingleThreadedComments) -> Vec<Comment> {
    let (leading, trailing) = comments.take_all();
    let mut all: Vec<Comment> = Vec::new();
    for map in [&leading, &trailing] {
        for list in map.borrow().values() {
            all.extend(list.iter().cloned());
        }
    }
    all.sort_by_key(|c| c.span.lo);
    all.dedup_by_key(|c| c.span.lo);
    all
}

fn plain_arg(arg: &ExprOrSpread) -> Option<&Expr> {
    match arg.spread {
        Some(_) => None,
        None => Some(&*arg.expr),
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        _ => None,
    }
}

fn is_function(expr: &Expr) -> bool {
    match expr {
        Expr::Arrow(_) | Expr::Fn(_) => true,
        Expr::Paren(paren) => is_function(&paren.expr),
        _ => false,
    }
}

fn block_body(expr: &Expr) -> Option<&BlockStmt> {
    match expr {
        Expr::Arrow(arrow) => match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(block) => Some(block),
            BlockStmtOrExpr::Expr(_) => None,
        },
        Expr::Fn(func) => func.function.body.as_ref(),
        Expr::Paren(paren) => block_body(&paren.expr),
        _ => None,
    }
}

/// String entries of a `{ tag: [...] }` details object; anything else yields none.
fn native_tags(expr: &Expr) -> Vec<String> {
    let Expr::Object(object) = expr else {
        return Vec::new();
    };
    let mut tags = Vec::new();
    for prop in &object.props {
        let PropOrSpread::Prop(prop) = prop else {
            continue;
        };
        let Prop::KeyValue(kv) = &**prop else {
            continue;
        };
        let key: &str = match &kv.key {
            PropName::Ident(ident) => &ident.sym,
            PropName::Str(s) => &s.value,
            _ => continue,
        };
        if key != "tag" {
            continue;
        }
        if let Expr::Array(array) = &*kv.value {
            tags.extend(
                array
                    .elems
                    .iter()
                    .flatten()
                    .filter_map(|elem| plain_arg(elem).and_then(string_literal)),
            );
        }
    }
    tags
}

/// Parses with the default markers and project key.
pub fn parse(source: &str, file_id: &str) -> Result<Vec<StructuredTest>, ParseError> {
    TestParser::with_project_key(DEFAULT_PROJECT_KEY)?.parse_source(source, file_id)
}

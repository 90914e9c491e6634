// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TEST_DOC_PARSER

//! Source rewrites used to get a syntax tree out of a file that does not parse.
//!
//! Both rewrites keep every byte before the cut point in place, so line numbers
//! of whatever survives are unchanged.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Quoted(char),
    Template,
}

/// Appends whatever closes the strings, comments and brackets still open at
/// the end of `source`. Regex literals are not recognized.
pub fn close_open_constructs(source: &str) -> String {
    let mut state = State::Code;
    let mut open: Vec<char> = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                '\'' | '"' => state = State::Quoted(c),
                '`' => state = State::Template,
                '(' | '[' | '{' => open.push(c),
                ')' | ']' | '}' => {
                    if open.last().copied().map(closer) == Some(c) {
                        open.pop();
                    }
                }
                _ => {}
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                }
            }
            State::Quoted(quote) => match c {
                '\\' => {
                    chars.next();
                }
                '\n' => state = State::Code,
                _ if c == quote => state = State::Code,
                _ => {}
            },
            State::Template => match c {
                '\\' => {
                    chars.next();
                }
                '`' => state = State::Code,
                _ => {}
            },
        }
    }

    let mut out = source.to_string();
    match state {
        State::Code => {}
        State::LineComment => out.push('\n'),
        State::BlockComment => out.push_str("*/"),
        State::Quoted(quote) => out.push(quote),
        State::Template => out.push('`'),
    }
    if !open.is_empty() {
        out.push('\n');
        out.extend(open.iter().rev().map(|&c| closer(c)));
        out.push('\n');
    }
    out
}

fn closer(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// `source` cut just before 1-based `line`. When that line is past the end,
/// the last line is dropped instead, so a non-empty input always shrinks.
pub fn truncate_before_line(source: &str, line: usize) -> &str {
    let start = if line <= 1 {
        0
    } else {
        source
            .match_indices('\n')
            .nth(line - 2)
            .map_or(source.len(), |(i, _)| i + 1)
    };
    if start < source.len() {
        return &source[..start];
    }
    let body = source.trim_end_matches('\n');
    match body.rfind('\n') {
        Some(i) => &source[..i + 1],
        None => "",
    }
}

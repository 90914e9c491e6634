// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: SYNC_SCANNER

use crate::mapping::MappingError;
use crate::validator::ValidationIssue;
use serde::Serialize;
use std::collections::BTreeMap;
use testdoc::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FsOperation {
    Read,
    Write,
    Create,
    Delete,
}

impl AsRef<str> for FsOperation {
    fn as_ref(&self) -> &str {
        match self {
            FsOperation::Read => "read",
            FsOperation::Write => "write",
            FsOperation::Create => "create",
            FsOperation::Delete => "delete",
        }
    }
}

/// Discriminator of a [`SyncError`] with the fields specific to that kind.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    Parse {
        file_path: String,
        line: Option<usize>,
    },
    Validation {
        issues: Vec<ValidationIssue>,
    },
    MappingStore {
        file_path: String,
    },
    FileSystem {
        operation: FsOperation,
        path: String,
    },
    Config {
        key: Option<String>,
    },
    Network {
        status: Option<u16>,
    },
    Timeout {
        after_ms: u64,
    },
}

/// Error shared by every stage of the sync pipeline.
#[derive(Error, Debug, Clone, Serialize, PartialEq)]
#[error("{message}")]
pub struct SyncError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: BTreeMap<String, String>,
}

impl SyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn file_system(operation: FsOperation, path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        let message = format!("Failed to {} {}: {}", operation.as_ref(), path, err);
        Self::new(ErrorKind::FileSystem { operation, path }, message)
    }

    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network { status }, message)
    }

    pub fn timeout(after_ms: u64) -> Self {
        Self::new(
            ErrorKind::Timeout { after_ms },
            format!("Operation timed out after {}ms", after_ms),
        )
    }

    pub fn code(&self) -> &'static str {
        match &self.kind {
            ErrorKind::Parse { .. } => "PARSE_ERROR",
            ErrorKind::Validation { .. } => "VALIDATION_ERROR",
            ErrorKind::MappingStore { .. } => "MAPPING_STORE_ERROR",
            ErrorKind::FileSystem { .. } => "FILE_SYSTEM_ERROR",
            ErrorKind::Config { .. } => "CONFIG_ERROR",
            ErrorKind::Network { .. } => "NETWORK_ERROR",
            ErrorKind::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Transient failures worth another attempt: timeouts, transport errors,
    /// rate limiting and server-side errors.
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            ErrorKind::Timeout { .. } => true,
            ErrorKind::Network { status: None } => true,
            ErrorKind::Network {
                status: Some(status),
            } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// One-line description: code, message, kind-specific location and context.
    pub fn render(&self) -> String {
        let mut out = format!("[{}] {}", self.code(), self.message);
        match &self.kind {
            ErrorKind::Parse {
                file_path,
                line: Some(line),
            } => out.push_str(&format!(" ({}:{})", file_path, line)),
            ErrorKind::Parse { file_path, .. } | ErrorKind::MappingStore { file_path } => {
                out.push_str(&format!(" ({})", file_path))
            }
            ErrorKind::FileSystem { operation, path } => {
                out.push_str(&format!(" ({} {})", operation.as_ref(), path))
            }
            ErrorKind::Validation { issues } => {
                out.push_str(&format!(" ({} issues)", issues.len()))
            }
            ErrorKind::Config { key: Some(key) } => out.push_str(&format!(" (key: {})", key)),
            ErrorKind::Network {
                status: Some(status),
            } => out.push_str(&format!(" (HTTP {})", status)),
            _ => {}
        }
        for (k, v) in &self.context {
            out.push_str(&format!(" {}={}", k, v));
        }
        out
    }
}

impl From<ParseError> for SyncError {
    fn from(err: ParseError) -> Self {
        let file_path = err.path().unwrap_or_default().to_string();
        SyncError::new(
            ErrorKind::Parse {
                file_path,
                line: None,
            },
            err.to_string(),
        )
    }
}

impl From<MappingError> for SyncError {
    fn from(err: MappingError) -> Self {
        let file_path = err.path().to_string();
        SyncError::new(ErrorKind::MappingStore { file_path }, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_is_a_function_of_kind() {
        assert!(SyncError::timeout(5).is_retryable());
        assert!(SyncError::network(None, "connection reset").is_retryable());
        assert!(SyncError::network(Some(503), "unavailable").is_retryable());
        assert!(SyncError::network(Some(429), "slow down").is_retryable());
        assert!(!SyncError::network(Some(404), "missing").is_retryable());
        let cfg = SyncError::new(ErrorKind::Config { key: None }, "bad");
        assert!(!cfg.is_retryable());
    }

    #[test]
    fn test_render_includes_code_and_location() {
        let err = SyncError::new(
            ErrorKind::Parse {
                file_path: "a.spec.ts".to_string(),
                line: Some(3),
            },
            "unexpected token",
        )
        .with_context("stage", "scan");
        assert_eq!(
            err.render(),
            "[PARSE_ERROR] unexpected token (a.spec.ts:3) stage=scan"
        );
        assert_eq!(err.to_string(), "unexpected token");
    }

    #[test]
    fn test_from_parse_error_keeps_path() {
        let parse = ParseError::Read {
            path: "b.spec.ts".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let err = SyncError::from(parse);
        assert_eq!(err.code(), "PARSE_ERROR");
        assert_eq!(
            err.kind,
            ErrorKind::Parse {
                file_path: "b.spec.ts".to_string(),
                line: None
            }
        );
        assert!(err.render().ends_with("(b.spec.ts)"));
    }
}

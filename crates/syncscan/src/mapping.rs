// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: SYNC_MAPPING_STORE

use crate::classify::SyncState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const MAPPING_SUFFIX: &str = ".mapping.json";

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Failed to read mapping file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write mapping file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in mapping file {path}: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Mapping file {path} must contain a JSON array of records")]
    NotAnArray { path: String },
    #[error("Invalid mapping record #{index} in {path}: {source}")]
    InvalidRecord {
        path: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl MappingError {
    pub fn path(&self) -> &str {
        match self {
            MappingError::Read { path, .. }
            | MappingError::Write { path, .. }
            | MappingError::InvalidJson { path, .. }
            | MappingError::NotAnArray { path }
            | MappingError::InvalidRecord { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub local_changes: serde_json::Value,
    pub remote_changes: serde_json::Value,
    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappingMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub sync_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Persisted link between a local test and its remote test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    pub id: String,
    pub test_file_path: String,
    pub test_title: String,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub case_key: Option<String>,
    pub sync_status: SyncState,
    /// Digest of the canonical test content at the last sync.
    #[serde(default)]
    pub last_digest: Option<String>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remote_version: Option<u64>,
    #[serde(default)]
    pub remote_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conflict: Option<ConflictInfo>,
    pub metadata: MappingMetadata,
}

impl MappingRecord {
    pub fn new(
        test_file_path: impl Into<String>,
        test_title: impl Into<String>,
        case_id: Option<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            test_file_path: test_file_path.into(),
            test_title: test_title.into(),
            case_id,
            case_key: None,
            sync_status: SyncState::Unsynced,
            last_digest: None,
            last_synced_at: None,
            remote_version: None,
            remote_updated_at: None,
            conflict: None,
            metadata: MappingMetadata {
                created_at: now,
                updated_at: now,
                created_by: created_by.into(),
                sync_count: 0,
                last_error: None,
            },
        }
    }

    /// Records a successful sync of content with the given digest.
    pub fn mark_synced(&mut self, digest: impl Into<String>, at: DateTime<Utc>) {
        self.sync_status = SyncState::Synced;
        self.last_digest = Some(digest.into());
        self.last_synced_at = Some(at);
        self.metadata.sync_count += 1;
        self.metadata.updated_at = at;
        self.metadata.last_error = None;
    }

    /// Flags local edits; the last synced digest and time are kept for comparison.
    pub fn mark_needs_update(&mut self, at: DateTime<Utc>) {
        self.sync_status = SyncState::NeedsUpdate;
        self.metadata.updated_at = at;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.metadata.last_error = Some(error.into());
        self.metadata.updated_at = at;
    }
}

/// Per-source-file storage of mapping records.
pub trait MappingStore {
    /// Records stored for `source_file`; a file with no mapping document has none.
    fn load(&self, source_file: &Path) -> Result<Vec<MappingRecord>, MappingError>;
    fn save(&self, source_file: &Path, records: &[MappingRecord]) -> Result<(), MappingError>;
}

/// Keeps `{source}.mapping.json` next to every source file.
#[derive(Debug, Default, Clone)]
pub struct JsonMappingStore;

impl JsonMappingStore {
    pub fn new() -> Self {
        Self
    }

    pub fn mapping_path(source_file: &Path) -> PathBuf {
        let mut name = source_file.as_os_str().to_os_string();
        name.push(MAPPING_SUFFIX);
        PathBuf::from(name)
    }
}

impl MappingStore for JsonMappingStore {
    fn load(&self, source_file: &Path) -> Result<Vec<MappingRecord>, MappingError> {
        let path = Self::mapping_path(source_file);
        let display = path.to_string_lossy().to_string();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path).map_err(|source| MappingError::Read {
            path: display.clone(),
            source,
        })?;
        decode_records(&bytes, &display)
    }

    fn save(&self, source_file: &Path, records: &[MappingRecord]) -> Result<(), MappingError> {
        let path = Self::mapping_path(source_file);
        let display = path.to_string_lossy().to_string();
        let write_err = |source| MappingError::Write {
            path: display.clone(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(records).map_err(|source| {
            MappingError::InvalidJson {
                path: display.clone(),
                source,
            }
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Decodes a mapping document; any deviation from the record schema is an error.
pub fn decode_records(bytes: &[u8], path: &str) -> Result<Vec<MappingRecord>, MappingError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|source| MappingError::InvalidJson {
            path: path.to_string(),
            source,
        })?;
    let serde_json::Value::Array(entries) = value else {
        return Err(MappingError::NotAnArray {
            path: path.to_string(),
        });
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry).map_err(|source| MappingError::InvalidRecord {
                path: path.to_string(),
                index,
                source,
            })
        })
        .collect()
}

/// The record mapped to `case_id`, if any.
pub fn find_by_case_id<'a>(
    records: &'a [MappingRecord],
    case_id: &str,
) -> Option<&'a MappingRecord> {
    records
        .iter()
        .find(|r| r.case_id.as_deref() == Some(case_id))
}

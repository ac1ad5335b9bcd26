// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file persistence for follow-up records.

use std::io::Write;
use std::path::{Path, PathBuf};

use atende_core::AtendeError;
use tracing::debug;

use crate::record::FollowUpRecord;

/// A JSON array of records in one file.
///
/// Every write serializes the full record set into a temporary file in the
/// same directory and renames it over the target, so readers see either the
/// old or the new document, never a partial one.
#[derive(Debug, Clone)]
pub struct FollowUpStore {
    path: PathBuf,
}

fn storage_error(e: impl std::error::Error + Send + Sync + 'static) -> AtendeError {
    AtendeError::Storage {
        source: Box::new(e),
    }
}

impl FollowUpStore {
    /// Opens the store and reads its records.
    ///
    /// A missing file is an empty store. A file that cannot be parsed is an
    /// error: it is never overwritten by an empty set.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<FollowUpRecord>), AtendeError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| AtendeError::Storage {
                source: format!("corrupt follow-up store {}: {e}", path.display()).into(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(storage_error(e)),
        };
        debug!(path = %path.display(), records = records.len(), "follow-up store opened");
        Ok((Self { path }, records))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replaces the file with `records`.
    pub fn persist(&self, records: &[FollowUpRecord]) -> Result<(), AtendeError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(storage_error)?;

        let json = serde_json::to_vec_pretty(records).map_err(storage_error)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(storage_error)?;
        tmp.write_all(&json).map_err(storage_error)?;
        tmp.as_file().sync_all().map_err(storage_error)?;
        tmp.persist(&self.path).map_err(|e| storage_error(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chat: &str) -> FollowUpRecord {
        FollowUpRecord::new("loja", "loja-1", chat, "+5511", "Ana")
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (_, records) = FollowUpStore::open(dir.path().join("f.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn persist_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/f.json");
        let (store, _) = FollowUpStore::open(&path).unwrap();
        let written = vec![record("a@c.us"), record("b@c.us")];
        store.persist(&written).unwrap();

        let (_, read) = FollowUpStore::open(&path).unwrap();
        assert_eq!(read, written);
        // Only the target file remains; the temporary was renamed.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn corrupt_file_fails_and_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = FollowUpStore::open(&path).unwrap_err();
        assert!(matches!(err, AtendeError::Storage { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}

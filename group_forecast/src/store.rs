//! On-disk store of per-group results
//!
//! Each group gets one JSON document `<encoded key>_results.json` holding
//! its validation and prediction tables. Writes go to a temporary file in
//! the same directory and are renamed into place, so a reader never sees a
//! partial document.

use crate::error::{PipelineError, Result};
use crate::partition::GroupKey;
use crate::records::RecordTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Filename suffix of a stored result
pub const RESULT_SUFFIX: &str = "_results.json";

/// Prefix of in-progress temporary files
const TEMP_PREFIX: &str = ".tmp-";

/// Stored result of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    /// Actual units over the validation days
    pub valid_df: RecordTable,
    /// Predicted units over the validation days
    pub pred_df: RecordTable,
}

/// Directory of result documents keyed by [`GroupKey`]
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Store rooted at `dir`, created if missing
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::PersistenceError(format!("Cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the result of `key`
    pub fn path_for(&self, key: &GroupKey) -> PathBuf {
        self.dir.join(format!("{}{}", key.encode(), RESULT_SUFFIX))
    }

    /// Remove all stored results and leftover temporary files.
    ///
    /// Other files in the directory are left alone.
    pub fn reset(&self) -> Result<usize> {
        let mut removed = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(RESULT_SUFFIX) || name.starts_with(TEMP_PREFIX) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        tracing::info!(dir = %self.dir.display(), removed, "result store reset");
        Ok(removed)
    }

    /// Atomically write the result of `key`, replacing any previous one
    pub fn put(&self, key: &GroupKey, valid_df: &RecordTable, pred_df: &RecordTable) -> Result<()> {
        let document = ResultDocumentRef { valid_df, pred_df };
        let target = self.path_for(key);
        let persist_err =
            |e: std::io::Error| PipelineError::PersistenceError(format!("{}: {}", target.display(), e));

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".json")
            .tempfile_in(&self.dir)
            .map_err(persist_err)?;
        serde_json::to_writer(&mut tmp, &document)?;
        tmp.flush().map_err(persist_err)?;
        tmp.as_file().sync_all().map_err(persist_err)?;
        tmp.persist(&target).map_err(|e| persist_err(e.error))?;

        tracing::debug!(group = %key, path = %target.display(), "result stored");
        Ok(())
    }

    /// Keys of every stored result, decoded from the filenames
    pub fn list(&self) -> Result<BTreeSet<GroupKey>> {
        let mut keys = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            let Some(encoded) = name.strip_suffix(RESULT_SUFFIX) else {
                continue;
            };
            match GroupKey::decode(encoded) {
                Ok(key) => {
                    keys.insert(key);
                }
                Err(err) => tracing::warn!(file = %name, error = %err, "ignoring unrecognised result file"),
            }
        }
        Ok(keys)
    }

    /// Stored result of `key`
    pub fn get(&self, key: &GroupKey) -> Result<ResultDocument> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Raw JSON text of the stored result of `key`
    pub fn get_raw(&self, key: &GroupKey) -> Result<String> {
        fs::read_to_string(self.path_for(key)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::NotFound(key.to_string()),
            _ => e.into(),
        })
    }
}

#[derive(Serialize)]
struct ResultDocumentRef<'a> {
    valid_df: &'a RecordTable,
    pred_df: &'a RecordTable,
}

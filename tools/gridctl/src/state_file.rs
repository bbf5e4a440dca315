//! JSON file backed total store
//!
//! Totals are read once when the store is opened and the whole document is
//! rewritten on every persist: serialized to a sibling temp file, synced,
//! then renamed over the target so a crash never leaves a half-written file.

use chrono::{DateTime, Utc};
use gridlink_calc::{StoreError, StoreResult, TotalStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub totals: BTreeMap<String, f64>,
}

/// [`TotalStore`] persisting to a single JSON document
#[derive(Debug)]
pub struct JsonFileTotalStore {
    path: PathBuf,
    document: Mutex<StateDocument>,
}

impl JsonFileTotalStore {
    /// Open the state file at `path`, starting empty if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let document = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| StoreError::io(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&content)
                .map_err(|e| StoreError::serialization(format!("{}: {}", path.display(), e)))?
        } else {
            StateDocument::default()
        };

        debug!(
            path = %path.display(),
            totals = document.totals.len(),
            "state file opened"
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of every stored total
    pub fn totals(&self) -> BTreeMap<String, f64> {
        self.document.lock().totals.clone()
    }

    fn write_document(&self, document: &StateDocument) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(e.to_string()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let write_temp = || -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        };

        write_temp().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::io(format!("{}: {}", self.path.display(), e))
        })
    }
}

impl TotalStore for JsonFileTotalStore {
    fn load_persisted_total(&self, key: &str) -> StoreResult<Option<f64>> {
        Ok(self.document.lock().totals.get(key).copied())
    }

    fn persist_total(&self, key: &str, total: f64) -> StoreResult<()> {
        let mut document = self.document.lock();
        let mut next = document.clone();
        next.totals.insert(key.to_string(), total);
        next.updated_at = Some(Utc::now());

        // Memory only follows the file once the write succeeded
        self.write_document(&next)?;
        *document = next;
        Ok(())
    }
}

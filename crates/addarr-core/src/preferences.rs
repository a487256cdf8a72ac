//! Persist client preferences across sessions.
//!
//! A flat JSON object of string values, stored at
//! `~/.local/share/addarr/preferences.json` (or platform equivalent via
//! `directories` crate). In practice it only ever holds the resolved base URL.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use addarr_api::PreferenceStore;

use crate::error::CoreError;

/// File-backed [`PreferenceStore`]. Every write rewrites the whole file.
#[derive(Debug)]
pub struct PreferenceFile {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl PreferenceFile {
    /// Open `path`, starting empty if it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable preferences: {e}");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<BTreeMap<String, String>, CoreError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, values: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)
    }
}

impl PreferenceStore for PreferenceFile {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        self.write(&values)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if values.remove(key).is_some() {
            self.write(&values)?;
        }
        Ok(())
    }
}

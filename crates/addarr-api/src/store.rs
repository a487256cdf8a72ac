use std::collections::HashMap;
use std::sync::Mutex;

use crate::traits::PreferenceStore;

/// Process-local preference store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("addarr_base_url"), None);

        store.set("addarr_base_url", "https://x.example").unwrap();
        assert_eq!(store.get("addarr_base_url").as_deref(), Some("https://x.example"));

        store.set("addarr_base_url", "https://y.example").unwrap();
        assert_eq!(store.get("addarr_base_url").as_deref(), Some("https://y.example"));

        store.remove("addarr_base_url").unwrap();
        assert_eq!(store.get("addarr_base_url"), None);
    }
}

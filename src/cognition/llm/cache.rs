//! Memoized model answers keyed by [`CallKey`]

use std::path::Path;
use std::sync::RwLock;

use ahash::AHashMap;

use crate::cognition::CallKey;
use crate::core::error::Result;

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<AHashMap<CallKey, String>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CallKey) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: CallKey, answer: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, answer);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write all entries as a JSON list, for replaying a run offline
    pub fn save(&self, path: &Path) -> Result<()> {
        let entries: Vec<(CallKey, String)> = self
            .entries
            .read()
            .map(|e| e.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        std::fs::write(path, serde_json::to_string(&entries)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<(CallKey, String)> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Ok(Self {
            entries: RwLock::new(entries.into_iter().collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_insert() {
        let cache = ResponseCache::new();
        let key = CallKey::new("Klaus", "rate_poignancy", 3, "reading");
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), "{\"rating\": 4}".into());
        assert_eq!(cache.get(&key).as_deref(), Some("{\"rating\": 4}"));
        assert!(cache.get(&CallKey::new("Klaus", "rate_poignancy", 4, "reading")).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ResponseCache::new();
        cache.insert(CallKey::new("Maria", "choose", 1, "cafe"), "{\"answer\": \"cafe\"}".into());
        cache.save(&path).unwrap();
        let restored = ResponseCache::load(&path).unwrap();
        assert_eq!(restored.len(), 1);
    }
}

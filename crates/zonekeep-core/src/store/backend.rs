// ── Key/value backend ──
//
// The persistence contract the typed store sits on. Keys are flat
// strings; values are opaque bytes. Scans return entries in key order.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::CoreError;

#[async_trait]
pub trait KvBackend: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CoreError>;

    async fn put(&self, key: &str, value: Bytes) -> Result<(), CoreError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CoreError>;

    /// Every entry whose key starts with `prefix`, sorted by key.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>, CoreError>;

    /// Replace the value at `key` only if it currently equals `expected`
    /// (`None` meaning absent). Returns whether the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Bytes,
    ) -> Result<bool, CoreError>;
}

/// Process-local backend. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Bytes>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Bytes)>, CoreError> {
        let mut found: Vec<(String, Bytes)> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Bytes,
    ) -> Result<bool, CoreError> {
        // The entry guard holds the shard lock for the whole comparison.
        match (self.entries.entry(key.to_owned()), expected) {
            (Entry::Occupied(mut slot), Some(expected)) if slot.get().as_ref() == expected => {
                slot.insert(value);
                Ok(true)
            }
            (Entry::Vacant(slot), None) => {
                slot.insert(value);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

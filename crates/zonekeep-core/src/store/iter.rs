// ── Typed scan iterator ──

use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::backend::KvBackend;
use crate::error::CoreError;

/// Iterates over one prefix scan, decoding values as `T`.
///
/// `Iterator::next` yields decode errors so callers can decide; use
/// [`ScanIter::next_valid`] to log and skip undecodable entries. The
/// raw bytes and key of the last yielded entry stay available for
/// inspection or deletion.
pub struct ScanIter<T> {
    backend: Arc<dyn KvBackend>,
    entries: std::vec::IntoIter<(String, Bytes)>,
    current: Option<(String, Bytes)>,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ScanIter<T> {
    pub(crate) fn new(backend: Arc<dyn KvBackend>, entries: Vec<(String, Bytes)>) -> Self {
        Self {
            backend,
            entries: entries.into_iter(),
            current: None,
            _item: PhantomData,
        }
    }

    /// Key of the last entry returned.
    pub fn key(&self) -> Option<&str> {
        self.current.as_ref().map(|(k, _)| k.as_str())
    }

    /// Stored bytes of the last entry returned.
    pub fn raw(&self) -> Option<&Bytes> {
        self.current.as_ref().map(|(_, v)| v)
    }

    /// Delete the last entry returned from the backend.
    pub async fn drop_item(&mut self) -> Result<(), CoreError> {
        let Some((key, _)) = self.current.take() else {
            return Err(CoreError::storage("drop_item called before next"));
        };
        self.backend.delete(&key).await?;
        Ok(())
    }

    /// Next entry that decodes; broken entries are logged and skipped.
    pub fn next_valid(&mut self) -> Option<T> {
        loop {
            match self.next()? {
                Ok(item) => return Some(item),
                Err(e) => warn!(key = self.key().unwrap_or_default(), error = %e, "skipping undecodable entry"),
            }
        }
    }

    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl<T: DeserializeOwned> Iterator for ScanIter<T> {
    type Item = Result<T, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, raw) = self.entries.next()?;
        let decoded = serde_json::from_slice(&raw).map_err(CoreError::from);
        self.current = Some((key, raw));
        Some(decoded)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    #[tokio::test]
    async fn skips_broken_entries_and_drops_items() {
        let kv: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        kv.put("n-1", Bytes::from_static(b"1")).await.unwrap();
        kv.put("n-2", Bytes::from_static(b"not json")).await.unwrap();
        kv.put("n-3", Bytes::from_static(b"3")).await.unwrap();

        let mut iter: ScanIter<u32> = ScanIter::new(Arc::clone(&kv), kv.scan_prefix("n-").await.unwrap());
        assert_eq!(iter.next_valid(), Some(1));
        assert_eq!(iter.next_valid(), Some(3));
        assert_eq!(iter.key(), Some("n-3"));
        iter.drop_item().await.unwrap();
        assert_eq!(iter.next_valid(), None);
        assert!(kv.get("n-3").await.unwrap().is_none());
        assert!(iter.drop_item().await.is_err());
    }

    #[tokio::test]
    async fn surfaces_decode_errors_through_next() {
        let kv: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        kv.put("n-1", Bytes::from_static(b"{")).await.unwrap();
        let mut iter: ScanIter<u32> = ScanIter::new(Arc::clone(&kv), kv.scan_prefix("n-").await.unwrap());
        assert!(iter.next().unwrap().is_err());
        assert_eq!(iter.raw().map(Bytes::len), Some(1));
    }
}

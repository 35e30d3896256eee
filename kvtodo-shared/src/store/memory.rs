/// In-memory key-value gateway
///
/// [`MemoryStore`] implements [`KvStore`] over a `BTreeMap` guarded by a
/// `parking_lot::RwLock`. It is used by the test suites and for running the
/// API locally without Redis. Clones share the same data.
///
/// Conditional writes are atomic here because they run under the write lock,
/// which matches what `SETNX` and the Lua compare-and-set give on Redis.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use kvtodo_shared::store::{KvStore, MemoryStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// store.set("user:1", Bytes::from_static(b"{}")).await.unwrap();
/// assert!(store.get("user:1").await.unwrap().is_some());
/// # });
/// ```

use super::{KeyStream, KvStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory store shared across clones
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, Bytes>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (or regaining) the connection to the store
    ///
    /// While unavailable every operation fails with
    /// `StoreError::Connection`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Connection(
                "memory store marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.check_available()?;
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.check_available()?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> KeyStream {
        if let Err(e) = self.check_available() {
            return futures::stream::once(async move { Err(e) }).boxed();
        }

        let keys: Vec<String> = self
            .data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        futures::stream::iter(keys.into_iter().map(Ok)).boxed()
    }

    async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool> {
        self.check_available()?;
        let mut data = self.data.write();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_string(), value);
        Ok(true)
    }

    async fn compare_and_set(&self, key: &str, expected: &[u8], new: Bytes) -> StoreResult<bool> {
        self.check_available()?;
        let mut data = self.data.write();
        match data.get_mut(key) {
            Some(current) if current.as_ref() == expected => {
                *current = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

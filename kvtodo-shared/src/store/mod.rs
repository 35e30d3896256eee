/// Key-value gateway
///
/// This module defines the narrow storage contract the rest of the crate is
/// built on. The remote store offers plain `GET`/`SET`/`SCAN`; it has no
/// transactions, no secondary indexes and no uniqueness constraints. The only
/// conditional writes exposed are [`KvStore::set_if_absent`] and
/// [`KvStore::compare_and_set`], which the repository layer uses to close the
/// username race and to make status updates non-destructive.
///
/// # Implementations
///
/// - [`RedisStore`]: production gateway over `redis::aio::ConnectionManager`
/// - [`MemoryStore`]: in-process map for tests and local development
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use futures::TryStreamExt;
/// use kvtodo_shared::store::{KvStore, MemoryStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.set("todo:1", Bytes::from_static(b"{}")).await?;
///
/// let keys: Vec<String> = store.scan_prefix("todo:").try_collect().await?;
/// assert_eq!(keys, vec!["todo:1".to_string()]);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod redis_client;

pub use memory::MemoryStore;
pub use redis_client::{RedisConfig, RedisStore};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Key-value store errors
///
/// An absent key is never an error at this layer: [`KvStore::get`] returns
/// `Ok(None)` for it, so a `Connection` failure can always be told apart from
/// a missing record.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached (refused, dropped, DNS, ...)
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The store answered with an error
    #[error("Store command error: {0}")]
    Command(String),

    /// A command did not complete within the configured timeout
    #[error("Store operation timed out after {0}s")]
    Timeout(u64),

    /// Invalid store configuration
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error means the store is unreachable rather than
    /// misbehaving
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout(_))
    }
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Lazy stream of keys produced by a prefix scan
pub type KeyStream = BoxStream<'static, StoreResult<String>>;

/// Minimal key-value contract
///
/// Implementations must be safe for concurrent use by many in-flight
/// requests; callers share a single instance behind an `Arc`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetches the value stored at `key`, `None` if the key is absent
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Stores `value` at `key` permanently, overwriting any previous value
    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Enumerates every key starting with `prefix`
    ///
    /// The stream is lazy and may issue several round-trips. Key order is
    /// unspecified and a key may be reported more than once if the keyspace
    /// changes while scanning.
    fn scan_prefix(&self, prefix: &str) -> KeyStream;

    /// Stores `value` only if `key` does not exist yet
    ///
    /// Returns `true` if this call created the key.
    async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool>;

    /// Replaces the value at `key` only if it is byte-for-byte `expected`
    ///
    /// Returns `false` when the current value differs or the key is absent.
    async fn compare_and_set(&self, key: &str, expected: &[u8], new: Bytes) -> StoreResult<bool>;

    /// Round-trips to the store to check it is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// Escapes glob metacharacters so `prefix` matches literally in a
/// `SCAN MATCH` pattern
pub(crate) fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("todo:"), "todo:");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
        assert_eq!(escape_glob("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(StoreError::Connection("refused".into()).is_unavailable());
        assert!(StoreError::Timeout(5).is_unavailable());
        assert!(!StoreError::Command("WRONGTYPE".into()).is_unavailable());
    }
}

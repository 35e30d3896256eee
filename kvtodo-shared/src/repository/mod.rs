/// Repository layer over the key-value gateway
///
/// Each entity type owns a key prefix and every query is a prefix scan
/// followed by a `GET` and a decode per key. There is no secondary index:
/// listing the tasks of one user touches every task in the store.
///
/// [`KvRepository`] implements this once for any [`Record`]. The
/// [`UserRepository`](user::UserRepository) and
/// [`TaskRepository`](task::TaskRepository) traits are what services depend
/// on, so an indexed implementation can replace the scan without touching
/// call sites.
///
/// # Failure policy
///
/// Listing is fail-fast: the first fetch or decode error aborts the whole
/// listing and no partial result is returned. This is not a snapshot; records
/// written during the scan may or may not be included.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use kvtodo_shared::models::task::Task;
/// use kvtodo_shared::repository::KvRepository;
/// use kvtodo_shared::store::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo: KvRepository<Task> = KvRepository::new(Arc::new(MemoryStore::new()));
/// let task = Task::new("buy milk".to_string(), Uuid::new_v4());
/// repo.create(&task).await?;
/// assert_eq!(repo.get_by_id(&task.id.to_string()).await?, task);
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;

pub use task::TaskRepository;
pub use user::UserRepository;

use crate::codec::{self, CodecError, Record};
use crate::store::{KvStore, StoreError};
use futures::TryStreamExt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No record with this ID
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Rejected input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A conditional write kept losing against concurrent writers
    #[error("Concurrent modification of {key}")]
    Conflict { key: String },

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stored record could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Repository result type alias
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Prefix-scan repository for one record type
pub struct KvRepository<R> {
    store: Arc<dyn KvStore>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for KvRepository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> KvRepository<R> {
    /// Creates a repository over `store`
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Lists every record of this type
    ///
    /// Order is unspecified.
    pub async fn list_all(&self) -> RepositoryResult<Vec<R>> {
        self.list_where(|_| true).await
    }

    /// Lists the records matching `predicate`
    ///
    /// Every record is fetched and decoded before the predicate sees it, so
    /// a corrupt record fails the call even if it would not have matched.
    pub async fn list_where<F>(&self, predicate: F) -> RepositoryResult<Vec<R>>
    where
        F: Fn(&R) -> bool + Send,
    {
        let mut keys = self.store.scan_prefix(R::PREFIX);
        let mut records = Vec::new();
        let mut scanned = 0usize;

        while let Some(key) = keys.try_next().await? {
            scanned += 1;

            // Keys are never deleted by this crate; one vanishing mid-scan was
            // removed externally and is no longer part of the listing.
            let Some(bytes) = self.store.get(&key).await? else {
                tracing::debug!(key = %key, "Key disappeared during scan, skipping");
                continue;
            };

            let record: R = codec::decode(&bytes).map_err(|e| {
                tracing::error!(key = %key, error = %e, "Corrupt record aborts listing");
                e
            })?;

            if predicate(&record) {
                records.push(record);
            }
        }

        tracing::debug!(
            entity = R::ENTITY,
            scanned,
            matched = records.len(),
            "Prefix scan complete"
        );

        Ok(records)
    }

    /// Fetches one record by ID
    ///
    /// # Errors
    ///
    /// `RepositoryError::NotFound` if no record is stored under the ID.
    pub async fn get_by_id(&self, id: &str) -> RepositoryResult<R> {
        let (record, _) = self.fetch(id).await?;
        Ok(record)
    }

    /// Stores a new record under its own key
    ///
    /// The record's ID must already be set by the caller. An existing record
    /// with the same ID is overwritten.
    pub async fn create(&self, record: &R) -> RepositoryResult<()> {
        let bytes = codec::encode(record)?;
        self.store.set(&record.key(), bytes).await?;
        Ok(())
    }

    /// Stores a new record only if its key is unused
    ///
    /// Returns `false` without writing if a record with this ID exists.
    pub async fn create_if_absent(&self, record: &R) -> RepositoryResult<bool> {
        let bytes = codec::encode(record)?;
        Ok(self.store.set_if_absent(&record.key(), bytes).await?)
    }

    /// Fetches a record together with the exact bytes it was decoded from
    ///
    /// The raw bytes are the precondition for a later compare-and-set.
    pub(crate) async fn fetch(&self, id: &str) -> RepositoryResult<(R, bytes::Bytes)> {
        let key = codec::key_for::<R>(id);
        let bytes = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: R::ENTITY,
                id: id.to_string(),
            })?;
        let record = codec::decode(&bytes)?;
        Ok((record, bytes))
    }
}

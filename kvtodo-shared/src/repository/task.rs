/// Task repository
///
/// Ownership is enforced by filtering: [`TaskRepository::list_by_owner`]
/// scans the whole `todo:` keyspace and keeps the records whose `user_id`
/// matches. Cost is O(total tasks) per query.
///
/// Status updates are read-modify-write. The write is a compare-and-set
/// against the exact bytes that were read, retried a few times if another
/// writer got in between, so an update never overwrites a record it did not
/// see. Two updates that both succeed still resolve last-writer-wins.

use super::{KvRepository, RepositoryError, RepositoryResult};
use crate::codec::{self, Record};
use crate::models::task::{Task, TaskStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// Attempts before a status update gives up with `Conflict`
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

/// Task persistence operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Lists the tasks owned by `owner_id`, in unspecified order
    async fn list_by_owner(&self, owner_id: Uuid) -> RepositoryResult<Vec<Task>>;

    /// Fetches a task by ID
    async fn get_task(&self, id: &str) -> RepositoryResult<Task>;

    /// Persists a new task
    async fn create_task(&self, task: &Task) -> RepositoryResult<()>;

    /// Sets the status of an existing task and returns the stored result
    ///
    /// # Errors
    ///
    /// - `Validation` if `status` is not `in_progress` or `completed`; the
    ///   stored task is left untouched
    /// - `NotFound` if no task has this ID
    /// - `Conflict` if concurrent writers kept winning the compare-and-set
    async fn update_status(&self, id: &str, status: &str) -> RepositoryResult<Task>;
}

#[async_trait]
impl TaskRepository for KvRepository<Task> {
    async fn list_by_owner(&self, owner_id: Uuid) -> RepositoryResult<Vec<Task>> {
        self.list_where(move |task| task.is_owned_by(owner_id)).await
    }

    async fn get_task(&self, id: &str) -> RepositoryResult<Task> {
        self.get_by_id(id).await
    }

    async fn create_task(&self, task: &Task) -> RepositoryResult<()> {
        if self.create_if_absent(task).await? {
            tracing::info!(task_id = %task.id, owner_id = %task.owner_id, "Task created");
            Ok(())
        } else {
            Err(RepositoryError::Conflict { key: task.key() })
        }
    }

    async fn update_status(&self, id: &str, status: &str) -> RepositoryResult<Task> {
        let target = TaskStatus::parse_update(status).ok_or_else(|| {
            RepositoryError::Validation(format!(
                "Invalid status value '{}': expected in_progress or completed",
                status
            ))
        })?;

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (mut task, current) = self.fetch(id).await?;
            task.status = target;
            let updated = codec::encode(&task)?;

            if self
                .store()
                .compare_and_set(&task.key(), &current, updated)
                .await?
            {
                tracing::info!(task_id = %task.id, status = %target, "Task status updated");
                return Ok(task);
            }

            tracing::warn!(task_id = %id, attempt, "Task changed during update, retrying");
        }

        Err(RepositoryError::Conflict {
            key: codec::key_for::<Task>(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyStream, KvStore, MemoryStore, StoreResult};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn repo() -> (MemoryStore, KvRepository<Task>) {
        let store = MemoryStore::new();
        let repo = KvRepository::new(Arc::new(store.clone()) as Arc<dyn KvStore>);
        (store, repo)
    }

    #[tokio::test]
    async fn test_list_by_owner_filters_other_owners() {
        let (_, repo) = repo();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        for i in 0..5 {
            repo.create_task(&Task::new(format!("alice {}", i), alice))
                .await
                .unwrap();
            repo.create_task(&Task::new(format!("bob {}", i), bob))
                .await
                .unwrap();
        }

        let tasks = repo.list_by_owner(alice).await.unwrap();
        assert_eq!(tasks.len(), 5);
        assert!(tasks.iter().all(|t| t.owner_id == alice));

        let nobody = repo.list_by_owner(Uuid::new_v4()).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_persists() {
        let (_, repo) = repo();
        let task = Task::new("buy milk".to_string(), Uuid::new_v4());
        repo.create_task(&task).await.unwrap();

        let updated = repo
            .update_status(&task.id.to_string(), "in_progress")
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);

        let updated = repo
            .update_status(&task.id.to_string(), "completed")
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);

        let stored = repo.get_task(&task.id.to_string()).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.task, task.task);
        assert_eq!(stored.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_invalid_status_leaves_task_unchanged() {
        let (_, repo) = repo();
        let task = Task::new("buy milk".to_string(), Uuid::new_v4());
        repo.create_task(&task).await.unwrap();

        for bad in ["archived", "new", "", "COMPLETED"] {
            let result = repo.update_status(&task.id.to_string(), bad).await;
            assert!(matches!(result, Err(RepositoryError::Validation(_))));
        }

        let stored = repo.get_task(&task.id.to_string()).await.unwrap();
        assert_eq!(stored.status, TaskStatus::New);
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_not_found() {
        let (_, repo) = repo();
        let result = repo
            .update_status(&Uuid::new_v4().to_string(), "completed")
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    /// Store whose compare-and-set loses a fixed number of times
    struct ContendedStore {
        inner: MemoryStore,
        losses: AtomicUsize,
    }

    #[async_trait]
    impl KvStore for ContendedStore {
        async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
            self.inner.set(key, value).await
        }

        fn scan_prefix(&self, prefix: &str) -> KeyStream {
            self.inner.scan_prefix(prefix)
        }

        async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool> {
            self.inner.set_if_absent(key, value).await
        }

        async fn compare_and_set(
            &self,
            key: &str,
            expected: &[u8],
            new: Bytes,
        ) -> StoreResult<bool> {
            let remaining = self.losses.load(Ordering::SeqCst);
            if remaining > 0 {
                self.losses.store(remaining - 1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.compare_and_set(key, expected, new).await
        }

        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
    }

    fn contended(losses: usize) -> KvRepository<Task> {
        KvRepository::new(Arc::new(ContendedStore {
            inner: MemoryStore::new(),
            losses: AtomicUsize::new(losses),
        }) as Arc<dyn KvStore>)
    }

    #[tokio::test]
    async fn test_update_retries_after_lost_race() {
        let repo = contended(2);
        let task = Task::new("t".to_string(), Uuid::new_v4());
        repo.create_task(&task).await.unwrap();

        let updated = repo
            .update_status(&task.id.to_string(), "completed")
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_gives_up_with_conflict() {
        let repo = contended(MAX_UPDATE_ATTEMPTS);
        let task = Task::new("t".to_string(), Uuid::new_v4());
        repo.create_task(&task).await.unwrap();

        let result = repo.update_status(&task.id.to_string(), "completed").await;
        assert!(matches!(result, Err(RepositoryError::Conflict { .. })));

        let stored = repo.get_task(&task.id.to_string()).await.unwrap();
        assert_eq!(stored.status, TaskStatus::New);
    }

    #[tokio::test]
    async fn test_concurrent_updates_leave_a_valid_record() {
        let (_, repo) = repo();
        let task = Task::new("t".to_string(), Uuid::new_v4());
        repo.create_task(&task).await.unwrap();

        let id = task.id.to_string();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                let id = id.clone();
                let status = if i % 2 == 0 { "in_progress" } else { "completed" };
                tokio::spawn(async move { repo.update_status(&id, status).await })
            })
            .collect();

        for handle in handles {
            let _ = handle.await.unwrap();
        }

        let stored = repo.get_task(&id).await.unwrap();
        assert!(stored.status.is_update_target());
        assert_eq!(stored.owner_id, task.owner_id);
    }
}

/// User repository
///
/// Besides the `user:{id}` records, registration claims a `username:{name}`
/// key with `SETNX` so two concurrent registrations of the same name cannot
/// both succeed.
///
/// A claim is only binding once its user record exists. A registration that
/// fails after claiming releases its claim, and a claim that was never
/// released expires after [`CLAIM_LEASE_SECS`]. Either way the next
/// registration takes it over with a compare-and-set, so a failed write never
/// locks a name for good.

use super::{KvRepository, RepositoryError, RepositoryResult};
use crate::codec::{self, Record};
use crate::models::user::{User, UsernameClaim};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Seconds an unfinished username claim blocks other registrations
pub const CLAIM_LEASE_SECS: i64 = 30;

/// User persistence operations the identity service depends on
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Lists every user (full prefix scan)
    async fn list_users(&self) -> RepositoryResult<Vec<User>>;

    /// Fetches a user by ID
    async fn get_user(&self, id: &str) -> RepositoryResult<User>;

    /// Persists a newly registered user
    ///
    /// Fails with `Conflict` if the ID is already taken.
    async fn create_user(&self, user: &User) -> RepositoryResult<()>;

    /// Overwrites an existing user record
    async fn save_user(&self, user: &User) -> RepositoryResult<()>;

    /// Atomically claims `username` for `user_id`
    ///
    /// An abandoned claim whose user record was never written is taken over.
    /// Returns `false` if the name is held.
    async fn claim_username(&self, username: &str, user_id: Uuid) -> RepositoryResult<bool>;

    /// Gives up the claim `user_id` holds on `username`
    ///
    /// A claim held for another user is left alone.
    async fn release_username(&self, username: &str, user_id: Uuid) -> RepositoryResult<()>;
}

impl KvRepository<User> {
    fn claims(&self) -> KvRepository<UsernameClaim> {
        KvRepository::new(self.store().clone())
    }

    /// Whether `claim` still blocks other registrations of its name
    async fn claim_is_held(&self, claim: &UsernameClaim) -> RepositoryResult<bool> {
        let owner_key = codec::key_for::<User>(&claim.user_id.to_string());
        if self.store().get(&owner_key).await?.is_some() {
            return Ok(true);
        }

        Ok(!claim.is_abandoned(Duration::seconds(CLAIM_LEASE_SECS), Utc::now()))
    }
}

#[async_trait]
impl UserRepository for KvRepository<User> {
    async fn list_users(&self) -> RepositoryResult<Vec<User>> {
        self.list_all().await
    }

    async fn get_user(&self, id: &str) -> RepositoryResult<User> {
        self.get_by_id(id).await
    }

    async fn create_user(&self, user: &User) -> RepositoryResult<()> {
        if self.create_if_absent(user).await? {
            Ok(())
        } else {
            Err(RepositoryError::Conflict { key: user.key() })
        }
    }

    async fn save_user(&self, user: &User) -> RepositoryResult<()> {
        self.create(user).await
    }

    async fn claim_username(&self, username: &str, user_id: Uuid) -> RepositoryResult<bool> {
        let claims = self.claims();
        let claim = UsernameClaim::new(username, user_id);

        if claims.create_if_absent(&claim).await? {
            return Ok(true);
        }

        let (current, raw) = match claims.fetch(username).await {
            Ok(found) => found,
            Err(RepositoryError::NotFound { .. }) => {
                return claims.create_if_absent(&claim).await;
            }
            Err(e) => return Err(e),
        };

        if self.claim_is_held(&current).await? {
            tracing::debug!(username = %username, "Username already claimed");
            return Ok(false);
        }

        let taken = self
            .store()
            .compare_and_set(&claim.key(), &raw, codec::encode(&claim)?)
            .await?;

        if taken {
            tracing::info!(
                username = %username,
                previous_user_id = %current.user_id,
                "Took over abandoned username claim"
            );
        }

        Ok(taken)
    }

    async fn release_username(&self, username: &str, user_id: Uuid) -> RepositoryResult<()> {
        let (current, raw) = match self.claims().fetch(username).await {
            Ok(found) => found,
            Err(RepositoryError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };

        if current.user_id != user_id || current.released {
            return Ok(());
        }

        let released = codec::encode(&current.released())?;
        if self
            .store()
            .compare_and_set(&current.key(), &raw, released)
            .await?
        {
            tracing::info!(username = %username, user_id = %user_id, "Released username claim");
        }

        Ok(())
    }
}

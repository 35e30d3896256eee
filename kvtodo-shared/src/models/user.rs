/// User model
///
/// A user is an identity record created by registration and never updated
/// or deleted afterwards (except for re-hashing a legacy plaintext password).
///
/// # Stored Format
///
/// Key `user:{id}`:
///
/// ```json
/// {
///   "id": "5f0c...",
///   "username": "al",
///   "password": "$argon2id$v=19$m=65536,t=3,p=4$..."
/// }
/// ```
///
/// The `password` field keeps its historical name for wire compatibility but
/// holds an Argon2id PHC string.
///
/// Key `username:{name}` holds a [`UsernameClaim`]:
///
/// ```json
/// {
///   "username": "al",
///   "user_id": "5f0c...",
///   "claimed_at": "2024-01-01T00:00:00Z",
///   "released": false
/// }
/// ```

use crate::codec::{self, Record};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User model representing an account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID (UUID v4), immutable
    pub id: Uuid,

    /// Login name, intended unique across all users
    pub username: String,

    /// Password hash (PHC string format)
    pub password: String,
}

impl User {
    /// Creates a user with a freshly generated ID
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password: password_hash,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Record for User {
    const PREFIX: &'static str = "user:";
    const ENTITY: &'static str = "user";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// Reservation of a username by the registration that is creating it
///
/// A claim only guards the window between reserving the name and writing the
/// user record. Once `user:{user_id}` exists the claim is permanent. A claim
/// whose user record was never written can be taken over after it is
/// released or its lease runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameClaim {
    /// Claimed login name
    pub username: String,

    /// User the name is reserved for
    pub user_id: Uuid,

    /// When the claim was made
    pub claimed_at: DateTime<Utc>,

    /// Set when the registration gave up before writing the user record
    #[serde(default)]
    pub released: bool,
}

impl UsernameClaim {
    /// Claims `username` for `user_id` as of now
    pub fn new(username: &str, user_id: Uuid) -> Self {
        Self {
            username: username.to_string(),
            user_id,
            claimed_at: Utc::now(),
            released: false,
        }
    }

    /// Whether an unfinished claim may be taken over at `now`
    ///
    /// Says nothing about the user record; callers check that separately.
    pub fn is_abandoned(&self, lease: Duration, now: DateTime<Utc>) -> bool {
        self.released || self.claimed_at + lease <= now
    }

    /// The same claim marked as released
    pub fn released(&self) -> Self {
        Self {
            released: true,
            ..self.clone()
        }
    }
}

impl Record for UsernameClaim {
    const PREFIX: &'static str = "username:";
    const ENTITY: &'static str = "username claim";

    fn id(&self) -> String {
        self.username.clone()
    }
}

/// Key under which `username` is claimed
pub fn username_claim_key(username: &str) -> String {
    codec::key_for::<UsernameClaim>(username)
}

/// Record codec
///
/// Entities are stored as JSON documents under `<prefix><id>` keys. The
/// [`Record`] trait ties an entity type to its key prefix so the repository
/// layer can be written once for every entity.
///
/// # Key Naming
///
/// - `user:{user_id}` - User records
/// - `todo:{task_id}` - Task records
///
/// # Example
///
/// ```
/// use kvtodo_shared::codec::{decode, encode, Record};
/// use kvtodo_shared::models::user::User;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::new("al".to_string(), "$argon2id$...".to_string());
/// let bytes = encode(&user)?;
/// let back: User = decode(&bytes)?;
/// assert_eq!(back, user);
/// assert_eq!(user.key(), format!("user:{}", user.id));
/// # Ok(())
/// # }
/// ```

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// The entity could not be serialized
    #[error("Failed to encode {entity}: {source}")]
    Encode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The stored payload is not a valid record of the expected type
    #[error("Failed to decode {entity}: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// An entity persisted as one JSON document per key
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Key prefix owned by this entity type, including the trailing `:`
    const PREFIX: &'static str;

    /// Human-readable entity name used in errors and logs
    const ENTITY: &'static str;

    /// The record's identifier as it appears in its key
    fn id(&self) -> String;

    /// Full storage key of this record
    fn key(&self) -> String {
        key_for::<Self>(&self.id())
    }
}

/// Builds the storage key for the record of type `R` with identifier `id`
pub fn key_for<R: Record>(id: &str) -> String {
    format!("{}{}", R::PREFIX, id)
}

/// Serializes a record to its stored JSON form
pub fn encode<R: Record>(record: &R) -> Result<Bytes, CodecError> {
    serde_json::to_vec(record)
        .map(Bytes::from)
        .map_err(|source| CodecError::Encode {
            entity: R::ENTITY,
            source,
        })
}

/// Parses a stored JSON payload
///
/// Either the whole record is returned or an error; a payload missing
/// required fields never yields a partially-populated value.
pub fn decode<R: Record>(bytes: &[u8]) -> Result<R, CodecError> {
    serde_json::from_slice(bytes).map_err(|source| CodecError::Decode {
        entity: R::ENTITY,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{Task, TaskStatus};
    use crate::models::user::User;
    use uuid::Uuid;

    #[test]
    fn test_user_roundtrip() {
        let user = User::new("al".to_string(), "p1-hash".to_string());
        let decoded: User = decode(&encode(&user).unwrap()).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn test_task_roundtrip_preserves_timestamp() {
        let mut task = Task::new("buy milk".to_string(), Uuid::new_v4());
        task.status = TaskStatus::InProgress;

        let decoded: Task = decode(&encode(&task).unwrap()).unwrap();
        assert_eq!(decoded, task);
        assert_eq!(decoded.created_at, task.created_at);
    }

    #[test]
    fn test_keys_use_entity_prefix() {
        let user = User::new("al".to_string(), "x".to_string());
        assert_eq!(user.key(), format!("user:{}", user.id));
        assert_eq!(key_for::<Task>("abc"), "todo:abc");
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        let result: Result<User, _> = decode(b"{\"id\": \"not-json");
        assert!(matches!(result, Err(CodecError::Decode { entity: "user", .. })));
    }

    #[test]
    fn test_missing_field_is_decode_error() {
        let payload = format!("{{\"id\":\"{}\",\"username\":\"al\"}}", Uuid::new_v4());
        let result: Result<User, _> = decode(payload.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_status_is_decode_error() {
        let payload = format!(
            "{{\"id\":\"{}\",\"task\":\"t\",\"status\":\"archived\",\"user_id\":\"{}\",\"created_at\":\"2024-01-01T00:00:00Z\"}}",
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let result: Result<Task, _> = decode(payload.as_bytes());
        assert!(matches!(result, Err(CodecError::Decode { entity: "task", .. })));
    }
}

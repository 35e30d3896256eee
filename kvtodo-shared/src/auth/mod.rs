/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Bearer token issuance and verification
/// - [`identity`]: Registration and login on top of the user repository
/// - [`middleware`]: Axum middleware attaching an [`AuthContext`](middleware::AuthContext)
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use kvtodo_shared::auth::identity::IdentityService;
/// use kvtodo_shared::auth::jwt::TokenService;
/// use kvtodo_shared::auth::password::HashParams;
/// use kvtodo_shared::models::user::User;
/// use kvtodo_shared::repository::KvRepository;
/// use kvtodo_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let users: KvRepository<User> = KvRepository::new(Arc::new(MemoryStore::new()));
/// let tokens = Arc::new(TokenService::new("an-example-secret-of-at-least-32-bytes!", 24)?);
/// let identity = IdentityService::new(Arc::new(users), tokens.clone(), HashParams::default());
///
/// let session = identity.register("al", "p1").await?;
/// assert!(tokens.verify(&session.token.token).is_ok());
/// # Ok(())
/// # }
/// ```

pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;

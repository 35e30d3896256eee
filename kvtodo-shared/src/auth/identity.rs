/// Registration and login
///
/// Built on [`UserRepository`] and [`TokenService`]; both are injected, so the
/// service holds no global state.
///
/// # Username uniqueness
///
/// Registration first scans existing users for the name (this also covers
/// users stored before claim keys existed), then claims `username:{name}`
/// with `SETNX`. Only the registration that wins the claim writes a user
/// record, so concurrent registrations of one name cannot both succeed. If
/// that write fails the claim is released, and the name can be registered
/// again.
///
/// # Legacy passwords
///
/// A user record whose `password` is not a PHC hash holds a plaintext
/// password. It is compared directly once, and on success the record is
/// rewritten with a hash.

use std::sync::Arc;

use super::jwt::{IssuedToken, TokenError, TokenService};
use super::password::{self, HashParams, PasswordError};
use crate::models::user::User;
use crate::repository::{RepositoryError, UserRepository};

/// Identity service errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Rejected input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Username is taken
    #[error("User already exists")]
    AlreadyExists,

    /// Unknown user or wrong password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Storage failure
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Hashing failure
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Token signing failure
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Result of a successful registration or login
#[derive(Debug, Clone)]
pub struct Session {
    /// Authenticated user
    pub user: User,

    /// Token issued for the user
    pub token: IssuedToken,
}

/// Registers and authenticates users
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    hash_params: HashParams,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        hash_params: HashParams,
    ) -> Self {
        Self {
            users,
            tokens,
            hash_params,
        }
    }

    /// Creates a user and issues a token for it
    ///
    /// # Errors
    ///
    /// - `Validation` if `username` or `password` is empty
    /// - `AlreadyExists` if the username is taken
    pub async fn register(&self, username: &str, password: &str) -> Result<Session, IdentityError> {
        require_credentials(username, password)?;

        let existing = self.users.list_users().await?;
        if existing.iter().any(|u| u.username == username) {
            tracing::debug!(username = %username, "Registration rejected: username taken");
            return Err(IdentityError::AlreadyExists);
        }

        let hash = self.hash(password).await?;
        let user = User::new(username.to_string(), hash);

        if !self.users.claim_username(username, user.id).await? {
            tracing::debug!(username = %username, "Registration lost username claim");
            return Err(IdentityError::AlreadyExists);
        }

        if let Err(e) = self.users.create_user(&user).await {
            if let Err(release_err) = self.users.release_username(username, user.id).await {
                tracing::warn!(
                    username = %username,
                    error = %release_err,
                    "Failed to release username claim; it expires with its lease"
                );
            }
            return Err(e.into());
        }

        let token = self.tokens.issue(&user)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(Session { user, token })
    }

    /// Checks credentials and issues a token
    ///
    /// Unknown usernames and wrong passwords both yield
    /// `InvalidCredentials`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        require_credentials(username, password)?;

        let candidates: Vec<User> = self
            .users
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.username == username)
            .collect();

        for mut user in candidates {
            if !self.check_password(&mut user, password).await? {
                continue;
            }

            let token = self.tokens.issue(&user)?;
            tracing::info!(user_id = %user.id, "User logged in");
            return Ok(Session { user, token });
        }

        tracing::warn!(username = %username, "Failed login attempt");
        Err(IdentityError::InvalidCredentials)
    }

    /// Verifies `password` against `user`, upgrading a plaintext record
    async fn check_password(&self, user: &mut User, password: &str) -> Result<bool, IdentityError> {
        if password::is_password_hash(&user.password) {
            let stored = user.password.clone();
            let candidate = password.to_string();
            return match blocking(move || password::verify_password(&candidate, &stored)).await {
                Err(IdentityError::Password(e @ PasswordError::VerifyError(_))) => {
                    tracing::warn!(
                        user_id = %user.id,
                        error = %e,
                        "Stored password hash unusable"
                    );
                    Ok(false)
                }
                result => result,
            };
        }

        if user.password != password {
            return Ok(false);
        }

        user.password = self.hash(password).await?;
        self.users.save_user(user).await?;
        tracing::info!(user_id = %user.id, "Upgraded plaintext password to hash");

        Ok(true)
    }

    async fn hash(&self, password: &str) -> Result<String, IdentityError> {
        let params = self.hash_params;
        let password = password.to_string();
        blocking(move || password::hash_password(&password, &params)).await
    }
}

fn require_credentials(username: &str, password: &str) -> Result<(), IdentityError> {
    if username.is_empty() || password.is_empty() {
        return Err(IdentityError::Validation(
            "Missing required fields".to_string(),
        ));
    }
    Ok(())
}

/// Runs an Argon2 operation off the async worker threads
async fn blocking<T, F>(f: F) -> Result<T, IdentityError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
        .map_err(IdentityError::from)
}

/// Bearer token issuance and verification
///
/// Tokens are HS256-signed JWTs. The signing secret and lifetime live in a
/// [`TokenService`] built once at startup and shared by the handlers; there
/// is no global key.
///
/// # Security
///
/// - **Algorithm**: HS256 only. A token whose header names any other
///   algorithm is rejected before the signature is looked at.
/// - **Expiration**: 24 hours by default, no leeway
/// - **Issuer**: always `kvtodo`, checked on verification
/// - **Errors**: every verification failure is reported as
///   [`TokenError::Invalid`]; the concrete reason is only logged
/// - **Revocation**: none, a token is valid until it expires
///
/// # Example
///
/// ```
/// use kvtodo_shared::auth::jwt::TokenService;
/// use kvtodo_shared::models::user::User;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenService::new("an-example-secret-of-at-least-32-bytes!", 24)?;
/// let user = User::new("al".to_string(), "hash".to_string());
///
/// let issued = tokens.issue(&user)?;
/// let claims = tokens.verify(&issued.token)?;
/// assert_eq!(claims.user_id, user.id);
/// # Ok(())
/// # }
/// ```

use crate::models::user::User;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "kvtodo";

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime in hours
pub const DEFAULT_EXPIRATION_HOURS: i64 = 24;

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signing secret rejected at construction
    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    /// Failed to sign a token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token failed verification (signature, algorithm, expiry, format...)
    #[error("Invalid or expired token")]
    Invalid,
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "kvtodo")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
///
/// # Custom Claims
///
/// - `username`: Login name at issuance time
/// - `user_id`: User ID, same value as `sub`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: String,

    /// Issuer - Always "kvtodo"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Username (custom claim)
    pub username: String,

    /// User ID (custom claim)
    pub user_id: Uuid,
}

impl Claims {
    /// Builds claims for `user`, valid from now for `ttl`
    pub fn for_user(user: &User, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + ttl;

        Self {
            sub: user.id.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            username: user.username.clone(),
            user_id: user.id,
        }
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Serialized JWT
    pub token: String,

    /// Claims that were signed
    pub claims: Claims,
}

/// Signs and verifies bearer tokens with one symmetric secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    /// Creates a token service
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidSecret` if `secret` is shorter than
    /// [`MIN_SECRET_LEN`] bytes or `expiration_hours` is not positive
    pub fn new(secret: &str, expiration_hours: i64) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::InvalidSecret(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if expiration_hours <= 0 {
            return Err(TokenError::InvalidSecret(
                "token lifetime must be positive".to_string(),
            ));
        }

        Ok(Self::with_ttl(secret, Duration::hours(expiration_hours)))
    }

    fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user`
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        self.sign(Claims::for_user(user, self.ttl))
    }

    /// Signs arbitrary claims with HS256
    pub fn sign(&self, claims: Claims) -> Result<IssuedToken, TokenError> {
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::CreateError(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verifies a token and returns its claims
    ///
    /// Checks, in order: header algorithm is HS256, signature, `exp` is in
    /// the future (zero leeway), issuer is `kvtodo`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(reason = %e, "Token rejected");
            TokenError::Invalid
        })?;

        // `exp == now` passes the library check with zero leeway
        if data.claims.is_expired() {
            tracing::debug!(exp = data.claims.exp, "Token rejected: expired");
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-bytes";

    fn service() -> TokenService {
        TokenService::new(SECRET, DEFAULT_EXPIRATION_HOURS).unwrap()
    }

    fn user() -> User {
        User::new("al".to_string(), "hash".to_string())
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let user = user();

        let issued = tokens.issue(&user).unwrap();
        let claims = tokens.verify(&issued.token).unwrap();

        assert_eq!(claims.username, "al");
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_default_expiration_is_24_hours() {
        let issued = service().issue(&user()).unwrap();
        assert_eq!(issued.claims.exp - issued.claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let tokens = service();
        let claims = Claims::for_user(&user(), Duration::seconds(-10));
        let issued = tokens.sign(claims).unwrap();

        assert!(matches!(
            tokens.verify(&issued.token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_token_expiring_now_is_invalid() {
        let tokens = service();
        let mut claims = Claims::for_user(&user(), Duration::zero());
        claims.exp = Utc::now().timestamp();
        let issued = tokens.sign(claims).unwrap();

        assert!(tokens.verify(&issued.token).is_err());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issued = service().issue(&user()).unwrap();
        let other = TokenService::new("another-secret-key-that-is-32-bytes-long", 24).unwrap();

        assert!(matches!(other.verify(&issued.token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_wrong_issuer_is_invalid() {
        let tokens = service();
        let mut claims = Claims::for_user(&user(), Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let issued = tokens.sign(claims).unwrap();

        assert!(matches!(tokens.verify(&issued.token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_other_algorithm_is_invalid() {
        let claims = Claims::for_user(&user(), Duration::hours(1));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_unsigned_token_is_invalid() {
        // {"alg":"none","typ":"JWT"}
        let none_header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        let issued = service().issue(&user()).unwrap();
        let payload = issued.token.split('.').nth(1).unwrap();
        let token = format!("{}.{}.", none_header, payload);

        assert!(matches!(service().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let tokens = service();
        for token in ["", "not-a-token", "a.b.c", "Bearer x"] {
            assert!(matches!(tokens.verify(token), Err(TokenError::Invalid)));
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            TokenService::new("too-short", 24),
            Err(TokenError::InvalidSecret(_))
        ));
        assert!(matches!(
            TokenService::new(SECRET, 0),
            Err(TokenError::InvalidSecret(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", service());
        assert!(!debug.contains(SECRET));
    }
}

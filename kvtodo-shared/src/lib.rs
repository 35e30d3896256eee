//! # kvtodo Shared Library
//!
//! Persistence and identity core of the kvtodo task tracker, used by the API
//! server.
//!
//! ## Module Organization
//!
//! - `store`: Key-value gateway (Redis and in-memory)
//! - `codec`: JSON record encoding and key naming
//! - `models`: Users and tasks
//! - `repository`: Prefix-scan repositories over the gateway
//! - `auth`: Password hashing, bearer tokens, registration and login

pub mod auth;
pub mod codec;
pub mod models;
pub mod repository;
pub mod store;

/// Current version of the kvtodo shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

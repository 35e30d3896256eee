/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, validate)
/// - `todo`: Task endpoints (create, list, update status)

pub mod auth;
pub mod health;
pub mod todo;

//! # kvtodo API Server Library
//!
//! HTTP surface of the kvtodo task tracker. Handlers are thin: they decode
//! the request, check the caller against the bearer token and delegate to
//! the services in `kvtodo-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;

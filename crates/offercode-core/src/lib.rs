//! Shared plumbing for offercode services: configuration, tracing, middleware
//! and health endpoints.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;

//! Test utilities for offercode services.
//!
//! Provides an in-process fake code issuer, a recording HTTP sink for outbound
//! notifications, and a throwaway ES256 key pair.
//! Use from `[dev-dependencies]` only.

pub mod issuer;
pub mod keys;
pub mod sink;

pub use issuer::{FakeIssuer, IssuerBehaviour};
pub use sink::RecordingSink;

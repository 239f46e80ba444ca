//! Authorization layer.
//!
//! # Responsibility
//! - Pure view/object access predicates and their lookup-table presets.
//! - Explicit per-request context passed to every service call.
//!
//! # Invariants
//! - No ambient request state: identity and action always arrive as
//!   arguments.

pub mod access;
pub mod request;

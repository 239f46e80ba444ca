//! Domain records shared by policy, query and service layers.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Timestamps are Unix epoch milliseconds.
//! - Ownership is exposed only through [`resource::OwnedResource`].

pub mod book;
pub mod identity;
pub mod notification;
pub mod post;
pub mod resource;

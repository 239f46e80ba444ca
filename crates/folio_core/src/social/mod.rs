//! Directed follow relation between users.
//!
//! # Invariants
//! - No self-edges.
//! - At most one edge per ordered `(follower, followee)` pair.

pub mod follow_graph;

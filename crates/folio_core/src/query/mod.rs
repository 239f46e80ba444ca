//! Query-parameter driven list composition.
//!
//! # Responsibility
//! - Declare per-collection filter/search/ordering vocabularies.
//! - Compose raw parameters into an order-independent [`QuerySpec`].
//! - Render a `QuerySpec` into SQL fragments for the SQLite repositories.
//!
//! # Invariants
//! - Invalid filter values fail with `Validation`; invalid ordering terms
//!   degrade to the collection default.
//! - Composition never depends on parameter map iteration order.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

pub mod composer;
pub mod config;
pub mod page;
pub mod presets;
pub mod sql;

/// Raw query-string parameters, last value wins per key.
pub type QueryParams = BTreeMap<String, String>;

/// Read access to raw parameters, whatever map holds them.
pub trait ParamLookup {
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl ParamLookup for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl<S: BuildHasher> ParamLookup for HashMap<String, String, S> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// Builds [`QueryParams`] from string pairs.
pub fn query_params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

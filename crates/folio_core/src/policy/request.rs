//! Explicit per-request context.

use crate::error::CoreResult;
use crate::model::identity::Identity;
use crate::policy::access::{Method, ViewAction};
use crate::query::QueryParams;

/// Everything the core reads from one inbound request.
///
/// Built once at the boundary; the action is resolved there and never
/// re-derived downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: Method,
    pub identity: Identity,
    pub action: ViewAction,
    pub query: QueryParams,
}

impl RequestContext {
    pub fn new(method: Method, identity: Identity, action: ViewAction) -> Self {
        Self {
            method,
            identity,
            action,
            query: QueryParams::new(),
        }
    }

    /// Context for a standard collection or detail route.
    pub fn route(method: Method, identity: Identity, detail: bool) -> Self {
        Self::new(method, identity, ViewAction::resolve(method, detail))
    }

    /// Context from a raw method name, as received off the wire.
    pub fn parse(method: &str, identity: Identity, detail: bool) -> CoreResult<Self> {
        Ok(Self::route(Method::parse(method)?, identity, detail))
    }

    /// `GET` on a collection.
    pub fn list(identity: Identity) -> Self {
        Self::route(Method::Get, identity, false)
    }

    /// `GET` on one object.
    pub fn retrieve(identity: Identity) -> Self {
        Self::route(Method::Get, identity, true)
    }

    /// `POST` on a collection.
    pub fn create(identity: Identity) -> Self {
        Self::route(Method::Post, identity, false)
    }

    /// `PUT` on one object.
    pub fn update(identity: Identity) -> Self {
        Self::route(Method::Put, identity, true)
    }

    /// `PATCH` on one object.
    pub fn partial_update(identity: Identity) -> Self {
        Self::route(Method::Patch, identity, true)
    }

    /// `DELETE` on one object.
    pub fn destroy(identity: Identity) -> Self {
        Self::route(Method::Delete, identity, true)
    }

    /// Named extra action.
    pub fn custom(method: Method, identity: Identity, name: &str) -> Self {
        Self::new(method, identity, ViewAction::custom(name))
    }

    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }
}

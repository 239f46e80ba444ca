//! View- and object-level access decisions.
//!
//! # Responsibility
//! - Decide `allow` from method, action, identity and resource ownership.
//! - Turn a denial into [`CoreError::Authorization`] before any mutation runs.
//!
//! # Invariants
//! - Every predicate is a pure function of its arguments.
//! - Safe methods (`GET|HEAD|OPTIONS`) pass every view and object check
//!   unless a policy explicitly guards reads.

use crate::error::{CoreError, CoreResult};
use crate::model::identity::Identity;
use crate::model::resource::OwnedResource;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// HTTP-like request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Parses a method name, case-insensitively.
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(CoreError::validation(
                "method",
                format!("unsupported method `{other}`"),
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Read-only verbs that never need write authorization.
    pub fn is_safe(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

/// Handler action, resolved once per request at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewAction {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    /// Named extra action such as `duplicate_book`.
    Custom(String),
}

impl ViewAction {
    /// Maps a method on a collection (`detail = false`) or on one object
    /// (`detail = true`) to its standard action.
    pub fn resolve(method: Method, detail: bool) -> Self {
        match (method, detail) {
            (Method::Get | Method::Head | Method::Options, false) => Self::List,
            (Method::Get | Method::Head | Method::Options, true) => Self::Retrieve,
            (Method::Post, _) => Self::Create,
            (Method::Put, _) => Self::Update,
            (Method::Patch, _) => Self::PartialUpdate,
            (Method::Delete, _) => Self::Destroy,
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::List => "list",
            Self::Retrieve => "retrieve",
            Self::Create => "create",
            Self::Update => "update",
            Self::PartialUpdate => "partial_update",
            Self::Destroy => "destroy",
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl Display for ViewAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Requirement one identity must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    AllowAny,
    Authenticated,
    /// Authenticated and staff.
    Staff,
}

impl AccessRule {
    pub fn allows(self, identity: &Identity) -> bool {
        match self {
            Self::AllowAny => true,
            Self::Authenticated => identity.is_authenticated,
            Self::Staff => identity.is_authenticated && identity.is_staff,
        }
    }
}

/// View-level permission: one rule for safe methods and a lookup table
/// from write action to rule, with a fallback for unlisted actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPolicy {
    name: &'static str,
    read: AccessRule,
    writes: Vec<(ViewAction, AccessRule)>,
    fallback_write: AccessRule,
}

impl ViewPolicy {
    pub fn new(name: &'static str, read: AccessRule, fallback_write: AccessRule) -> Self {
        Self {
            name,
            read,
            writes: Vec::new(),
            fallback_write,
        }
    }

    /// Adds or replaces the rule for one write action.
    pub fn with_write(mut self, action: ViewAction, rule: AccessRule) -> Self {
        self.writes.retain(|(existing, _)| *existing != action);
        self.writes.push((action, rule));
        self
    }

    /// Book catalog rules: anyone reads; create/update need a login;
    /// destroy needs staff; other writes need a login.
    pub fn book_actions() -> Self {
        Self::new("book_actions", AccessRule::AllowAny, AccessRule::Authenticated)
            .with_write(ViewAction::Create, AccessRule::Authenticated)
            .with_write(ViewAction::Update, AccessRule::Authenticated)
            .with_write(ViewAction::PartialUpdate, AccessRule::Authenticated)
            .with_write(ViewAction::Destroy, AccessRule::Staff)
    }

    pub fn authenticated_or_read_only() -> Self {
        Self::new(
            "authenticated_or_read_only",
            AccessRule::AllowAny,
            AccessRule::Authenticated,
        )
    }

    pub fn admin_or_read_only() -> Self {
        Self::new("admin_or_read_only", AccessRule::AllowAny, AccessRule::Staff)
    }

    /// Every request, reads included, needs a login.
    pub fn authenticated() -> Self {
        Self::new(
            "authenticated",
            AccessRule::Authenticated,
            AccessRule::Authenticated,
        )
    }

    pub fn allow_any() -> Self {
        Self::new("allow_any", AccessRule::AllowAny, AccessRule::AllowAny)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rule applied to `action` under `method`.
    pub fn rule_for(&self, method: Method, action: &ViewAction) -> AccessRule {
        if method.is_safe() {
            return self.read;
        }
        self.writes
            .iter()
            .find(|(candidate, _)| candidate == action)
            .map_or(self.fallback_write, |(_, rule)| *rule)
    }

    pub fn allows(&self, method: Method, identity: &Identity, action: &ViewAction) -> bool {
        self.rule_for(method, action).allows(identity)
    }

    /// Fails with `Authorization` when the policy denies the request.
    pub fn authorize(
        &self,
        method: Method,
        identity: &Identity,
        action: &ViewAction,
    ) -> CoreResult<()> {
        if self.allows(method, identity, action) {
            return Ok(());
        }
        warn!(
            "event=access_denied module=policy status=denied scope=view policy={} method={} action={} authenticated={} staff={}",
            self.name,
            method.as_str(),
            action,
            identity.is_authenticated,
            identity.is_staff
        );
        Err(CoreError::Authorization {
            action: action.to_string(),
        })
    }
}

/// How object-level write access is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipMode {
    /// The caller must be the resource owner.
    #[default]
    Owner,
    /// Any authenticated caller may write.
    AuthenticatedOnly,
}

/// Object-level permission for writes on one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPolicy {
    pub ownership: OwnershipMode,
    /// Staff may destroy resources they do not own.
    pub staff_may_delete: bool,
}

impl Default for ObjectPolicy {
    fn default() -> Self {
        Self::owner()
    }
}

impl ObjectPolicy {
    pub fn owner() -> Self {
        Self {
            ownership: OwnershipMode::Owner,
            staff_may_delete: true,
        }
    }

    pub fn authenticated_only() -> Self {
        Self {
            ownership: OwnershipMode::AuthenticatedOnly,
            staff_may_delete: true,
        }
    }

    pub fn from_mode(ownership: OwnershipMode) -> Self {
        Self {
            ownership,
            staff_may_delete: true,
        }
    }

    pub fn allows<R: OwnedResource + ?Sized>(
        &self,
        method: Method,
        identity: &Identity,
        resource: &R,
    ) -> bool {
        if method.is_safe() {
            return true;
        }
        if !identity.is_authenticated {
            return false;
        }
        if method == Method::Delete && self.staff_may_delete && identity.is_staff {
            return true;
        }
        match (self.ownership, resource.owner_id()) {
            (OwnershipMode::AuthenticatedOnly, _) => true,
            // Nothing to compare against: unowned records only need a login.
            (OwnershipMode::Owner, None) => true,
            (OwnershipMode::Owner, Some(owner)) => identity.id == Some(owner),
        }
    }

    /// Fails with `Authorization` when `identity` may not write `resource`.
    pub fn authorize<R: OwnedResource + ?Sized>(
        &self,
        method: Method,
        identity: &Identity,
        resource: &R,
        action: &ViewAction,
    ) -> CoreResult<()> {
        if self.allows(method, identity, resource) {
            return Ok(());
        }
        warn!(
            "event=access_denied module=policy status=denied scope=object method={} action={} authenticated={} owner_match=false",
            method.as_str(),
            action,
            identity.is_authenticated
        );
        Err(CoreError::Authorization {
            action: action.to_string(),
        })
    }
}

/// Book catalog view check.
///
/// Safe methods always pass; `destroy` needs an authenticated staff
/// identity; every other write needs an authenticated identity.
pub fn can_access_view(method: Method, identity: &Identity, action: &ViewAction) -> bool {
    ViewPolicy::book_actions().allows(method, identity, action)
}

/// Object check under the default owner-comparison policy.
pub fn can_access_object<R: OwnedResource + ?Sized>(
    method: Method,
    identity: &Identity,
    resource: &R,
) -> bool {
    ObjectPolicy::default().allows(method, identity, resource)
}

/// [`can_access_view`] as a `Result`, logging denials.
pub fn authorize_view(method: Method, identity: &Identity, action: &ViewAction) -> CoreResult<()> {
    ViewPolicy::book_actions().authorize(method, identity, action)
}

/// [`can_access_object`] as a `Result`, logging denials.
pub fn authorize_object<R: OwnedResource + ?Sized>(
    method: Method,
    identity: &Identity,
    resource: &R,
    action: &ViewAction,
) -> CoreResult<()> {
    ObjectPolicy::default().authorize(method, identity, resource, action)
}

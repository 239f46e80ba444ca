//! Request-level use-case services.
//!
//! # Responsibility
//! - Run the access check for each call before touching storage.
//! - Turn request parameters into paged repository queries.
//! - Emit notifications for social domain events.
//!
//! # Invariants
//! - A denied request performs no write.
//! - Ids referenced by list filters must resolve, otherwise `Validation`.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::UserId;
use crate::policy::access::ViewPolicy;
use crate::policy::request::RequestContext;
use crate::query::composer::compose;
use crate::query::config::CollectionConfig;
use crate::query::page::PageRequest;
use crate::query::sql::SqlPlan;
use crate::repo::ReferenceLookup;
use log::info;

pub mod account_service;
pub mod book_service;
pub mod notification_service;
pub mod post_service;

/// Page-size bounds applied to list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self::from(&CoreConfig::default())
    }
}

impl From<&CoreConfig> for ListSettings {
    fn from(value: &CoreConfig) -> Self {
        let (default_page_size, max_page_size) = value.list_settings();
        Self {
            default_page_size,
            max_page_size,
        }
    }
}

/// Authorizes `ctx` under `policy` and returns the caller's user id.
pub(crate) fn require_user(ctx: &RequestContext, policy: &ViewPolicy) -> CoreResult<UserId> {
    policy.authorize(ctx.method, &ctx.identity, &ctx.action)?;
    ctx.identity
        .authenticated_id()
        .ok_or_else(|| CoreError::Authorization {
            action: ctx.action.to_string(),
        })
}

/// Composes the request's query parameters into a rendered plan and page.
pub(crate) fn plan_list<L>(
    ctx: &RequestContext,
    collection: &CollectionConfig,
    refs: &L,
    settings: ListSettings,
) -> CoreResult<(SqlPlan, PageRequest)>
where
    L: ReferenceLookup + ?Sized,
{
    let spec = compose(&ctx.query, collection).map_err(|err| {
        if let CoreError::Validation(inner) = &err {
            info!(
                "event=query_rejected module=query status=error collection={} field={}",
                collection.name, inner.field
            );
        }
        err
    })?;

    for (table, id, param) in spec.referenced_ids() {
        if !refs.reference_exists(table, id)? {
            info!(
                "event=query_rejected module=query status=error collection={} field={param} reason=unknown_reference",
                collection.name
            );
            return Err(CoreError::validation(
                param,
                format!("no record matches `{id}`"),
            ));
        }
    }

    let page = PageRequest::from_params(
        &ctx.query,
        settings.default_page_size,
        settings.max_page_size,
    )?;
    Ok((SqlPlan::render(&spec, collection), page))
}

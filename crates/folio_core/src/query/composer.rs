//! Raw parameters to [`QuerySpec`].
//!
//! # Invariants
//! - Filters are produced in the collection's declared parameter order.
//! - Blank parameter values are ignored, never rejected.
//! - Ordering always resolves to at least the collection default.

use crate::error::{CoreError, CoreResult};
use crate::query::config::{CollectionConfig, FieldDef, FilterKind, ValueKind};
use crate::query::ParamLookup;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static ORDERING_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?)([A-Za-z_][A-Za-z0-9_]*)$").expect("valid ordering regex"));

/// Field name paired with its SQL expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub name: &'static str,
    pub column: &'static str,
}

impl From<&FieldDef> for FieldRef {
    fn from(value: &FieldDef) -> Self {
        Self {
            name: value.name,
            column: value.column,
        }
    }
}

/// Parsed exact-match value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Integer(i64),
    Text(String),
    Id(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactFilter {
    /// Parameter the value came from.
    pub param: &'static str,
    pub field: FieldRef,
    pub value: FilterValue,
    /// Table the id must exist in, checked by the caller before execution.
    pub references: Option<&'static str>,
}

/// Inclusive integer range; either bound may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFilter {
    pub field: FieldRef,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl RangeFilter {
    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Prefix,
    Contains,
}

/// Case-insensitive text predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringFilter {
    pub field: FieldRef,
    pub mode: MatchMode,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: FieldRef,
    pub direction: Direction,
}

/// Order-independent filter/search/sort plan for one list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pub exact_filters: Vec<ExactFilter>,
    pub range_filters: Vec<RangeFilter>,
    pub string_filters: Vec<StringFilter>,
    /// Trimmed search text; `None` when absent or blank.
    pub search_term: Option<String>,
    pub search_fields: Vec<FieldRef>,
    pub order_by: Vec<OrderTerm>,
    /// `true` when a supplied ordering had no usable term.
    pub ordering_fell_back: bool,
}

impl QuerySpec {
    /// Search words; every word must match at least one search field.
    pub fn search_terms(&self) -> Vec<&str> {
        self.search_term
            .as_deref()
            .map(|term| {
                term.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|word| !word.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `(table, id, param)` triples the caller must resolve before running the query.
    pub fn referenced_ids(&self) -> Vec<(&'static str, Uuid, &'static str)> {
        self.exact_filters
            .iter()
            .filter_map(|filter| match (&filter.value, filter.references) {
                (FilterValue::Id(id), Some(table)) => Some((table, *id, filter.param)),
                _ => None,
            })
            .collect()
    }

    pub fn has_filters(&self) -> bool {
        !self.exact_filters.is_empty()
            || !self.range_filters.is_empty()
            || !self.string_filters.is_empty()
            || !self.search_terms().is_empty()
    }
}

/// Composes `params` under `config`.
///
/// # Errors
/// - `Validation` when an exact or range value does not parse for its field.
/// - `Config` when `config` references undeclared fields.
pub fn compose<P>(params: &P, config: &CollectionConfig) -> CoreResult<QuerySpec>
where
    P: ParamLookup + ?Sized,
{
    let mut spec = QuerySpec::default();

    for rule in &config.params {
        let Some(raw) = non_blank(params.lookup(rule.param)) else {
            continue;
        };
        let field = config.field_def(rule.field).ok_or_else(|| {
            config.misconfigured(format!(
                "param `{}` maps to unknown field `{}`",
                rule.param, rule.field
            ))
        })?;

        match rule.kind {
            FilterKind::Exact => spec.exact_filters.push(ExactFilter {
                param: rule.param,
                field: field.into(),
                value: parse_value(rule.param, raw, field.kind)?,
                references: field.references,
            }),
            FilterKind::RangeLower | FilterKind::RangeUpper => {
                let bound = parse_integer(rule.param, raw)?;
                merge_range(&mut spec.range_filters, field.into(), rule.kind, bound);
            }
            FilterKind::Prefix | FilterKind::Contains => spec.string_filters.push(StringFilter {
                field: field.into(),
                mode: if rule.kind == FilterKind::Prefix {
                    MatchMode::Prefix
                } else {
                    MatchMode::Contains
                },
                value: raw.to_string(),
            }),
        }
    }

    if !config.search_fields.is_empty() {
        spec.search_term = non_blank(params.lookup(config.search_param)).map(str::to_string);
        spec.search_fields = resolve_fields(config, &config.search_fields)?;
    }

    let (order_by, fell_back) = resolve_ordering(params.lookup(config.ordering_param), config);
    spec.order_by = order_by;
    spec.ordering_fell_back = fell_back;

    debug!(
        "event=query_compose module=query status=ok collection={} exact={} range={} text={} search={} order_terms={}",
        config.name,
        spec.exact_filters.len(),
        spec.range_filters.len(),
        spec.string_filters.len(),
        spec.search_term.is_some(),
        spec.order_by.len()
    );
    Ok(spec)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_value(param: &str, raw: &str, kind: ValueKind) -> CoreResult<FilterValue> {
    match kind {
        ValueKind::Integer => parse_integer(param, raw).map(FilterValue::Integer),
        ValueKind::Text => Ok(FilterValue::Text(raw.to_string())),
        ValueKind::Id => Uuid::parse_str(raw)
            .map(FilterValue::Id)
            .map_err(|_| CoreError::validation(param, "expected a valid identifier")),
    }
}

fn parse_integer(param: &str, raw: &str) -> CoreResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| CoreError::validation(param, "expected a whole number"))
}

fn merge_range(ranges: &mut Vec<RangeFilter>, field: FieldRef, kind: FilterKind, bound: i64) {
    let index = match ranges.iter().position(|range| range.field == field) {
        Some(index) => index,
        None => {
            ranges.push(RangeFilter {
                field,
                min: None,
                max: None,
            });
            ranges.len() - 1
        }
    };
    let range = &mut ranges[index];
    // Several bounds on one side are AND-ed, so the tighter one wins.
    if kind == FilterKind::RangeLower {
        range.min = Some(range.min.map_or(bound, |current| current.max(bound)));
    } else {
        range.max = Some(range.max.map_or(bound, |current| current.min(bound)));
    }
}

fn resolve_fields(config: &CollectionConfig, names: &[&'static str]) -> CoreResult<Vec<FieldRef>> {
    names
        .iter()
        .map(|name| {
            config
                .field_def(name)
                .map(FieldRef::from)
                .ok_or_else(|| config.misconfigured(format!("unknown search field `{name}`")))
        })
        .collect()
}

fn resolve_ordering(raw: Option<&str>, config: &CollectionConfig) -> (Vec<OrderTerm>, bool) {
    let defaults = || parse_ordering(config.default_ordering, config).0;

    let Some(raw) = non_blank(raw) else {
        return (defaults(), false);
    };

    let (terms, dropped) = parse_ordering(raw, config);
    if terms.is_empty() {
        info!(
            "event=ordering_fallback module=query status=ok collection={} dropped_terms={}",
            config.name, dropped
        );
        return (defaults(), true);
    }
    if dropped > 0 {
        info!(
            "event=ordering_terms_dropped module=query status=ok collection={} dropped_terms={} kept_terms={}",
            config.name,
            dropped,
            terms.len()
        );
    }
    (terms, false)
}

/// Parses `a,-b` into order terms, returning how many terms were unusable.
fn parse_ordering(raw: &str, config: &CollectionConfig) -> (Vec<OrderTerm>, usize) {
    let mut terms: Vec<OrderTerm> = Vec::new();
    let mut dropped = 0;

    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let resolved = ORDERING_TERM_RE.captures(token).and_then(|caps| {
            let descending = caps.get(1).is_some_and(|sign| !sign.as_str().is_empty());
            let name = caps.get(2)?.as_str();
            let field = config.orderable_field(name)?;
            Some(OrderTerm {
                field: field.into(),
                direction: if descending {
                    Direction::Desc
                } else {
                    Direction::Asc
                },
            })
        });

        match resolved {
            Some(term) if !terms.iter().any(|seen| seen.field == term.field) => terms.push(term),
            Some(_) => {}
            None => dropped += 1,
        }
    }

    (terms, dropped)
}

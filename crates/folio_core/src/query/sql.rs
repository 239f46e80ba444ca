//! SQL rendering of a [`QuerySpec`].
//!
//! # Invariants
//! - Only column expressions from the collection config reach the SQL text;
//!   every caller-supplied value travels as a bind parameter.
//! - `ORDER BY` always ends with the collection id column, so pagination
//!   over equal sort keys is stable.

use crate::db::functions::{fold, FOLD_FUNCTION};
use crate::query::composer::{Direction, FilterValue, MatchMode, QuerySpec};
use crate::query::config::CollectionConfig;
use rusqlite::types::Value;

/// Rendered `WHERE` / `ORDER BY` fragments with positional binds.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPlan {
    pub where_sql: String,
    pub order_sql: String,
    pub binds: Vec<Value>,
}

impl SqlPlan {
    pub fn render(spec: &QuerySpec, config: &CollectionConfig) -> Self {
        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<Value> = Vec::new();

        for filter in &spec.exact_filters {
            clauses.push(format!("{} = ?", filter.field.column));
            binds.push(match &filter.value {
                FilterValue::Integer(value) => Value::Integer(*value),
                FilterValue::Text(value) => Value::Text(value.clone()),
                FilterValue::Id(value) => Value::Text(value.to_string()),
            });
        }

        for range in &spec.range_filters {
            if let Some(min) = range.min {
                clauses.push(format!("{} >= ?", range.field.column));
                binds.push(Value::Integer(min));
            }
            if let Some(max) = range.max {
                clauses.push(format!("{} <= ?", range.field.column));
                binds.push(Value::Integer(max));
            }
        }

        for filter in &spec.string_filters {
            let escaped = escape_like(&fold(&filter.value));
            let pattern = match filter.mode {
                MatchMode::Prefix => format!("{escaped}%"),
                MatchMode::Contains => format!("%{escaped}%"),
            };
            clauses.push(like_clause(filter.field.column));
            binds.push(Value::Text(pattern));
        }

        if !spec.search_fields.is_empty() {
            for term in spec.search_terms() {
                let pattern = format!("%{}%", escape_like(&fold(term)));
                let any_field: Vec<String> = spec
                    .search_fields
                    .iter()
                    .map(|field| {
                        binds.push(Value::Text(pattern.clone()));
                        like_clause(field.column)
                    })
                    .collect();
                clauses.push(format!("({})", any_field.join(" OR ")));
            }
        }

        let where_sql = if clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            clauses.join(" AND ")
        };

        let mut order: Vec<String> = spec
            .order_by
            .iter()
            .map(|term| {
                let direction = match term.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{} {direction}", term.field.column)
            })
            .collect();
        order.push(format!("{} ASC", config.id_column));

        Self {
            where_sql,
            order_sql: order.join(", "),
            binds,
        }
    }
}

// Both sides are folded; the bind is folded in Rust before it is escaped.
fn like_clause(column: &str) -> String {
    format!("{FOLD_FUNCTION}({column}) LIKE ? ESCAPE '\\'")
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

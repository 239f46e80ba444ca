//! Declarative collection vocabularies.

use crate::error::{CoreError, CoreResult};

/// How a raw parameter value is parsed for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Text,
    /// UUID reference to another record.
    Id,
}

/// One filterable/sortable/searchable column of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    /// SQL expression evaluated against the collection's base select.
    pub column: &'static str,
    pub kind: ValueKind,
    /// Table an `Id` value must exist in.
    pub references: Option<&'static str>,
    /// Extra names accepted in `ordering`, e.g. `author__name`.
    pub aliases: &'static [&'static str],
}

impl FieldDef {
    pub const fn new(name: &'static str, column: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            column,
            kind,
            references: None,
            aliases: &[],
        }
    }

    pub const fn integer(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, ValueKind::Integer)
    }

    pub const fn text(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, ValueKind::Text)
    }

    pub const fn id(name: &'static str, column: &'static str) -> Self {
        Self::new(name, column, ValueKind::Id)
    }

    pub const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }

    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// Predicate shape a parameter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Exact,
    /// Inclusive lower bound.
    RangeLower,
    /// Inclusive upper bound.
    RangeUpper,
    /// Case-insensitive prefix.
    Prefix,
    /// Case-insensitive substring.
    Contains,
}

/// Maps one query parameter onto one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRule {
    pub param: &'static str,
    pub field: &'static str,
    pub kind: FilterKind,
}

/// Filter/search/ordering vocabulary of one list endpoint.
///
/// `params` order is the fixed application order of filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: &'static str,
    /// Unique column appended to every ordering as final tiebreaker.
    pub id_column: &'static str,
    pub fields: Vec<FieldDef>,
    pub params: Vec<ParamRule>,
    pub search_param: &'static str,
    pub search_fields: Vec<&'static str>,
    pub ordering_param: &'static str,
    pub ordering_fields: Vec<&'static str>,
    /// Comma-separated default, same syntax as the `ordering` parameter.
    pub default_ordering: &'static str,
}

impl CollectionConfig {
    pub fn new(name: &'static str, id_column: &'static str) -> Self {
        Self {
            name,
            id_column,
            fields: Vec::new(),
            params: Vec::new(),
            search_param: "search",
            search_fields: Vec::new(),
            ordering_param: "ordering",
            ordering_fields: Vec::new(),
            default_ordering: "",
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn param(mut self, param: &'static str, field: &'static str, kind: FilterKind) -> Self {
        self.params.push(ParamRule { param, field, kind });
        self
    }

    pub fn search(mut self, param: &'static str, fields: &[&'static str]) -> Self {
        self.search_param = param;
        self.search_fields = fields.to_vec();
        self
    }

    pub fn ordering(
        mut self,
        param: &'static str,
        fields: &[&'static str],
        default_ordering: &'static str,
    ) -> Self {
        self.ordering_param = param;
        self.ordering_fields = fields.to_vec();
        self.default_ordering = default_ordering;
        self
    }

    /// Field declared under `name` (aliases ignored).
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Orderable field answering to `name` or one of its aliases.
    pub fn orderable_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| {
            field.answers_to(name) && self.ordering_fields.contains(&field.name)
        })
    }

    /// Checks that every rule, search field and ordering entry resolves.
    pub fn validate(&self) -> CoreResult<()> {
        for rule in &self.params {
            let field = self
                .field_def(rule.field)
                .ok_or_else(|| self.misconfigured(format!("param `{}` maps to unknown field `{}`", rule.param, rule.field)))?;
            let ranged = matches!(rule.kind, FilterKind::RangeLower | FilterKind::RangeUpper);
            if ranged && field.kind != ValueKind::Integer {
                return Err(self.misconfigured(format!(
                    "range param `{}` needs an integer field",
                    rule.param
                )));
            }
            let textual = matches!(rule.kind, FilterKind::Prefix | FilterKind::Contains);
            if textual && field.kind != ValueKind::Text {
                return Err(self.misconfigured(format!(
                    "text param `{}` needs a text field",
                    rule.param
                )));
            }
        }
        for name in self.search_fields.iter().chain(self.ordering_fields.iter()) {
            if self.field_def(name).is_none() {
                return Err(self.misconfigured(format!("unknown field `{name}`")));
            }
        }
        for term in self.default_ordering.split(',').map(str::trim) {
            let name = term.trim_start_matches('-');
            if !name.is_empty() && self.orderable_field(name).is_none() {
                return Err(self.misconfigured(format!(
                    "default ordering uses non-orderable field `{name}`"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn misconfigured(&self, detail: String) -> CoreError {
        CoreError::Config(format!("collection `{}`: {detail}", self.name))
    }
}

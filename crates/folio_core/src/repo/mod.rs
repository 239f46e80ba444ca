//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Keep SQL text and row mapping inside the persistence boundary.
//! - Translate store constraint failures into semantic errors.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.
//! - Read paths reject malformed persisted ids instead of masking them.
//! - Listing SQL is assembled only from [`SqlPlan`] fragments and binds.

use crate::db::functions::register_functions;
use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::query::page::{Page, PageRequest};
use crate::query::sql::SqlPlan;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod book_repo;
pub mod notification_repo;
pub mod post_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    /// A uniqueness constraint rejected the write; carries the constraint name.
    UniqueViolation(&'static str),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UniqueViolation(constraint) => {
                write!(f, "unique constraint `{constraint}` violated")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Existence checks for ids referenced by list filters.
pub trait ReferenceLookup {
    fn reference_exists(&self, table: &str, id: Uuid) -> RepoResult<bool>;
}

const REFERENCE_TABLES: &[&str] = &["authors", "books", "posts", "users"];

/// SQLite-backed [`ReferenceLookup`] over a fixed table whitelist.
pub struct SqliteReferenceLookup<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferenceLookup<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ReferenceLookup for SqliteReferenceLookup<'_> {
    fn reference_exists(&self, table: &str, id: Uuid) -> RepoResult<bool> {
        let Some(table) = REFERENCE_TABLES.iter().find(|known| **known == table) else {
            return Err(RepoError::InvalidData(format!(
                "table `{table}` cannot be referenced"
            )));
        };
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    // Listing SQL calls `fold`; a migrated file reopened without `open_db` lacks it.
    register_functions(conn)?;
    Ok(())
}

/// Runs `work` inside one transaction on `conn`; any error rolls back every
/// write `work` made through repositories sharing the connection.
pub(crate) fn run_atomically<T, E, F>(conn: &Connection, work: F) -> Result<T, E>
where
    E: From<RepoError>,
    F: FnOnce() -> Result<T, E>,
{
    let tx = conn.unchecked_transaction().map_err(RepoError::from)?;
    let value = work()?;
    tx.commit().map_err(RepoError::from)?;
    Ok(value)
}

/// Maps unique/primary-key failures to `UniqueViolation(constraint)`.
pub(crate) fn map_write_error(err: rusqlite::Error, constraint: &'static str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(inner, _) = &err {
        let unique = inner.code == ErrorCode::ConstraintViolation
            && matches!(
                inner.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            );
        if unique {
            return RepoError::UniqueViolation(constraint);
        }
    }
    RepoError::from(err)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn uuid_column(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let raw: String = row.get(column)?;
    parse_uuid(&raw, column)
}

pub(crate) fn count_column(row: &Row<'_>, column: &str) -> RepoResult<u64> {
    let raw: i64 = row.get(column)?;
    u64::try_from(raw).map_err(|_| RepoError::InvalidData(format!("negative count in {column}")))
}

/// Runs a paged listing: `SELECT {columns} {from} WHERE .. ORDER BY .. LIMIT .. OFFSET ..`.
pub(crate) fn query_page<T>(
    conn: &Connection,
    columns: &str,
    from: &str,
    plan: &SqlPlan,
    page: PageRequest,
    map_row: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Page<T>> {
    let count_sql = format!("SELECT COUNT(*) {from} WHERE {};", plan.where_sql);
    let total: i64 = conn.query_row(&count_sql, params_from_iter(plan.binds.iter()), |row| {
        row.get(0)
    })?;

    let select_sql = format!(
        "SELECT {columns} {from} WHERE {} ORDER BY {} LIMIT ? OFFSET ?;",
        plan.where_sql, plan.order_sql
    );
    let mut binds: Vec<Value> = plan.binds.clone();
    binds.push(Value::Integer(page.limit()));
    binds.push(Value::Integer(page.offset()));

    let mut stmt = conn.prepare(&select_sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(map_row(row)?);
    }

    Ok(Page {
        items,
        total_count: u64::try_from(total).unwrap_or_default(),
        page: page.page,
        page_size: page.page_size,
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

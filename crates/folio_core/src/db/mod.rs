//! Storage layer for folio: one SQLite file holding the catalog, the social
//! graph and notifications.
//!
//! # Responsibility
//! - Hand out connections that are migrated and enforce foreign keys.
//! - Report storage failures with enough context to tell a broken file from
//!   a failing migration.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last migration applied.
//! - Repositories refuse connections whose migrations have not been applied.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod functions;
pub mod migrations;
mod open;

pub use migrations::{current_version, latest_version};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    /// A single migration script failed; nothing from the batch was kept.
    Migration { version: u32, source: rusqlite::Error },
    /// `PRAGMA foreign_keys` did not stick, so cascades would be skipped.
    ForeignKeysOff,
}

impl DbError {
    /// Short machine-readable tag used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::SchemaTooNew { .. } => "schema_too_new",
            Self::Migration { .. } => "migration",
            Self::ForeignKeysOff => "foreign_keys_off",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "storage error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "folio database is at schema {found} but this build only knows up to {supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "migration {version} failed: {source}")
            }
            Self::ForeignKeysOff => write!(f, "foreign key enforcement could not be enabled"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } | Self::ForeignKeysOff => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

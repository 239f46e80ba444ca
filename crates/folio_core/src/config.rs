//! Runtime configuration for embedders of the core.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid document.
//! - `1 <= page_size_default <= page_size_max`.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::error::{CoreError, CoreResult};
use crate::logging::default_log_level;
use crate::policy::access::{ObjectPolicy, OwnershipMode};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file path; `None` selects an in-memory database.
    pub db_path: Option<String>,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<String>,
    pub ownership: OwnershipMode,
    pub page_size_default: u32,
    pub page_size_max: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            ownership: OwnershipMode::default(),
            page_size_default: DEFAULT_PAGE_SIZE,
            page_size_max: MAX_PAGE_SIZE,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|err| CoreError::Config(format!("malformed config document: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CoreError::Config(format!("cannot read `{}`: {err}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.page_size_default == 0 {
            return Err(CoreError::Config(
                "page_size_default must be at least 1".to_string(),
            ));
        }
        if self.page_size_default > self.page_size_max {
            return Err(CoreError::Config(format!(
                "page_size_default {} exceeds page_size_max {}",
                self.page_size_default, self.page_size_max
            )));
        }
        Ok(())
    }

    /// Opens `db_path`, or a private in-memory database when it is unset.
    pub fn open_database(&self) -> DbResult<Connection> {
        match self.db_path.as_deref() {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Object-level policy for owned resources.
    pub fn object_policy(&self) -> ObjectPolicy {
        ObjectPolicy::from_mode(self.ownership)
    }

    /// `(default, max)` page sizes for list endpoints.
    pub fn list_settings(&self) -> (u32, u32) {
        (self.page_size_default, self.page_size_max)
    }
}

//! Application SQL functions registered on every connection.
//!
//! SQLite's built-in `LIKE`, `lower()` and `upper()` fold ASCII only, so text
//! matching goes through `fold(x)` instead.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the Unicode lowercase SQL function.
pub const FOLD_FUNCTION: &str = "fold";

/// Lowercases text the same way [`fold`] does on the Rust side.
pub fn fold(value: &str) -> String {
    value.to_lowercase()
}

/// Registers `fold(x)`. Re-registering replaces the previous definition.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| fold(&text)))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::register_functions;
    use rusqlite::Connection;

    #[test]
    fn fold_lowercases_non_ascii_letters() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        let folded: String = conn
            .query_row("SELECT fold('ÜBER Émile');", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "über émile");
    }

    #[test]
    fn fold_passes_null_through() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        let folded: Option<String> = conn
            .query_row("SELECT fold(NULL);", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, None);
    }

    #[test]
    fn folded_like_matches_across_case() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        let matched: bool = conn
            .query_row("SELECT fold('Über Alles') LIKE fold('ÜBER%');", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(matched);
    }
}

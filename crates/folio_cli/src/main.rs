//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `folio_core` linkage and print its version.
//! - Load an optional JSON config named by `FOLIO_CONFIG` and start logging
//!   from it.
//! - Seed the three-book reference catalog into an empty database and print
//!   the listing that `key=value` arguments select, as JSON.

use folio_core::{
    init_logging_from_config, BookDraft, BookRepository, BookService, CoreConfig, CoreError,
    Identity, RequestContext, SqliteBookRepository, SqliteReferenceLookup,
};
use log::info;
use rusqlite::Connection;
use std::ffi::OsString;
use std::process::ExitCode;

const CONFIG_ENV: &str = "FOLIO_CONFIG";

const FIXTURE: &[(&str, &str, i32)] = &[
    ("J.R.R. Tolkien", "The Hobbit", 1937),
    ("J.R.R. Tolkien", "The Lord of the Rings", 1954),
    ("George R.R. Martin", "A Game of Thrones", 1996),
];

fn main() -> ExitCode {
    println!("folio_core ping={}", folio_core::ping());
    println!("folio_core version={}", folio_core::core_version());

    let pairs: Vec<(String, String)> = std::env::args()
        .skip(1)
        .filter_map(|arg| {
            arg.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect();

    match run(pairs) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let body = serde_json::to_string(&err.to_body())
                .unwrap_or_else(|_| format!("{{\"status\":{}}}", err.status_code()));
            eprintln!("{body}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<OsString>) -> Result<CoreConfig, CoreError> {
    let config = match path {
        Some(path) => CoreConfig::from_json_file(path)?,
        None => CoreConfig::default(),
    };
    if init_logging_from_config(&config).map_err(CoreError::Config)? {
        info!("event=cli_start module=cli status=ok");
    }
    Ok(config)
}

fn run(pairs: Vec<(String, String)>) -> Result<String, CoreError> {
    let config = load_config(std::env::var_os(CONFIG_ENV))?;
    let conn = config
        .open_database()
        .map_err(|err| CoreError::Repo(err.into()))?;
    if SqliteBookRepository::try_new(&conn)?.count_books()? == 0 {
        seed(&conn)?;
    }

    let service = BookService::new(
        SqliteBookRepository::try_new(&conn)?,
        SqliteReferenceLookup::try_new(&conn)?,
    )
    .with_config(&config);
    let page = service.list_books(&RequestContext::list(Identity::anonymous()).with_query(pairs))?;
    serde_json::to_string_pretty(&page)
        .map_err(|err| CoreError::Config(format!("cannot encode listing: {err}")))
}

fn seed(conn: &Connection) -> Result<(), CoreError> {
    let service = BookService::new(
        SqliteBookRepository::try_new(conn)?,
        SqliteReferenceLookup::try_new(conn)?,
    );
    let librarian = Identity::staff(uuid::Uuid::new_v4());
    let mut authors: Vec<(&str, folio_core::Author)> = Vec::new();

    for (author_name, title, year) in FIXTURE {
        let author_id = match authors.iter().find(|(name, _)| name == author_name) {
            Some((_, author)) => author.id,
            None => {
                let author =
                    service.create_author(&RequestContext::create(librarian), author_name)?;
                let id = author.id;
                authors.push((*author_name, author));
                id
            }
        };
        service.create_book(
            &RequestContext::create(librarian),
            BookDraft {
                title: (*title).to_string(),
                publication_year: *year,
                author_id,
            },
        )?;
    }
    Ok(())
}

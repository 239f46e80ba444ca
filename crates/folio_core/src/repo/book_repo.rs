//! Catalog repository: authors and books.
//!
//! # Invariants
//! - Book reads always join their author so `author_name` is current.
//! - `(title, author_id)` duplicates surface as `UniqueViolation("books.title_author")`.

use crate::model::book::{
    Author, AuthorId, AuthorSummary, Book, BookDraft, BookId, BookStatistics, YearCount,
};
use crate::query::page::{Page, PageRequest};
use crate::query::sql::SqlPlan;
use crate::repo::{
    count_column, ensure_schema_ready, map_write_error, parse_uuid, query_page, uuid_column,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub const BOOK_TITLE_AUTHOR_CONSTRAINT: &str = "books.title_author";

const BOOK_COLUMNS: &str = "books.id AS id,
    books.title AS title,
    books.publication_year AS publication_year,
    books.author_id AS author_id,
    authors.name AS author_name,
    books.created_at AS created_at";
const BOOK_FROM: &str = "FROM books INNER JOIN authors ON authors.id = books.author_id";

const AUTHOR_COLUMNS: &str = "authors.id AS id,
    authors.name AS name,
    (SELECT COUNT(*) FROM books WHERE books.author_id = authors.id) AS book_count";
const AUTHOR_FROM: &str = "FROM authors";

pub trait BookRepository {
    fn create_author(&self, author: &Author) -> RepoResult<()>;
    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>>;
    fn list_authors(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<AuthorSummary>>;
    /// Authors with at least one book, most books first.
    fn prolific_authors(&self, limit: u32) -> RepoResult<Vec<AuthorSummary>>;

    fn insert_book(&self, id: BookId, draft: &BookDraft, created_at: i64) -> RepoResult<Book>;
    fn update_book(&self, id: BookId, draft: &BookDraft) -> RepoResult<Book>;
    fn delete_book(&self, id: BookId) -> RepoResult<()>;
    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    fn list_books(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<Book>>;
    fn books_by_author(&self, author_id: AuthorId) -> RepoResult<Vec<Book>>;
    fn count_books(&self) -> RepoResult<u64>;
    /// Totals plus per-year counts for the `top_years` most recent years.
    fn book_statistics(&self, top_years: u32) -> RepoResult<BookStatistics>;
}

pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn require_book(&self, id: BookId) -> RepoResult<Book> {
        self.get_book(id)?
            .ok_or(RepoError::NotFound { entity: "book", id })
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn create_author(&self, author: &Author) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO authors (id, name) VALUES (?1, ?2);",
            params![author.id.to_string(), author.name.as_str()],
        )?;
        Ok(())
    }

    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name FROM authors WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get::<_, String>("id")?, row.get::<_, String>("name")?)),
            )
            .optional()?;
        row.map(|(raw_id, name)| {
            Ok(Author {
                id: parse_uuid(&raw_id, "authors.id")?,
                name,
            })
        })
        .transpose()
    }

    fn list_authors(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<AuthorSummary>> {
        query_page(self.conn, AUTHOR_COLUMNS, AUTHOR_FROM, plan, page, map_author_summary)
    }

    fn prolific_authors(&self, limit: u32) -> RepoResult<Vec<AuthorSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AUTHOR_COLUMNS} {AUTHOR_FROM}
             WHERE book_count > 0
             ORDER BY book_count DESC, authors.name ASC, authors.id ASC
             LIMIT ?1;"
        ))?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut authors = Vec::new();
        while let Some(row) = rows.next()? {
            authors.push(map_author_summary(row)?);
        }
        Ok(authors)
    }

    fn insert_book(&self, id: BookId, draft: &BookDraft, created_at: i64) -> RepoResult<Book> {
        self.conn
            .execute(
                "INSERT INTO books (id, title, publication_year, author_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    id.to_string(),
                    draft.title.as_str(),
                    draft.publication_year,
                    draft.author_id.to_string(),
                    created_at,
                ],
            )
            .map_err(|err| map_write_error(err, BOOK_TITLE_AUTHOR_CONSTRAINT))?;
        self.require_book(id)
    }

    fn update_book(&self, id: BookId, draft: &BookDraft) -> RepoResult<Book> {
        let changed = self
            .conn
            .execute(
                "UPDATE books
                 SET title = ?2, publication_year = ?3, author_id = ?4
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    draft.title.as_str(),
                    draft.publication_year,
                    draft.author_id.to_string(),
                ],
            )
            .map_err(|err| map_write_error(err, BOOK_TITLE_AUTHOR_CONSTRAINT))?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "book", id });
        }
        self.require_book(id)
    }

    fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM books WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "book", id });
        }
        Ok(())
    }

    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BOOK_COLUMNS} {BOOK_FROM} WHERE books.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => map_book(row).map(Some),
            None => Ok(None),
        }
    }

    fn list_books(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<Book>> {
        query_page(self.conn, BOOK_COLUMNS, BOOK_FROM, plan, page, map_book)
    }

    fn books_by_author(&self, author_id: AuthorId) -> RepoResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} {BOOK_FROM}
             WHERE books.author_id = ?1
             ORDER BY books.publication_year ASC, books.title ASC, books.id ASC;"
        ))?;
        let mut rows = stmt.query([author_id.to_string()])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(map_book(row)?);
        }
        Ok(books)
    }

    fn count_books(&self) -> RepoResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn book_statistics(&self, top_years: u32) -> RepoResult<BookStatistics> {
        let (total_books, total_authors): (i64, i64) = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM books), (SELECT COUNT(*) FROM authors);",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT publication_year, COUNT(*) AS count
             FROM books
             GROUP BY publication_year
             ORDER BY publication_year DESC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(top_years)])?;
        let mut books_by_year = Vec::new();
        while let Some(row) = rows.next()? {
            books_by_year.push(YearCount {
                publication_year: row.get("publication_year")?,
                count: count_column(row, "count")?,
            });
        }

        Ok(BookStatistics {
            total_books: u64::try_from(total_books).unwrap_or_default(),
            total_authors: u64::try_from(total_authors).unwrap_or_default(),
            books_by_year,
        })
    }
}

fn map_book(row: &Row<'_>) -> RepoResult<Book> {
    Ok(Book {
        id: uuid_column(row, "id")?,
        title: row.get("title")?,
        publication_year: row.get("publication_year")?,
        author_id: uuid_column(row, "author_id")?,
        author_name: row.get("author_name")?,
        created_at: row.get("created_at")?,
    })
}

fn map_author_summary(row: &Row<'_>) -> RepoResult<AuthorSummary> {
    Ok(AuthorSummary {
        id: uuid_column(row, "id")?,
        name: row.get("name")?,
        book_count: count_column(row, "book_count")?,
    })
}

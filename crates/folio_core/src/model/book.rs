//! Catalog records: authors and books.
//!
//! # Invariants
//! - A book title is non-blank and at most [`TITLE_MAX_CHARS`] characters.
//! - `publication_year` lies in `[MIN_PUBLICATION_YEAR, current year]`.
//! - `(title, author_id)` is unique across the catalog.
//! - Books are not owned by any identity.

use crate::error::ValidationError;
use crate::model::identity::UserId;
use crate::model::resource::OwnedResource;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AuthorId = Uuid;
pub type BookId = Uuid;

pub const MIN_PUBLICATION_YEAR: i32 = 1000;
pub const TITLE_MAX_CHARS: usize = 300;
pub const AUTHOR_NAME_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

/// Author list row with its book count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: AuthorId,
    pub name: String,
    pub book_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub publication_year: i32,
    pub author_id: AuthorId,
    /// Denormalized from `authors.name` at read time.
    pub author_name: String,
    pub created_at: i64,
}

impl OwnedResource for Book {
    fn owner_id(&self) -> Option<UserId> {
        None
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Full book body for create and PUT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub publication_year: i32,
    pub author_id: AuthorId,
}

impl BookDraft {
    /// Trims the title and checks field-level rules against `current_year`.
    pub fn normalized(mut self, current_year: i32) -> Result<Self, ValidationError> {
        self.title = self.title.trim().to_string();
        validate_title(&self.title)?;
        validate_publication_year(self.publication_year, current_year)?;
        Ok(self)
    }
}

/// Partial book body for PATCH. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author_id: Option<AuthorId>,
}

impl BookPatch {
    /// Overlays this patch on `book` and returns the resulting draft.
    pub fn apply_to(&self, book: &Book) -> BookDraft {
        BookDraft {
            title: self.title.clone().unwrap_or_else(|| book.title.clone()),
            publication_year: self.publication_year.unwrap_or(book.publication_year),
            author_id: self.author_id.unwrap_or(book.author_id),
        }
    }
}

/// Aggregate catalog numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookStatistics {
    pub total_books: u64,
    pub total_authors: u64,
    /// Newest years first.
    pub books_by_year: Vec<YearCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub publication_year: i32,
    pub count: u64,
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("title", "title must not be blank"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::new(
            "title",
            format!("title must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

pub fn validate_publication_year(year: i32, current_year: i32) -> Result<(), ValidationError> {
    if year < MIN_PUBLICATION_YEAR {
        return Err(ValidationError::new(
            "publication_year",
            format!("publication year must be at least {MIN_PUBLICATION_YEAR}"),
        ));
    }
    if year > current_year {
        return Err(ValidationError::new(
            "publication_year",
            format!("publication year cannot be in the future (current year is {current_year})"),
        ));
    }
    Ok(())
}

pub fn validate_author_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "author name must not be blank"));
    }
    if name.chars().count() > AUTHOR_NAME_MAX_CHARS {
        return Err(ValidationError::new(
            "name",
            format!("author name must be at most {AUTHOR_NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

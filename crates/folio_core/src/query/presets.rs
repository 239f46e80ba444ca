//! Built-in collection vocabularies.
//!
//! Column expressions assume the base selects used by the SQLite
//! repositories (`books JOIN authors`, plain `authors`, `posts`, `comments`).

use crate::query::config::{CollectionConfig, FieldDef, FilterKind};

const BOOK_AUTHOR_ALIASES: &[&str] = &["author__name"];

fn book_fields(config: CollectionConfig) -> CollectionConfig {
    config
        .field(FieldDef::id("author_id", "books.author_id").references("authors"))
        .field(FieldDef::integer("publication_year", "books.publication_year"))
        .field(FieldDef::text("title", "books.title"))
        .field(FieldDef::text("author_name", "authors.name").aliases(BOOK_AUTHOR_ALIASES))
}

/// Standard book listing.
pub fn book_collection() -> CollectionConfig {
    book_fields(CollectionConfig::new("books", "books.id"))
        .param("author", "author_id", FilterKind::Exact)
        .param("publication_year", "publication_year", FilterKind::Exact)
        .param("year_from", "publication_year", FilterKind::RangeLower)
        .param("year_to", "publication_year", FilterKind::RangeUpper)
        .param("min_year", "publication_year", FilterKind::RangeLower)
        .param("max_year", "publication_year", FilterKind::RangeUpper)
        .param("title_starts_with", "title", FilterKind::Prefix)
        .param("author_contains", "author_name", FilterKind::Contains)
        .param("author_name", "author_name", FilterKind::Contains)
        .param("title", "title", FilterKind::Contains)
        .search("search", &["title", "author_name"])
        .ordering(
            "ordering",
            &["title", "publication_year", "author_name"],
            "-publication_year,title",
        )
}

/// Advanced search listing: searches the year text too and sorts via `order_by`.
pub fn book_search_collection() -> CollectionConfig {
    book_fields(CollectionConfig::new("book_search", "books.id"))
        .field(FieldDef::text("year_text", "CAST(books.publication_year AS TEXT)"))
        .param("author_id", "author_id", FilterKind::Exact)
        .param("min_year", "publication_year", FilterKind::RangeLower)
        .param("max_year", "publication_year", FilterKind::RangeUpper)
        .search("q", &["title", "author_name", "year_text"])
        .ordering(
            "order_by",
            &["title", "publication_year", "author_name"],
            "title",
        )
}

pub fn author_collection() -> CollectionConfig {
    CollectionConfig::new("authors", "authors.id")
        .field(FieldDef::text("name", "authors.name"))
        .field(FieldDef::integer(
            "book_count",
            "(SELECT COUNT(*) FROM books WHERE books.author_id = authors.id)",
        ))
        .param("name", "name", FilterKind::Contains)
        .search("search", &["name"])
        .ordering("ordering", &["name", "book_count"], "name")
}

pub fn post_collection() -> CollectionConfig {
    CollectionConfig::new("posts", "posts.id")
        .field(FieldDef::id("author_id", "posts.author_id").references("users"))
        .field(FieldDef::integer("created_at", "posts.created_at"))
        .field(FieldDef::integer("updated_at", "posts.updated_at"))
        .field(FieldDef::text("title", "posts.title"))
        .field(FieldDef::text("content", "posts.content"))
        .param("author", "author_id", FilterKind::Exact)
        .param("created_at", "created_at", FilterKind::Exact)
        .param("created_after", "created_at", FilterKind::RangeLower)
        .param("created_before", "created_at", FilterKind::RangeUpper)
        .search("search", &["title", "content"])
        .ordering(
            "ordering",
            &["created_at", "updated_at", "title"],
            "-created_at",
        )
}

pub fn comment_collection() -> CollectionConfig {
    CollectionConfig::new("comments", "comments.id")
        .field(FieldDef::id("author_id", "comments.author_id").references("users"))
        .field(FieldDef::id("post_id", "comments.post_id").references("posts"))
        .field(FieldDef::integer("created_at", "comments.created_at"))
        .field(FieldDef::integer("updated_at", "comments.updated_at"))
        .field(FieldDef::text("content", "comments.content"))
        .param("post", "post_id", FilterKind::Exact)
        .param("author", "author_id", FilterKind::Exact)
        .param("created_at", "created_at", FilterKind::Exact)
        .search("search", &["content"])
        .ordering("ordering", &["created_at", "updated_at"], "created_at")
}

//! Catalog use-cases: book CRUD, custom book actions and authors.
//!
//! # Responsibility
//! - Gate every call through the book/author view policies.
//! - Compose list parameters into paged catalog queries.
//! - Validate book bodies against the catalog rules.
//!
//! # Invariants
//! - Authorization is checked before validation and before any write.
//! - A book's author must exist; `(title, author)` stays unique.

use crate::clock::{current_year, now_epoch_ms};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::book::{
    validate_author_name, Author, AuthorId, AuthorSummary, Book, BookDraft, BookId, BookPatch,
    BookStatistics,
};
use crate::model::identity::Identity;
use crate::policy::access::{Method, ObjectPolicy, ViewPolicy};
use crate::policy::request::RequestContext;
use crate::query::composer::compose;
use crate::query::config::CollectionConfig;
use crate::query::page::{Page, PageRequest};
use crate::query::presets::{author_collection, book_collection, book_search_collection};
use crate::query::sql::SqlPlan;
use crate::query::query_params;
use crate::repo::book_repo::BookRepository;
use crate::repo::{RepoError, ReferenceLookup};
use crate::service::{plan_list, ListSettings};
use log::info;
use uuid::Uuid;

pub const RECENT_BOOKS_LIMIT: u32 = 5;
pub const STATISTICS_TOP_YEARS: u32 = 10;
pub const PROLIFIC_AUTHORS_LIMIT: u32 = 5;

const DUPLICATE_BOOK_ACTION: &str = "duplicate_book";
const RECENT_BOOKS_ACTION: &str = "recent_books";
const BOOK_STATISTICS_ACTION: &str = "book_statistics";

pub struct BookService<R: BookRepository, L: ReferenceLookup> {
    repo: R,
    refs: L,
    books: CollectionConfig,
    book_search: CollectionConfig,
    authors: CollectionConfig,
    view_policy: ViewPolicy,
    author_policy: ViewPolicy,
    object_policy: ObjectPolicy,
    settings: ListSettings,
}

impl<R: BookRepository, L: ReferenceLookup> BookService<R, L> {
    pub fn new(repo: R, refs: L) -> Self {
        Self {
            repo,
            refs,
            books: book_collection(),
            book_search: book_search_collection(),
            authors: author_collection(),
            view_policy: ViewPolicy::book_actions(),
            author_policy: ViewPolicy::authenticated_or_read_only(),
            object_policy: ObjectPolicy::default(),
            settings: ListSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ListSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_object_policy(mut self, policy: ObjectPolicy) -> Self {
        self.object_policy = policy;
        self
    }

    /// Applies the paging limits and ownership mode of `config`.
    pub fn with_config(self, config: &CoreConfig) -> Self {
        self.with_settings(ListSettings::from(config))
            .with_object_policy(config.object_policy())
    }

    fn authorize(&self, ctx: &RequestContext) -> CoreResult<()> {
        self.view_policy
            .authorize(ctx.method, &ctx.identity, &ctx.action)
    }

    fn authorize_object(&self, ctx: &RequestContext, book: &Book) -> CoreResult<()> {
        self.object_policy
            .authorize(ctx.method, &ctx.identity, book, &ctx.action)
    }

    fn require_book(&self, id: BookId) -> CoreResult<Book> {
        self.repo
            .get_book(id)?
            .ok_or_else(|| CoreError::not_found("book", id))
    }

    fn check_author(&self, author_id: AuthorId) -> CoreResult<()> {
        if self.repo.get_author(author_id)?.is_none() {
            return Err(CoreError::validation(
                "author",
                format!("no author matches `{author_id}`"),
            ));
        }
        Ok(())
    }

    fn run_list(&self, ctx: &RequestContext, collection: &CollectionConfig) -> CoreResult<Page<Book>> {
        self.authorize(ctx)?;
        let (plan, page) = plan_list(ctx, collection, &self.refs, self.settings)?;
        Ok(self.repo.list_books(&plan, page)?)
    }

    /// `GET /books` with filters, search, ordering and paging.
    pub fn list_books(&self, ctx: &RequestContext) -> CoreResult<Page<Book>> {
        self.run_list(ctx, &self.books)
    }

    /// Advanced listing: `q` searches title, author and year; `order_by` sorts.
    pub fn search_books(&self, ctx: &RequestContext) -> CoreResult<Page<Book>> {
        self.run_list(ctx, &self.book_search)
    }

    pub fn get_book(&self, ctx: &RequestContext, id: BookId) -> CoreResult<Book> {
        self.authorize(ctx)?;
        self.require_book(id)
    }

    pub fn create_book(&self, ctx: &RequestContext, draft: BookDraft) -> CoreResult<Book> {
        self.authorize(ctx)?;
        let draft = draft.normalized(current_year())?;
        self.check_author(draft.author_id)?;
        let book = self
            .repo
            .insert_book(Uuid::new_v4(), &draft, now_epoch_ms())
            .map_err(duplicate_title)?;
        info!("event=book_create module=catalog status=ok");
        Ok(book)
    }

    /// PUT: replaces every field.
    pub fn update_book(&self, ctx: &RequestContext, id: BookId, draft: BookDraft) -> CoreResult<Book> {
        self.authorize(ctx)?;
        let existing = self.require_book(id)?;
        self.authorize_object(ctx, &existing)?;
        self.write_update(id, draft)
    }

    /// PATCH: replaces only the supplied fields.
    pub fn partial_update_book(
        &self,
        ctx: &RequestContext,
        id: BookId,
        patch: &BookPatch,
    ) -> CoreResult<Book> {
        self.authorize(ctx)?;
        let existing = self.require_book(id)?;
        self.authorize_object(ctx, &existing)?;
        self.write_update(id, patch.apply_to(&existing))
    }

    fn write_update(&self, id: BookId, draft: BookDraft) -> CoreResult<Book> {
        let draft = draft.normalized(current_year())?;
        self.check_author(draft.author_id)?;
        let book = self.repo.update_book(id, &draft).map_err(duplicate_title)?;
        info!("event=book_update module=catalog status=ok");
        Ok(book)
    }

    pub fn destroy_book(&self, ctx: &RequestContext, id: BookId) -> CoreResult<()> {
        self.authorize(ctx)?;
        let existing = self.require_book(id)?;
        self.authorize_object(ctx, &existing)?;
        self.repo.delete_book(id)?;
        info!("event=book_destroy module=catalog status=ok");
        Ok(())
    }

    /// Custom `POST` action copying a book as `"<title> (Copy)"`.
    pub fn duplicate_book(&self, identity: Identity, id: BookId) -> CoreResult<Book> {
        let ctx = RequestContext::custom(Method::Post, identity, DUPLICATE_BOOK_ACTION);
        self.authorize(&ctx)?;
        let source = self.require_book(id)?;
        let draft = BookDraft {
            title: format!("{} (Copy)", source.title),
            publication_year: source.publication_year,
            author_id: source.author_id,
        }
        .normalized(current_year())?;
        let copy = self
            .repo
            .insert_book(Uuid::new_v4(), &draft, now_epoch_ms())
            .map_err(duplicate_title)?;
        info!("event=book_duplicate module=catalog status=ok");
        Ok(copy)
    }

    /// Newest five books by publication year.
    pub fn recent_books(&self, identity: Identity) -> CoreResult<Vec<Book>> {
        let ctx = RequestContext::custom(Method::Get, identity, RECENT_BOOKS_ACTION);
        ViewPolicy::allow_any().authorize(ctx.method, &ctx.identity, &ctx.action)?;
        let spec = compose(
            &query_params([("ordering", "-publication_year")]),
            &self.books,
        )?;
        let plan = SqlPlan::render(&spec, &self.books);
        let page = self
            .repo
            .list_books(&plan, PageRequest::new(1, RECENT_BOOKS_LIMIT))?;
        Ok(page.items)
    }

    pub fn book_statistics(&self, identity: Identity) -> CoreResult<BookStatistics> {
        let ctx = RequestContext::custom(Method::Get, identity, BOOK_STATISTICS_ACTION);
        ViewPolicy::allow_any().authorize(ctx.method, &ctx.identity, &ctx.action)?;
        Ok(self.repo.book_statistics(STATISTICS_TOP_YEARS)?)
    }

    pub fn create_author(&self, ctx: &RequestContext, name: &str) -> CoreResult<Author> {
        self.author_policy
            .authorize(ctx.method, &ctx.identity, &ctx.action)?;
        let name = name.trim();
        validate_author_name(name)?;
        let author = Author {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.repo.create_author(&author)?;
        info!("event=author_create module=catalog status=ok");
        Ok(author)
    }

    pub fn list_authors(&self, ctx: &RequestContext) -> CoreResult<Page<AuthorSummary>> {
        self.author_policy
            .authorize(ctx.method, &ctx.identity, &ctx.action)?;
        let (plan, page) = plan_list(ctx, &self.authors, &self.refs, self.settings)?;
        Ok(self.repo.list_authors(&plan, page)?)
    }

    /// Top five authors by book count, authors without books excluded.
    pub fn prolific_authors(&self, ctx: &RequestContext) -> CoreResult<Vec<AuthorSummary>> {
        self.author_policy
            .authorize(ctx.method, &ctx.identity, &ctx.action)?;
        Ok(self.repo.prolific_authors(PROLIFIC_AUTHORS_LIMIT)?)
    }

    pub fn books_by_author(&self, ctx: &RequestContext, author_id: AuthorId) -> CoreResult<Vec<Book>> {
        self.author_policy
            .authorize(ctx.method, &ctx.identity, &ctx.action)?;
        if self.repo.get_author(author_id)?.is_none() {
            return Err(CoreError::not_found("author", author_id));
        }
        Ok(self.repo.books_by_author(author_id)?)
    }
}

fn duplicate_title(err: RepoError) -> CoreError {
    match err {
        RepoError::UniqueViolation(_) => {
            CoreError::validation("title", "this author already has a book with this title")
        }
        other => other.into(),
    }
}

use folio_core::{
    open_db_in_memory, BookDraft, BookPatch, BookService, CoreError, Identity, Method,
    RequestContext, SqliteBookRepository, SqliteReferenceLookup, ViewAction,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> BookService<SqliteBookRepository<'_>, SqliteReferenceLookup<'_>> {
    BookService::new(
        SqliteBookRepository::try_new(conn).unwrap(),
        SqliteReferenceLookup::try_new(conn).unwrap(),
    )
}

fn book_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))
        .unwrap()
}

fn draft(title: &str, year: i32, author_id: Uuid) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        publication_year: year,
        author_id,
    }
}

fn author(conn: &Connection, name: &str) -> Uuid {
    service(conn)
        .create_author(&RequestContext::create(Identity::staff(Uuid::new_v4())), name)
        .unwrap()
        .id
}

#[test]
fn anonymous_create_is_forbidden_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let tolkien = author(&conn, "J.R.R. Tolkien");
    let before = book_count(&conn);

    let ctx = RequestContext::parse("POST", Identity::anonymous(), false).unwrap();
    assert_eq!(ctx.action, ViewAction::Create);
    let err = service(&conn)
        .create_book(&ctx, draft("The Hobbit", 1937, tolkien))
        .unwrap_err();

    assert!(matches!(err, CoreError::Authorization { .. }));
    assert_eq!(err.status_code(), 403);
    assert_eq!(book_count(&conn), before);
}

#[test]
fn denial_comes_before_validation() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn)
        .create_book(
            &RequestContext::create(Identity::anonymous()),
            draft("", 99, Uuid::new_v4()),
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[test]
fn authenticated_users_write_but_only_staff_destroy() {
    let conn = open_db_in_memory().unwrap();
    let tolkien = author(&conn, "J.R.R. Tolkien");
    let books = service(&conn);
    let reader = Identity::user(Uuid::new_v4());
    let librarian = Identity::staff(Uuid::new_v4());

    let hobbit = books
        .create_book(&RequestContext::create(reader), draft("  The Hobbit ", 1937, tolkien))
        .unwrap();
    assert_eq!(hobbit.title, "The Hobbit");
    assert_eq!(hobbit.author_name, "J.R.R. Tolkien");

    let anonymous_read = books
        .get_book(&RequestContext::retrieve(Identity::anonymous()), hobbit.id)
        .unwrap();
    assert_eq!(anonymous_read, hobbit);

    let err = books
        .destroy_book(&RequestContext::destroy(reader), hobbit.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(book_count(&conn), 1);

    books
        .destroy_book(&RequestContext::destroy(librarian), hobbit.id)
        .unwrap();
    assert_eq!(book_count(&conn), 0);

    let err = books
        .get_book(&RequestContext::retrieve(reader), hobbit.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn put_replaces_and_patch_merges() {
    let conn = open_db_in_memory().unwrap();
    let tolkien = author(&conn, "J.R.R. Tolkien");
    let martin = author(&conn, "George R.R. Martin");
    let books = service(&conn);
    let reader = Identity::user(Uuid::new_v4());

    let book = books
        .create_book(&RequestContext::create(reader), draft("Hobbit", 1936, tolkien))
        .unwrap();

    let patched = books
        .partial_update_book(
            &RequestContext::partial_update(reader),
            book.id,
            &BookPatch {
                publication_year: Some(1937),
                ..BookPatch::default()
            },
        )
        .unwrap();
    assert_eq!(patched.title, "Hobbit");
    assert_eq!(patched.publication_year, 1937);

    let replaced = books
        .update_book(
            &RequestContext::update(reader),
            book.id,
            draft("A Clash of Kings", 1998, martin),
        )
        .unwrap();
    assert_eq!(replaced.author_name, "George R.R. Martin");

    let err = books
        .update_book(
            &RequestContext::update(Identity::anonymous()),
            book.id,
            draft("Hijacked", 2000, martin),
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[test]
fn catalog_rules_surface_as_validation_errors() {
    let conn = open_db_in_memory().unwrap();
    let tolkien = author(&conn, "J.R.R. Tolkien");
    let books = service(&conn);
    let ctx = RequestContext::create(Identity::user(Uuid::new_v4()));

    books.create_book(&ctx, draft("The Hobbit", 1937, tolkien)).unwrap();

    let cases = [
        (draft("The Hobbit", 1937, tolkien), "title"),
        (draft("   ", 1937, tolkien), "title"),
        (draft("Future", 9999, tolkien), "publication_year"),
        (draft("Ancient", 999, tolkien), "publication_year"),
        (draft("Nobody's", 1950, Uuid::new_v4()), "author"),
    ];
    for (body, field) in cases {
        match books.create_book(&ctx, body).unwrap_err() {
            CoreError::Validation(inner) => assert_eq!(inner.field, field),
            other => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(book_count(&conn), 1);
}

#[test]
fn duplicate_book_copies_title_and_needs_login() {
    let conn = open_db_in_memory().unwrap();
    let tolkien = author(&conn, "J.R.R. Tolkien");
    let books = service(&conn);
    let reader = Identity::user(Uuid::new_v4());
    let hobbit = books
        .create_book(&RequestContext::create(reader), draft("The Hobbit", 1937, tolkien))
        .unwrap();

    let err = books.duplicate_book(Identity::anonymous(), hobbit.id).unwrap_err();
    assert_eq!(err.status_code(), 403);

    let copy = books.duplicate_book(reader, hobbit.id).unwrap();
    assert_eq!(copy.title, "The Hobbit (Copy)");
    assert_ne!(copy.id, hobbit.id);
    assert_eq!(copy.author_id, tolkien);
}

#[test]
fn public_reports_cover_recent_books_and_statistics() {
    let conn = open_db_in_memory().unwrap();
    let tolkien = author(&conn, "J.R.R. Tolkien");
    let martin = author(&conn, "George R.R. Martin");
    author(&conn, "Unpublished");
    let books = service(&conn);
    let ctx = RequestContext::create(Identity::user(Uuid::new_v4()));

    for (index, year) in [1937, 1954, 1955, 1977, 1980, 1996].into_iter().enumerate() {
        let author_id = if year == 1996 { martin } else { tolkien };
        books
            .create_book(&ctx, draft(&format!("Book {index}"), year, author_id))
            .unwrap();
    }

    let recent = books.recent_books(Identity::anonymous()).unwrap();
    let years: Vec<i32> = recent.iter().map(|book| book.publication_year).collect();
    assert_eq!(years, vec![1996, 1980, 1977, 1955, 1954]);

    let stats = books.book_statistics(Identity::anonymous()).unwrap();
    assert_eq!(stats.total_books, 6);
    assert_eq!(stats.total_authors, 3);
    assert_eq!(stats.books_by_year.first().map(|row| row.publication_year), Some(1996));

    let reader = RequestContext::list(Identity::anonymous());
    let prolific = books.prolific_authors(&reader).unwrap();
    let names: Vec<&str> = prolific.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["J.R.R. Tolkien", "George R.R. Martin"]);
    assert_eq!(prolific[0].book_count, 5);

    let by_author = books.books_by_author(&reader, martin).unwrap();
    assert_eq!(by_author.len(), 1);
    let err = books.books_by_author(&reader, Uuid::new_v4()).unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn author_listing_is_composed_and_writes_need_login() {
    let conn = open_db_in_memory().unwrap();
    author(&conn, "J.R.R. Tolkien");
    author(&conn, "George R.R. Martin");
    let books = service(&conn);

    let ctx = RequestContext::list(Identity::anonymous()).with_query([("search", "tolk")]);
    let page = books.list_authors(&ctx).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].book_count, 0);

    let err = books
        .create_author(&RequestContext::create(Identity::anonymous()), "Anon")
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let ctx = RequestContext::new(
        Method::Post,
        Identity::user(Uuid::new_v4()),
        ViewAction::Create,
    );
    let err = books.create_author(&ctx, "  ").unwrap_err();
    assert_eq!(err.to_body().field.as_deref(), Some("name"));
}

#[test]
fn error_body_serializes_for_the_boundary() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn)
        .create_book(
            &RequestContext::create(Identity::anonymous()),
            draft("The Hobbit", 1937, Uuid::new_v4()),
        )
        .unwrap_err();

    let body = serde_json::to_value(err.to_body()).unwrap();
    assert_eq!(body["status"], 403);
    assert_eq!(body["code"], "permission_denied");
    assert!(body.get("field").is_none());
}

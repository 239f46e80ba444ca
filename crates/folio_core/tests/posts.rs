use folio_core::{
    open_db_in_memory, AccountService, CoreConfig, Identity, NotificationService, PostDraft, PostService,
    RequestContext, SqliteFollowGraph, SqliteNotificationRepository, SqlitePostRepository,
    SqliteReferenceLookup, SqliteUserRepository, User,
};
use rusqlite::Connection;
use uuid::Uuid;

type Posts<'conn> = PostService<
    SqlitePostRepository<'conn>,
    SqliteNotificationRepository<'conn>,
    SqliteReferenceLookup<'conn>,
>;

fn posts(conn: &Connection) -> Posts<'_> {
    PostService::new(
        SqlitePostRepository::try_new(conn).unwrap(),
        SqliteNotificationRepository::try_new(conn).unwrap(),
        SqliteReferenceLookup::try_new(conn).unwrap(),
    )
}

fn accounts(
    conn: &Connection,
) -> AccountService<SqliteUserRepository<'_>, SqliteFollowGraph<'_>, SqliteNotificationRepository<'_>>
{
    AccountService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteFollowGraph::try_new(conn).unwrap(),
        SqliteNotificationRepository::try_new(conn).unwrap(),
    )
}

fn unread(conn: &Connection, user: &User) -> u64 {
    NotificationService::new(SqliteNotificationRepository::try_new(conn).unwrap())
        .unread_count(user.id)
        .unwrap()
}

#[test]
fn only_the_author_edits_and_staff_may_delete() {
    let conn = open_db_in_memory().unwrap();
    let ada = accounts(&conn).register_user("ada", false).unwrap();
    let bob = accounts(&conn).register_user("bob", false).unwrap();
    let mod_user = accounts(&conn).register_user("mod", true).unwrap();
    let service = posts(&conn);

    let post = service
        .create_post(
            &RequestContext::create(ada.identity()),
            PostDraft::new("Hello", "First post"),
        )
        .unwrap();
    assert_eq!(post.author_id, ada.id);

    let err = service
        .update_post(
            &RequestContext::update(bob.identity()),
            post.id,
            PostDraft::new("Mine now", "edited"),
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let edited = service
        .update_post(
            &RequestContext::update(ada.identity()),
            post.id,
            PostDraft::new("Hello again", "edited"),
        )
        .unwrap();
    assert_eq!(edited.title, "Hello again");

    let err = service
        .delete_post(&RequestContext::destroy(bob.identity()), post.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
    service
        .delete_post(&RequestContext::destroy(mod_user.identity()), post.id)
        .unwrap();

    let err = service
        .get_post(&RequestContext::retrieve(ada.identity()), post.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn configured_authenticated_only_ownership_lets_any_user_edit() {
    let config = CoreConfig::from_json_str(
        r#"{"ownership": "authenticated_only", "page_size_default": 1}"#,
    )
    .unwrap();
    let conn = config.open_database().unwrap();
    let ada = accounts(&conn).register_user("ada", false).unwrap();
    let bob = accounts(&conn).register_user("bob", false).unwrap();
    let service = posts(&conn).with_config(&config);

    for title in ["First", "Second"] {
        service
            .create_post(
                &RequestContext::create(ada.identity()),
                PostDraft::new(title, "body"),
            )
            .unwrap();
    }
    let page = service
        .list_posts(&RequestContext::list(bob.identity()))
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_count, 2);

    let edited = service
        .update_post(
            &RequestContext::update(bob.identity()),
            page.items[0].id,
            PostDraft::new("Edited by bob", "body"),
        )
        .unwrap();
    assert_eq!(edited.title, "Edited by bob");

    let strict = posts(&conn);
    let err = strict
        .update_post(
            &RequestContext::update(bob.identity()),
            page.items[0].id,
            PostDraft::new("Again", "body"),
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[test]
fn reads_need_login_and_bodies_are_validated() {
    let conn = open_db_in_memory().unwrap();
    let ada = accounts(&conn).register_user("ada", false).unwrap();
    let service = posts(&conn);

    let err = service
        .list_posts(&RequestContext::list(Identity::anonymous()))
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let err = service
        .create_post(&RequestContext::create(ada.identity()), PostDraft::new(" ", "x"))
        .unwrap_err();
    assert_eq!(err.to_body().field.as_deref(), Some("title"));
}

#[test]
fn comments_and_likes_notify_the_post_author_once() {
    let conn = open_db_in_memory().unwrap();
    let ada = accounts(&conn).register_user("ada", false).unwrap();
    let bob = accounts(&conn).register_user("bob", false).unwrap();
    let service = posts(&conn);
    let post = service
        .create_post(
            &RequestContext::create(ada.identity()),
            PostDraft::new("Hello", "First post"),
        )
        .unwrap();

    service
        .add_comment(&RequestContext::create(ada.identity()), post.id, "my own")
        .unwrap();
    assert_eq!(unread(&conn, &ada), 0);

    let comment = service
        .add_comment(&RequestContext::create(bob.identity()), post.id, "nice")
        .unwrap();
    let liked = service
        .like_post(&RequestContext::create(bob.identity()), post.id)
        .unwrap();
    assert_eq!(liked.likes_count, 1);
    assert_eq!(liked.comments_count, 2);
    assert_eq!(unread(&conn, &ada), 2);

    let err = service
        .like_post(&RequestContext::create(bob.identity()), post.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(unread(&conn, &ada), 2);

    let unliked = service
        .unlike_post(&RequestContext::destroy(bob.identity()), post.id)
        .unwrap();
    assert_eq!(unliked.likes_count, 0);
    let err = service
        .unlike_post(&RequestContext::destroy(bob.identity()), post.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    let err = service
        .update_comment(&RequestContext::update(ada.identity()), comment.id, "hijack")
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
    let edited = service
        .update_comment(&RequestContext::update(bob.identity()), comment.id, "very nice")
        .unwrap();
    assert_eq!(edited.content, "very nice");

    let listed = service
        .list_comments(&RequestContext::list(ada.identity()), post.id)
        .unwrap();
    assert_eq!(listed.total_count, 2);
    assert!(listed.items.iter().any(|item| item.id == comment.id));

    let created = comment.created_at.to_string();
    let same_instant = service
        .list_comments(
            &RequestContext::list(ada.identity())
                .with_query([("created_at", created.as_str()), ("ordering", "-updated_at")]),
            post.id,
        )
        .unwrap();
    assert!(same_instant.items.iter().any(|item| item.id == comment.id));
    let earlier = (comment.created_at - 100_000).to_string();
    let none = service
        .list_comments(
            &RequestContext::list(ada.identity()).with_query([("created_at", earlier.as_str())]),
            post.id,
        )
        .unwrap();
    assert_eq!(none.total_count, 0);

    service
        .delete_comment(&RequestContext::destroy(bob.identity()), comment.id)
        .unwrap();
}

#[test]
fn failed_like_notification_rolls_back_the_like() {
    let conn = open_db_in_memory().unwrap();
    let ada = accounts(&conn).register_user("ada", false).unwrap();
    let bob = accounts(&conn).register_user("bob", false).unwrap();
    let service = posts(&conn);
    let post = service
        .create_post(
            &RequestContext::create(ada.identity()),
            PostDraft::new("Hello", "First post"),
        )
        .unwrap();

    conn.execute_batch(
        "CREATE TEMP TRIGGER notifications_down BEFORE INSERT ON notifications
         BEGIN SELECT RAISE(ABORT, 'notifications unavailable'); END;",
    )
    .unwrap();
    let err = service
        .like_post(&RequestContext::create(bob.identity()), post.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    let err = service
        .add_comment(&RequestContext::create(bob.identity()), post.id, "Nice")
        .unwrap_err();
    assert_eq!(err.status_code(), 500);

    let after = service
        .get_post(&RequestContext::retrieve(bob.identity()), post.id)
        .unwrap();
    assert_eq!(after.likes_count, 0);
    assert_eq!(after.comments_count, 0);

    conn.execute_batch("DROP TRIGGER notifications_down;").unwrap();
    let liked = service
        .like_post(&RequestContext::create(bob.identity()), post.id)
        .unwrap();
    assert_eq!(liked.likes_count, 1);
    assert_eq!(unread(&conn, &ada), 1);
}

#[test]
fn post_listing_filters_by_author_and_feed_follows_edges() {
    let conn = open_db_in_memory().unwrap();
    let ada = accounts(&conn).register_user("ada", false).unwrap();
    let bob = accounts(&conn).register_user("bob", false).unwrap();
    let cy = accounts(&conn).register_user("cy", false).unwrap();
    let service = posts(&conn);

    for (author, title) in [(&ada, "Ada one"), (&bob, "Bob one"), (&ada, "Ada two")] {
        service
            .create_post(
                &RequestContext::create(author.identity()),
                PostDraft::new(title, "body"),
            )
            .unwrap();
    }

    let ada_id = ada.id.to_string();
    let ctx = RequestContext::list(cy.identity())
        .with_query([("author", ada_id.as_str()), ("ordering", "title")]);
    let page = service.list_posts(&ctx).unwrap();
    let titles: Vec<&str> = page.items.iter().map(|post| post.title.as_str()).collect();
    assert_eq!(titles, vec!["Ada one", "Ada two"]);

    let missing = Uuid::new_v4().to_string();
    let ctx = RequestContext::list(cy.identity()).with_query([("author", missing.as_str())]);
    assert_eq!(service.list_posts(&ctx).unwrap_err().status_code(), 400);

    assert_eq!(
        service
            .feed(&RequestContext::list(cy.identity()))
            .unwrap()
            .total_count,
        0
    );
    accounts(&conn)
        .follow_user(&RequestContext::create(cy.identity()), bob.id)
        .unwrap();
    let feed = service.feed(&RequestContext::list(cy.identity())).unwrap();
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].author_id, bob.id);
}

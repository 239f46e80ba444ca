use folio_core::{
    open_db_in_memory, AccountService, CoreError, FollowGraph, Identity, RequestContext,
    SqliteFollowGraph, SqliteNotificationRepository, SqliteUserRepository, User,
};
use rusqlite::Connection;
use uuid::Uuid;

type Accounts<'conn> = AccountService<
    SqliteUserRepository<'conn>,
    SqliteFollowGraph<'conn>,
    SqliteNotificationRepository<'conn>,
>;

fn accounts(conn: &Connection) -> Accounts<'_> {
    AccountService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteFollowGraph::try_new(conn).unwrap(),
        SqliteNotificationRepository::try_new(conn).unwrap(),
    )
}

fn register(conn: &Connection, name: &str) -> User {
    accounts(conn).register_user(name, false).unwrap()
}

fn as_user(user: &User) -> RequestContext {
    RequestContext::create(user.identity())
}

#[test]
fn follow_then_unfollow_walks_the_state_machine() {
    let conn = open_db_in_memory().unwrap();
    let ada = register(&conn, "ada");
    let bob = register(&conn, "bob");
    let service = accounts(&conn);
    let graph = SqliteFollowGraph::try_new(&conn).unwrap();

    let outcome = service.follow_user(&as_user(&ada), bob.id).unwrap();
    assert!(outcome.following);
    assert_eq!(outcome.followers_count, 1);
    assert!(graph.is_following(ada.id, bob.id).unwrap());
    assert!(!graph.is_following(bob.id, ada.id).unwrap());

    let err = service.follow_user(&as_user(&ada), bob.id).unwrap_err();
    assert!(matches!(err, CoreError::AlreadyFollowing(id) if id == bob.id));
    assert_eq!(graph.followers_count(bob.id).unwrap(), 1);

    let outcome = service.unfollow_user(&as_user(&ada), bob.id).unwrap();
    assert!(!outcome.following);
    assert_eq!(outcome.followers_count, 0);

    let err = service.unfollow_user(&as_user(&ada), bob.id).unwrap_err();
    assert!(matches!(err, CoreError::NotFollowing(_)));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn self_follow_fails_in_both_directions_without_edges() {
    let conn = open_db_in_memory().unwrap();
    let ada = register(&conn, "ada");
    let service = accounts(&conn);

    let err = service.follow_user(&as_user(&ada), ada.id).unwrap_err();
    assert!(matches!(err, CoreError::SelfFollow));
    let err = service.unfollow_user(&as_user(&ada), ada.id).unwrap_err();
    assert!(matches!(err, CoreError::SelfFollow));

    let graph = SqliteFollowGraph::try_new(&conn).unwrap();
    assert_eq!(graph.following_count(ada.id).unwrap(), 0);
}

#[test]
fn unknown_target_is_not_found_and_anonymous_is_forbidden() {
    let conn = open_db_in_memory().unwrap();
    let ada = register(&conn, "ada");
    let service = accounts(&conn);

    let err = service.follow_user(&as_user(&ada), Uuid::new_v4()).unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = service
        .follow_user(&RequestContext::create(Identity::anonymous()), ada.id)
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[test]
fn follow_rejects_an_edge_written_outside_the_graph() {
    let conn = open_db_in_memory().unwrap();
    let ada = register(&conn, "ada");
    let bob = register(&conn, "bob");
    conn.execute(
        "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, 0);",
        [ada.id.to_string(), bob.id.to_string()],
    )
    .unwrap();

    let graph = SqliteFollowGraph::try_new(&conn).unwrap();
    let err = graph.follow(ada.id, bob.id).unwrap_err();
    assert!(matches!(err, CoreError::AlreadyFollowing(_)));
}

#[test]
fn failed_follow_notification_leaves_no_edge_and_retry_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let ada = register(&conn, "ada");
    let bob = register(&conn, "bob");
    let service = accounts(&conn);
    let graph = SqliteFollowGraph::try_new(&conn).unwrap();

    conn.execute_batch(
        "CREATE TEMP TRIGGER notifications_down BEFORE INSERT ON notifications
         BEGIN SELECT RAISE(ABORT, 'notifications unavailable'); END;",
    )
    .unwrap();
    let err = service.follow_user(&as_user(&ada), bob.id).unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(!graph.is_following(ada.id, bob.id).unwrap());

    conn.execute_batch("DROP TRIGGER notifications_down;").unwrap();
    let outcome = service.follow_user(&as_user(&ada), bob.id).unwrap();
    assert!(outcome.following);
    assert_eq!(outcome.followers_count, 1);
}

#[test]
fn profile_counts_and_listings_follow_edges() {
    let conn = open_db_in_memory().unwrap();
    let ada = register(&conn, "ada");
    let bob = register(&conn, "bob");
    let cy = register(&conn, "cy");
    let service = accounts(&conn);

    service.follow_user(&as_user(&bob), ada.id).unwrap();
    service.follow_user(&as_user(&cy), ada.id).unwrap();
    service.follow_user(&as_user(&ada), cy.id).unwrap();

    let profile = service.get_profile(&as_user(&bob), ada.id).unwrap();
    assert_eq!(profile.username, "ada");
    assert_eq!(profile.followers_count, 2);
    assert_eq!(profile.following_count, 1);

    let followers = service.followers(&as_user(&bob), ada.id).unwrap();
    assert_eq!(followers, vec![bob.id, cy.id]);
    let following = service.following(&as_user(&bob), ada.id).unwrap();
    assert_eq!(following, vec![cy.id]);
}

#[test]
fn registration_creates_profile_and_rejects_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let service = accounts(&conn);
    let ada = service.register_user("  ada ", false).unwrap();
    assert_eq!(ada.username, "ada");

    let profile = service.get_profile(&as_user(&ada), ada.id).unwrap();
    assert_eq!(profile.bio, "");

    let err = service.register_user("ADA", false).unwrap_err();
    assert_eq!(err.to_body().field.as_deref(), Some("username"));
    let err = service.register_user("", false).unwrap_err();
    assert_eq!(err.status_code(), 400);

    let updated = service.update_bio(&as_user(&ada), "hello").unwrap();
    assert_eq!(updated.bio, "hello");
}

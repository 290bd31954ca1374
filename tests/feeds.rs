mod support;

use axum::http::StatusCode;
use postboard::application::{
    feed::{FeedError, FeedService},
    follow::{FollowOutcome, FollowService},
    viewer::Viewer,
};
use support::{MemoryRepositories, TestApp, body_text, card_count, get, location};
use tower::ServiceExt;

fn feed_service(repos: &std::sync::Arc<MemoryRepositories>) -> FeedService {
    FeedService::new(repos.clone(), repos.clone(), repos.clone(), repos.clone())
}

#[tokio::test]
async fn group_feed_splits_eleven_posts_into_ten_and_one() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    let group = repos.add_group("Cats", "cats");
    for n in 0..11 {
        repos.add_post(&author, &format!("cat post {n}"), Some(&group));
    }
    let app = TestApp::new(repos);

    let first = app
        .public
        .clone()
        .oneshot(get("/group/cats/", None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let html = body_text(first).await;
    assert_eq!(card_count(&html), 10);
    assert!(html.contains("Page 1 of 2"));
    assert!(html.contains("cat post 10"), "newest post leads the feed");

    let second = app
        .public
        .oneshot(get("/group/cats/?page=2", None))
        .await
        .unwrap();
    let html = body_text(second).await;
    assert_eq!(card_count(&html), 1);
    assert!(html.contains("cat post 0"));
}

#[tokio::test]
async fn index_feed_with_thirteen_posts_has_three_on_second_page() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    for n in 0..13 {
        repos.add_post(&author, &format!("post {n}"), None);
    }
    let feeds = feed_service(&repos);

    let first = feeds.index(None).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first.total_pages, 2);

    let second = feeds.index(Some("2")).await.unwrap();
    assert_eq!(second.len(), 3);
    let texts: Vec<&str> = second.items.iter().map(|post| post.text.as_str()).collect();
    assert_eq!(texts, vec!["post 2", "post 1", "post 0"]);
}

#[tokio::test]
async fn out_of_range_page_falls_back_to_first() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    for n in 0..3 {
        repos.add_post(&author, &format!("post {n}"), None);
    }
    let feeds = feed_service(&repos);

    for raw in ["0", "9", "last", "-1"] {
        let page = feeds.index(Some(raw)).await.unwrap();
        assert_eq!(page.number, 1, "page={raw}");
        assert_eq!(page.items[0].text, "post 2");
    }
}

#[tokio::test]
async fn new_post_appears_first_in_every_feed_it_belongs_to() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    let reader = repos.add_user("reader");
    let cats = repos.add_group("Cats", "cats");
    let dogs = repos.add_group("Dogs", "dogs");
    repos.add_post(&author, "older", Some(&cats));
    let fresh = repos.add_post(&author, "fresh", Some(&cats));
    let follows = FollowService::new(repos.clone(), repos.clone());
    follows.follow(reader.id, author.id).await.unwrap();
    let feeds = feed_service(&repos);
    let viewer = Viewer::User(reader.clone());

    assert_eq!(feeds.index(None).await.unwrap().items[0].id, fresh.id);
    assert_eq!(
        feeds.group("cats", None).await.unwrap().page.items[0].id,
        fresh.id
    );
    assert_eq!(
        feeds.profile(&viewer, "auth", None).await.unwrap().page.items[0].id,
        fresh.id
    );
    assert_eq!(feeds.follow(&viewer, None).await.unwrap().items[0].id, fresh.id);
    assert!(
        feeds
            .group(&dogs.slug, None)
            .await
            .unwrap()
            .page
            .items
            .is_empty()
    );
}

#[tokio::test]
async fn unknown_group_and_author_render_not_found() {
    let app = TestApp::new(MemoryRepositories::new());

    let group = app
        .public
        .clone()
        .oneshot(get("/group/nope/", None))
        .await
        .unwrap();
    assert_eq!(group.status(), StatusCode::NOT_FOUND);

    let profile = app
        .public
        .clone()
        .oneshot(get("/profile/ghost/", None))
        .await
        .unwrap();
    assert_eq!(profile.status(), StatusCode::NOT_FOUND);

    let route = app
        .public
        .oneshot(get("/no/such/page/", None))
        .await
        .unwrap();
    assert_eq!(route.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_feed_requires_login() {
    let app = TestApp::new(MemoryRepositories::new());

    let response = app.public.oneshot(get("/follow/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Ffollow%2F");
}

#[tokio::test]
async fn unknown_viewer_header_is_treated_as_anonymous() {
    let app = TestApp::new(MemoryRepositories::new());

    let response = app
        .public
        .oneshot(get("/follow/", Some("impostor")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn following_twice_stores_a_single_edge() {
    let repos = MemoryRepositories::new();
    let reader = repos.add_user("reader");
    let author = repos.add_user("auth");
    let app = TestApp::new(repos.clone());

    for _ in 0..2 {
        let response = app
            .public
            .clone()
            .oneshot(get("/profile/auth/follow/", Some("reader")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/profile/auth/");
    }

    assert_eq!(repos.follow_count(reader.id, author.id), 1);
}

#[tokio::test]
async fn self_follow_is_ignored() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    let app = TestApp::new(repos.clone());

    let response = app
        .public
        .oneshot(get("/profile/auth/follow/", Some("auth")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(repos.follow_count(author.id, author.id), 0);
}

#[tokio::test]
async fn unfollow_removes_author_posts_from_follow_feed() {
    let repos = MemoryRepositories::new();
    let reader = repos.add_user("reader");
    let author = repos.add_user("auth");
    let stranger = repos.add_user("stranger");
    repos.add_post(&author, "followed words", None);
    repos.add_post(&stranger, "unrelated words", None);
    let follows = FollowService::new(repos.clone(), repos.clone());
    let feeds = feed_service(&repos);
    let viewer = Viewer::User(reader.clone());

    assert_eq!(
        follows.follow(reader.id, author.id).await.unwrap(),
        FollowOutcome::Created
    );
    let page = feeds.follow(&viewer, None).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0].author.id, author.id);

    let stranger_view = Viewer::User(stranger.clone());
    assert!(feeds.follow(&stranger_view, None).await.unwrap().is_empty());

    assert_eq!(
        follows.unfollow(reader.id, author.id).await.unwrap(),
        FollowOutcome::Removed
    );
    assert!(feeds.follow(&viewer, None).await.unwrap().is_empty());
    assert_eq!(
        follows.unfollow(reader.id, author.id).await.unwrap(),
        FollowOutcome::Unchanged
    );
}

#[tokio::test]
async fn profile_reports_following_state_for_viewer() {
    let repos = MemoryRepositories::new();
    let reader = repos.add_user("reader");
    let author = repos.add_user("auth");
    repos.add_post(&author, "hello", None);
    let follows = FollowService::new(repos.clone(), repos.clone());
    let feeds = feed_service(&repos);
    let viewer = Viewer::User(reader.clone());

    let before = feeds.profile(&viewer, "auth", None).await.unwrap();
    assert!(!before.following);
    assert_eq!(before.post_count, 1);

    follows.follow(reader.id, author.id).await.unwrap();
    let after = feeds.profile(&viewer, "auth", None).await.unwrap();
    assert!(after.following);

    let anonymous = feeds.profile(&Viewer::Anonymous, "auth", None).await.unwrap();
    assert!(!anonymous.following);

    let app = TestApp::new(repos);
    let html = body_text(
        app.public
            .oneshot(get("/profile/auth/", Some("reader")))
            .await
            .unwrap(),
    )
    .await;
    assert!(html.contains("/profile/auth/unfollow/"));
}

#[tokio::test]
async fn anonymous_follow_redirects_to_login() {
    let repos = MemoryRepositories::new();
    repos.add_user("auth");
    let app = TestApp::new(repos);

    let response = app
        .public
        .oneshot(get("/profile/auth/follow/", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/auth/login/?next=%2Fprofile%2Fauth%2Ffollow%2F"
    );
}

#[tokio::test]
async fn feed_service_reports_unknown_group() {
    let feeds = feed_service(&MemoryRepositories::new());
    let err = feeds.group("missing", None).await.unwrap_err();
    assert!(matches!(err, FeedError::UnknownGroup));
}

#[tokio::test]
async fn equal_pub_dates_split_pages_by_descending_id() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    let texts: Vec<String> = (0..12).map(|n| format!("tied {n:02}")).collect();
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let posts = repos.add_posts_at_same_instant(&author, &text_refs);
    let feeds = feed_service(&repos);

    let first = feeds.profile(&Viewer::Anonymous, "auth", None).await.unwrap();
    let second = feeds.profile(&Viewer::Anonymous, "auth", Some("2")).await.unwrap();

    let newest_first: Vec<i64> = posts.iter().rev().map(|post| post.id).collect();
    let first_ids: Vec<i64> = first.page.items.iter().map(|post| post.id).collect();
    let second_ids: Vec<i64> = second.page.items.iter().map(|post| post.id).collect();
    assert_eq!(first_ids, &newest_first[..10]);
    assert_eq!(second_ids, &newest_first[10..]);

    let again = feeds.profile(&Viewer::Anonymous, "auth", None).await.unwrap();
    let again_ids: Vec<i64> = again.page.items.iter().map(|post| post.id).collect();
    assert_eq!(again_ids, first_ids);
}

#[tokio::test]
async fn tied_posts_render_in_the_same_order_on_every_request() {
    let repos = MemoryRepositories::new();
    let author = repos.add_user("auth");
    repos.add_posts_at_same_instant(&author, &["alpha", "beta", "gamma"]);
    let app = TestApp::new(repos);

    let fetch = || async {
        body_text(
            app.public
                .clone()
                .oneshot(get("/profile/auth/", None))
                .await
                .unwrap(),
        )
        .await
    };
    let html = fetch().await;
    let gamma = html.find("gamma").unwrap();
    let beta = html.find("beta").unwrap();
    let alpha = html.find("alpha").unwrap();
    assert!(gamma < beta && beta < alpha);
    assert_eq!(fetch().await, html);
}

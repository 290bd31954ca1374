use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use url::{Url, form_urlencoded::Serializer};

use crate::{
    application::{
        error::{AppError, ErrorReport, repo_error_to_http},
        feed::{FeedError, FeedService},
        follow::{FollowError, FollowService},
        groups::GroupService,
        posts::{PostError, PostService},
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, GroupsWriteRepo, HealthRepo, PostsRepo,
            PostsWriteRepo, UsersRepo,
        },
        viewer::Viewer,
    },
    cache::{CacheState, response_cache_layer},
    config::AuthSettings,
    domain::{
        entities::{GroupRecord, PostId},
        error::DomainError,
        posts::{CommentDraft, PostDraft},
    },
    presentation::views::{
        CommentView, FeedView, FollowTemplate, GroupTemplate, IndexTemplate, PostCard,
        PostDetailTemplate, PostFormTemplate, ProfileTemplate, render_not_found_response,
        render_template_response,
    },
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
    viewer::CurrentViewer,
};

const UNKNOWN_GROUP_MESSAGE: &str = "Select a valid group.";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub follows: Arc<FollowService>,
    pub posts: Arc<PostService>,
    pub groups: Arc<GroupService>,
    pub users: Arc<dyn UsersRepo>,
    pub health: Arc<dyn HealthRepo>,
    pub cache: CacheState,
    pub auth: AuthSettings,
}

impl HttpState {
    /// Wire every service against one repository implementation.
    pub fn from_repositories<R>(repos: Arc<R>, cache: CacheState, auth: AuthSettings) -> Self
    where
        R: UsersRepo
            + GroupsRepo
            + GroupsWriteRepo
            + PostsRepo
            + PostsWriteRepo
            + CommentsRepo
            + FollowsRepo
            + HealthRepo
            + 'static,
    {
        Self {
            feed: Arc::new(FeedService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
            )),
            follows: Arc::new(FollowService::new(repos.clone(), repos.clone())),
            posts: Arc::new(PostService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
            )),
            groups: Arc::new(GroupService::new(repos.clone(), repos.clone())),
            users: repos.clone(),
            health: repos,
            cache,
            auth,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    // Only the index feed is cached; its template carries nothing viewer-specific.
    let cached_routes = Router::new().route("/", get(index)).layer(
        middleware::from_fn_with_state(state.cache.clone(), response_cache_layer),
    );

    let routes = Router::new()
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .route("/follow/", get(follow_index))
        .route("/create/", get(post_create_form).post(post_create))
        .route("/posts/{id}/", get(post_detail))
        .route("/posts/{id}/edit/", get(post_edit_form).post(post_edit))
        .route("/posts/{id}/comment/", post(add_comment))
        .route("/_health/db", get(public_health))
        .fallback(fallback);

    cached_routes
        .merge(routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct PostForm {
    text: String,
    group: String,
    image: String,
}

impl PostForm {
    fn draft(&self) -> PostDraft {
        PostDraft::new(self.text.clone())
            .with_group(self.group.clone())
            .with_image(self.image.clone())
    }

    fn template(&self, edit_of: Option<PostId>, groups: &[GroupRecord]) -> PostFormTemplate {
        PostFormTemplate::new(
            edit_of,
            &self.text,
            Some(self.group.as_str()),
            Some(self.image.as_str()),
            groups,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentForm {
    text: String,
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => render_template_response(
            IndexTemplate {
                feed: FeedView::from(&page),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, &state.auth, "/"),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    match state.feed.group(&slug, query.page.as_deref()).await {
        Ok(feed) => render_template_response(
            GroupTemplate {
                feed: FeedView::from(&feed.page),
                group: feed.group,
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, &state.auth, uri.path()),
    }
}

async fn profile(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    match state
        .feed
        .profile(&viewer, &username, query.page.as_deref())
        .await
    {
        Ok(feed) => {
            let can_follow = viewer
                .user_id()
                .is_some_and(|viewer_id| viewer_id != feed.author.id);
            render_template_response(
                ProfileTemplate::new(
                    &feed.author,
                    feed.post_count,
                    feed.following,
                    can_follow,
                    &feed.page,
                ),
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_response(err, &state.auth, uri.path()),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    match state.feed.follow(&viewer, query.page.as_deref()).await {
        Ok(page) => render_template_response(
            FollowTemplate {
                feed: FeedView::from(&page),
            },
            StatusCode::OK,
        ),
        Err(err) => feed_error_response(err, &state.auth, uri.path()),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    match state.follows.follow_username(&viewer, &username).await {
        Ok(change) => profile_redirect(&change.author.username),
        Err(err) => follow_error_response(err, &state.auth, uri.path()),
    }
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    uri: Uri,
) -> Response {
    match state.follows.unfollow_username(&viewer, &username).await {
        Ok(change) => profile_redirect(&change.author.username),
        Err(err) => follow_error_response(err, &state.auth, uri.path()),
    }
}

async fn post_create_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: Uri,
) -> Response {
    if !viewer.is_authenticated() {
        return login_redirect(&state.auth, uri.path());
    }
    let groups = match load_groups(&state).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };
    render_template_response(
        PostForm::default().template(None, &groups),
        StatusCode::OK,
    )
}

async fn post_create(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    uri: Uri,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.create_post(&viewer, form.draft()).await {
        Ok(post) => profile_redirect(&post.author.username),
        Err(PostError::Validation(err)) => {
            rerender_post_form(&state, &form, None, validation_message(&err)).await
        }
        Err(PostError::UnknownGroup) => {
            rerender_post_form(&state, &form, None, UNKNOWN_GROUP_MESSAGE.to_string()).await
        }
        Err(err) => post_error_response(err, &state.auth, uri.path()),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return render_not_found_response("malformed post id");
    };
    render_post_detail(&state, &viewer, post_id, String::new(), None, StatusCode::OK).await
}

async fn post_edit_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return render_not_found_response("malformed post id");
    };
    let post = match state.posts.editable(&viewer, post_id).await {
        Ok(post) => post,
        Err(err) => return edit_error_response(err, post_id),
    };
    let groups = match load_groups(&state).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };
    let template = PostFormTemplate::new(
        Some(post_id),
        &post.text,
        post.group.as_ref().map(|group| group.slug.as_str()),
        post.image.as_deref(),
        &groups,
    );
    render_template_response(template, StatusCode::OK)
}

async fn post_edit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return render_not_found_response("malformed post id");
    };
    match state.posts.edit_post(&viewer, post_id, form.draft()).await {
        Ok(post) => detail_redirect(post.id),
        Err(PostError::Validation(err)) => {
            rerender_post_form(&state, &form, Some(post_id), validation_message(&err)).await
        }
        Err(PostError::UnknownGroup) => {
            rerender_post_form(
                &state,
                &form,
                Some(post_id),
                UNKNOWN_GROUP_MESSAGE.to_string(),
            )
            .await
        }
        Err(err) => edit_error_response(err, post_id),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(id): Path<String>,
    uri: Uri,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&id) else {
        return render_not_found_response("malformed post id");
    };
    match state
        .posts
        .add_comment(&viewer, post_id, CommentDraft::new(form.text.clone()))
        .await
    {
        Ok(_) => detail_redirect(post_id),
        Err(PostError::Validation(err)) => {
            render_post_detail(
                &state,
                &viewer,
                post_id,
                form.text,
                Some(validation_message(&err)),
                StatusCode::BAD_REQUEST,
            )
            .await
        }
        Err(err) => post_error_response(err, &state.auth, uri.path()),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback(uri: Uri) -> Response {
    render_not_found_response(&format!("no route for {}", uri.path()))
}

async fn render_post_detail(
    state: &HttpState,
    viewer: &Viewer,
    post_id: PostId,
    comment_text: String,
    comment_error: Option<String>,
    status: StatusCode,
) -> Response {
    let detail = match state.posts.detail(post_id).await {
        Ok(detail) => detail,
        Err(err) => return post_error_response(err, &state.auth, ""),
    };
    let can_edit = viewer.user_id() == Some(detail.post.author.id);
    let template = PostDetailTemplate {
        post: PostCard::from(&detail.post),
        post_count: detail.post_count,
        comments: detail.comments.iter().map(CommentView::from).collect(),
        can_edit,
        can_comment: viewer.is_authenticated(),
        comment_text,
        comment_error,
    };
    render_template_response(template, status)
}

async fn rerender_post_form(
    state: &HttpState,
    form: &PostForm,
    edit_of: Option<PostId>,
    message: String,
) -> Response {
    let groups = match load_groups(state).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };
    let mut response = render_template_response(
        form.template(edit_of, &groups).with_error(message.clone()),
        StatusCode::BAD_REQUEST,
    );
    ErrorReport::from_message(
        "infra::http::public::rerender_post_form",
        StatusCode::BAD_REQUEST,
        message,
    )
    .attach(&mut response);
    response
}

async fn load_groups(state: &HttpState) -> Result<Vec<GroupRecord>, Response> {
    state
        .groups
        .list()
        .await
        .map_err(|err| AppError::from(err).into_response())
}

fn parse_post_id(raw: &str) -> Option<PostId> {
    raw.parse::<PostId>().ok().filter(|id| *id > 0)
}

fn validation_message(err: &DomainError) -> String {
    err.message().to_string()
}

fn profile_redirect(username: &str) -> Response {
    Redirect::to(&profile_path(username)).into_response()
}

/// `/profile/{username}/` with the username percent-encoded as one path segment.
fn profile_path(username: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return format!("/profile/{username}/");
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(["profile", username, ""]);
    }
    url.path().to_string()
}

fn detail_redirect(post_id: PostId) -> Response {
    Redirect::to(&format!("/posts/{post_id}/")).into_response()
}

/// Send an anonymous viewer to the login page, remembering where they were going.
fn login_redirect(auth: &AuthSettings, next: &str) -> Response {
    let query = Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let separator = if auth.login_url.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{}{separator}{query}", auth.login_url)).into_response()
}

fn feed_error_response(err: FeedError, auth: &AuthSettings, path: &str) -> Response {
    match err {
        FeedError::UnknownGroup => render_not_found_response("unknown group"),
        FeedError::UnknownAuthor => render_not_found_response("unknown author"),
        FeedError::Unauthorized => login_redirect(auth, path),
        FeedError::Repo(err) => {
            repo_error_to_http("infra::http::public::feed_error_response", err).into_response()
        }
    }
}

fn follow_error_response(err: FollowError, auth: &AuthSettings, path: &str) -> Response {
    match err {
        FollowError::UnknownAuthor => render_not_found_response("unknown author"),
        FollowError::Unauthorized => login_redirect(auth, path),
        FollowError::Repo(err) => {
            repo_error_to_http("infra::http::public::follow_error_response", err).into_response()
        }
    }
}

fn post_error_response(err: PostError, auth: &AuthSettings, path: &str) -> Response {
    match err {
        PostError::UnknownPost => render_not_found_response("unknown post"),
        PostError::Unauthorized => login_redirect(auth, path),
        PostError::Forbidden { post_id } => detail_redirect(post_id),
        PostError::UnknownGroup => AppError::validation(UNKNOWN_GROUP_MESSAGE).into_response(),
        PostError::Validation(err) => AppError::from(err).into_response(),
        PostError::Repo(err) => {
            repo_error_to_http("infra::http::public::post_error_response", err).into_response()
        }
    }
}

/// Anyone but the author, signed in or not, is sent back to the post.
fn edit_error_response(err: PostError, post_id: PostId) -> Response {
    match err {
        PostError::Unauthorized | PostError::Forbidden { .. } => detail_redirect(post_id),
        PostError::UnknownPost => render_not_found_response("unknown post"),
        PostError::UnknownGroup => AppError::validation(UNKNOWN_GROUP_MESSAGE).into_response(),
        PostError::Validation(err) => AppError::from(err).into_response(),
        PostError::Repo(err) => {
            repo_error_to_http("infra::http::public::edit_error_response", err).into_response()
        }
    }
}

//! In-memory repositories and router builders shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use postboard::{
    application::{
        pagination::PageWindow,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, FollowsRepo,
            GroupsRepo, GroupsWriteRepo, HealthRepo, PostFilter, PostsRepo, PostsWriteRepo,
            RepoError, UNIQUE_FOLLOW_CONSTRAINT, UpdatePostParams, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState},
    config::AuthSettings,
    domain::entities::{
        AuthorRef, CommentRecord, FollowRecord, GroupId, GroupRecord, GroupRef, PostId,
        PostRecord, UserId, UserRecord,
    },
    infra::http::{AdminState, HttpState, build_admin_router, build_router},
};
use time::{Duration, OffsetDateTime};

pub const VIEWER_HEADER: &str = "x-authenticated-user";

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    next_id: i64,
    clock: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so insertion order is publication order.
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += 1;
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000) + Duration::seconds(self.clock)
    }

    fn author_ref(&self, id: UserId) -> Result<AuthorRef, RepoError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| AuthorRef {
                id: user.id,
                username: user.username.clone(),
            })
            .ok_or_else(|| RepoError::InvalidInput {
                message: format!("unknown user {id}"),
            })
    }

    fn group_ref(&self, id: Option<GroupId>) -> Result<Option<GroupRef>, RepoError> {
        let Some(id) = id else {
            return Ok(None);
        };
        self.groups
            .iter()
            .find(|group| group.id == id)
            .map(|group| {
                Some(GroupRef {
                    id: group.id,
                    slug: group.slug.clone(),
                    title: group.title.clone(),
                })
            })
            .ok_or_else(|| RepoError::InvalidInput {
                message: format!("unknown group {id}"),
            })
    }

    fn matches(&self, post: &PostRecord, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(id) => post.group.as_ref().is_some_and(|group| group.id == id),
            PostFilter::Author(id) => post.author.id == id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|follow| follow.user_id == user_id && follow.author_id == post.author.id),
        }
    }

    fn selected(&self, filter: PostFilter) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Repository double implementing every persistence trait over shared vectors.
#[derive(Default)]
pub struct MemoryRepositories {
    tables: Mutex<Tables>,
}

impl MemoryRepositories {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, username: &str) -> UserRecord {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let date_joined = tables.tick();
        let user = UserRecord {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            date_joined,
        };
        tables.users.push(user.clone());
        user
    }

    pub fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let group = GroupRecord {
            id,
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        };
        tables.groups.push(group.clone());
        group
    }

    pub fn add_post(&self, author: &UserRecord, text: &str, group: Option<&GroupRecord>) -> PostRecord {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let pub_date = tables.tick();
        let post = PostRecord {
            id,
            text: text.to_string(),
            pub_date,
            author: tables.author_ref(author.id).unwrap(),
            group: tables.group_ref(group.map(|group| group.id)).unwrap(),
            image: None,
        };
        tables.posts.push(post.clone());
        post
    }

    /// Posts that all share one publication instant, so only the id orders them.
    pub fn add_posts_at_same_instant(&self, author: &UserRecord, texts: &[&str]) -> Vec<PostRecord> {
        let mut tables = self.tables.lock().unwrap();
        let pub_date = tables.tick();
        let author = tables.author_ref(author.id).unwrap();
        texts
            .iter()
            .map(|text| {
                let post = PostRecord {
                    id: tables.next_id(),
                    text: text.to_string(),
                    pub_date,
                    author: author.clone(),
                    group: None,
                    image: None,
                };
                tables.posts.push(post.clone());
                post
            })
            .collect()
    }

    pub fn post_count(&self) -> usize {
        self.tables.lock().unwrap().posts.len()
    }

    pub fn follow_count(&self, user_id: UserId, author_id: UserId) -> usize {
        self.tables
            .lock()
            .unwrap()
            .follows
            .iter()
            .filter(|follow| follow.user_id == user_id && follow.author_id == author_id)
            .count()
    }

    pub fn post(&self, id: PostId) -> Option<PostRecord> {
        self.tables
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn comment_count(&self, post_id: PostId) -> usize {
        self.tables
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .count()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.tables.lock().unwrap().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl GroupsWriteRepo for MemoryRepositories {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::duplicate("groups_slug_key"));
        }
        let group = GroupRecord {
            id: tables.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(
        &self,
        filter: PostFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .selected(filter)
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect())
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.selected(filter).len() as u64)
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let author = tables.author_ref(params.author_id)?;
        let group = tables.group_ref(params.group_id)?;
        let pub_date = tables.tick();
        let post = PostRecord {
            id: tables.next_id(),
            text: params.text,
            pub_date,
            author,
            group,
            image: params.image,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let group = tables.group_ref(params.group_id)?;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group = group;
        post.image = params.image;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<CommentRecord> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let author = tables.author_ref(params.author_id)?;
        if !tables.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("unknown post {}", params.post_id),
            });
        }
        let created = tables.tick();
        let comment = CommentRecord {
            id: tables.next_id(),
            post_id: params.post_id,
            author,
            text: params.text,
            created,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn is_following(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        Ok(self.follow_count(user_id, author_id) > 0)
    }

    async fn insert_follow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<FollowRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Err(RepoError::duplicate(UNIQUE_FOLLOW_CONSTRAINT));
        }
        let follow = FollowRecord {
            id: tables.next_id(),
            user_id,
            author_id,
        };
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.follows.len();
        tables
            .follows
            .retain(|follow| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(tables.follows.len() != before)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Public and admin routers sharing one response cache.
pub struct TestApp {
    pub repos: Arc<MemoryRepositories>,
    pub cache: CacheState,
    pub public: Router,
    pub admin: Router,
}

impl TestApp {
    pub fn new(repos: Arc<MemoryRepositories>) -> Self {
        Self::with_cache(repos, CacheConfig::default())
    }

    pub fn with_cache(repos: Arc<MemoryRepositories>, config: CacheConfig) -> Self {
        let cache = CacheState::new(config);
        let state = HttpState::from_repositories(repos.clone(), cache.clone(), AuthSettings::default());
        let admin = build_admin_router(AdminState {
            health: repos.clone(),
            cache: cache.clone(),
        });
        Self {
            repos,
            cache,
            public: build_router(state),
            admin,
        }
    }
}

pub fn get(uri: &str, viewer: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(username) = viewer {
        builder = builder.header(VIEWER_HEADER, username);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, viewer: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(username) = viewer {
        builder = builder.header(VIEWER_HEADER, username);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Number of post cards rendered in a feed page.
pub fn card_count(html: &str) -> usize {
    html.matches("<article class=\"post\">").count()
}

//! Repository traits describing persistence adapters.
//!
//! Relationships are never traversed implicitly: every query takes the ids it
//! needs and returns an ordered, fully materialised result.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::PageWindow;
use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupId, GroupRecord, PostId, PostRecord, UserId, UserRecord,
};

/// Name of the composite unique constraint over `(user_id, author_id)` follow pairs.
pub const UNIQUE_FOLLOW_CONSTRAINT: &str = "unique_follow";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }

    /// True when the error is the follow-pair uniqueness rejection.
    pub fn is_duplicate_follow(&self) -> bool {
        matches!(self, Self::Duplicate { constraint } if constraint == UNIQUE_FOLLOW_CONSTRAINT)
    }
}

/// Which posts a feed query selects. Ordering is always `pub_date DESC, id DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(GroupId),
    Author(UserId),
    FollowedBy(UserId),
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: UserId,
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
    pub pub_date: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    pub created: OffsetDateTime,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsWriteRepo: Send + Sync {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Posts selected by `filter`, newest first, restricted to `window`.
    async fn list_posts(
        &self,
        filter: PostFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments under a post, oldest first.
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn is_following(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;

    /// Insert a follow edge. A second insert of the same pair must fail with
    /// [`RepoError::Duplicate`] naming [`UNIQUE_FOLLOW_CONSTRAINT`].
    async fn insert_follow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<FollowRecord, RepoError>;

    /// Remove a follow edge, reporting whether a row was deleted.
    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

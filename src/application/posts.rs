use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostFilter, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::application::viewer::Viewer;
use crate::domain::entities::{CommentRecord, GroupId, PostId, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{CommentDraft, PostDraft};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("authentication required")]
    Unauthorized,
    #[error("unknown post")]
    UnknownPost,
    #[error("unknown group")]
    UnknownGroup,
    #[error("post {post_id} belongs to another author")]
    Forbidden { post_id: PostId },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A single post with its discussion.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    /// Oldest first.
    pub comments: Vec<CommentRecord>,
    /// Total posts by the post's author.
    pub post_count: u64,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
        }
    }

    pub async fn detail(&self, post_id: PostId) -> Result<PostDetail, PostError> {
        let post = self.load(post_id).await?;
        let comments = self.comments.list_for_post(post.id).await?;
        let post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author.id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            post_count,
        })
    }

    pub async fn create_post(
        &self,
        viewer: &Viewer,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let author_id = viewer.user_id().ok_or(PostError::Unauthorized)?;
        let draft = draft.validate()?;
        let group_id = self.resolve_group(draft.group.as_deref()).await?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id,
                text: draft.text,
                group_id,
                image: draft.image,
                pub_date: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            target = "postboard::posts",
            post_id = post.id,
            author_id,
            "post created"
        );
        Ok(post)
    }

    /// Load a post the viewer is allowed to edit.
    pub async fn editable(&self, viewer: &Viewer, post_id: PostId) -> Result<PostRecord, PostError> {
        let viewer_id = viewer.user_id().ok_or(PostError::Unauthorized)?;
        let post = self.load(post_id).await?;
        if post.author.id != viewer_id {
            return Err(PostError::Forbidden { post_id });
        }
        Ok(post)
    }

    /// Replace text, group and image of a post. Only its author may do so.
    pub async fn edit_post(
        &self,
        viewer: &Viewer,
        post_id: PostId,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        self.editable(viewer, post_id).await?;
        let draft = draft.validate()?;
        let group_id = self.resolve_group(draft.group.as_deref()).await?;

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id: post_id,
                text: draft.text,
                group_id,
                image: draft.image,
            })
            .await
            .map_err(|err| match err {
                RepoError::NotFound => PostError::UnknownPost,
                other => PostError::Repo(other),
            })?;

        info!(target = "postboard::posts", post_id, "post updated");
        Ok(post)
    }

    pub async fn add_comment(
        &self,
        viewer: &Viewer,
        post_id: PostId,
        draft: CommentDraft,
    ) -> Result<CommentRecord, PostError> {
        let author_id = viewer.user_id().ok_or(PostError::Unauthorized)?;
        let post = self.load(post_id).await?;
        let draft = draft.validate()?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id,
                text: draft.text,
                created: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            target = "postboard::posts",
            post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    async fn load(&self, post_id: PostId) -> Result<PostRecord, PostError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::UnknownPost)
    }

    async fn resolve_group(&self, slug: Option<&str>) -> Result<Option<GroupId>, PostError> {
        match slug {
            None => Ok(None),
            Some(slug) => self
                .groups
                .find_by_slug(slug)
                .await?
                .map(|group| Some(group.id))
                .ok_or(PostError::UnknownGroup),
        }
    }
}

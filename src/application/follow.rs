//! Idempotent subscribe/unsubscribe between users.
//!
//! The database's composite unique constraint is the only de-duplication
//! mechanism: a losing concurrent insert surfaces as a duplicate error and is
//! reported as success, because the pair exists either way.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::application::viewer::Viewer;
use crate::domain::entities::{UserId, UserRecord};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("authentication required")]
    Unauthorized,
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What a follow/unfollow call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct FollowChange {
    pub author: UserRecord,
    pub outcome: FollowOutcome,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Follow the author named `username` on behalf of the viewer.
    pub async fn follow_username(
        &self,
        viewer: &Viewer,
        username: &str,
    ) -> Result<FollowChange, FollowError> {
        let user_id = viewer.user_id().ok_or(FollowError::Unauthorized)?;
        let author = self.resolve_author(username).await?;
        let outcome = self.follow(user_id, author.id).await?;
        Ok(FollowChange { author, outcome })
    }

    /// Stop following the author named `username` on behalf of the viewer.
    pub async fn unfollow_username(
        &self,
        viewer: &Viewer,
        username: &str,
    ) -> Result<FollowChange, FollowError> {
        let user_id = viewer.user_id().ok_or(FollowError::Unauthorized)?;
        let author = self.resolve_author(username).await?;
        let outcome = self.unfollow(user_id, author.id).await?;
        Ok(FollowChange { author, outcome })
    }

    pub async fn follow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<FollowOutcome, FollowError> {
        if user_id == author_id {
            debug!(
                target = "postboard::follow",
                user_id, "ignoring self-follow request"
            );
            return Ok(FollowOutcome::Unchanged);
        }

        if self.follows.is_following(user_id, author_id).await? {
            return Ok(FollowOutcome::Unchanged);
        }

        match self.follows.insert_follow(user_id, author_id).await {
            Ok(_) => {
                info!(
                    target = "postboard::follow",
                    user_id, author_id, "follow created"
                );
                Ok(FollowOutcome::Created)
            }
            Err(err) if err.is_duplicate_follow() => {
                debug!(
                    target = "postboard::follow",
                    user_id, author_id, "concurrent follow already stored"
                );
                Ok(FollowOutcome::Unchanged)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unfollow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<FollowOutcome, FollowError> {
        if self.follows.delete_follow(user_id, author_id).await? {
            info!(
                target = "postboard::follow",
                user_id, author_id, "follow removed"
            );
            Ok(FollowOutcome::Removed)
        } else {
            Ok(FollowOutcome::Unchanged)
        }
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::UnknownAuthor)
    }
}

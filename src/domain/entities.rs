//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// Number of leading characters used when a post is shown as a short label.
pub const POST_LABEL_CHARS: usize = 15;

pub type UserId = i64;
pub type GroupId = i64;
pub type PostId = i64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: OffsetDateTime,
}

impl UserRecord {
    /// Full name when one is on record, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Author columns joined onto post and comment rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
}

/// Group columns joined onto post rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

impl PostRecord {
    pub fn label(&self) -> String {
        self.text.chars().take(POST_LABEL_CHARS).collect()
    }
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: PostId,
    pub author: AuthorRef,
    pub text: String,
    pub created: OffsetDateTime,
}

/// Directed subscription edge from `user_id` (follower) to `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowRecord {
    pub id: i64,
    pub user_id: UserId,
    pub author_id: UserId,
}

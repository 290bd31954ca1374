use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{AuthorRef, CommentRecord, PostId};

use super::{PostgresRepositories, map_sqlx_error};

const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.text, c.created, \
     u.id AS author_id, u.username AS author_username";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    text: String,
    created: OffsetDateTime,
    author_id: i64,
    author_username: String,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            text: row.text,
            created: row.created,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentRecord>, RepoError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c \
             INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 ORDER BY c.created ASC, c.id ASC"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(post_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "WITH inserted AS ( \
                 INSERT INTO comments (post_id, author_id, text, created) \
                 VALUES ($1, $2, $3, $4) RETURNING * \
             ) \
             SELECT {COMMENT_COLUMNS} FROM inserted c \
             INNER JOIN users u ON u.id = c.author_id"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(params.post_id)
            .bind(params.author_id)
            .bind(&params.text)
            .bind(params.created)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}

use async_trait::async_trait;

use crate::application::repos::{FollowsRepo, RepoError};
use crate::domain::entities::{FollowRecord, UserId};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: i64,
    user_id: i64,
    author_id: i64,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
        }
    }
}

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn is_following(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_follow(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<FollowRecord, RepoError> {
        // Plain insert: the unique_follow constraint decides races.
        let row = sqlx::query_as::<_, FollowRow>(
            "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) \
             RETURNING id, user_id, author_id",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_follow(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

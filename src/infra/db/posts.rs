use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    CreatePostParams, PostFilter, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{AuthorRef, GroupRef, PostId, PostRecord};

use super::{POST_COLUMNS, PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    image: Option<String>,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };

        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author: AuthorRef {
                id: row.author_id,
                username: row.author_username,
            },
            group,
            image: row.image,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        filter: PostFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let offset = i64::try_from(window.offset())
            .map_err(|_| RepoError::from_persistence("offset exceeds supported range"))?;

        let mut qb = QueryBuilder::new(POST_COLUMNS);
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(window.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(POST_COLUMNS);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (text, pub_date, author_id, group_id, image) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&params.text)
        .bind(params.pub_date)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(params.image.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        PostsRepo::find_by_id(self, id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let result = sqlx::query(
            "UPDATE posts SET text = $2, group_id = $3, image = $4 WHERE id = $1",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(params.image.as_deref())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        PostsRepo::find_by_id(self, params.id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

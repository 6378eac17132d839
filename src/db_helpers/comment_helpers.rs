use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    errors::RequestError,
    models::{Comment, CommentWithAuthor},
};

use super::{CommentStore, DbResult, SqliteStore};

const COMMENT_WITH_AUTHOR_QUERY: &str = r#"
        SELECT comments.id         AS "id",
               comments.content    AS "content",
               comments.user_id    AS "user_id",
               comments.post_id    AS "post_id",
               comments.created_at AS "created_at",
               comments.updated_at AS "updated_at",
               users.name          AS "author_name",
               users.email         AS "author_email",
               users.image         AS "author_image"
        FROM comments
            JOIN users ON users.id = comments.user_id
"#;

pub(super) async fn fetch_comments_for_post(
    pool: &SqlitePool,
    post_id: i64,
) -> DbResult<Vec<CommentWithAuthor>> {
    let query = format!("{COMMENT_WITH_AUTHOR_QUERY} WHERE comments.post_id = $1 ORDER BY comments.id");
    let result = sqlx::query_as::<_, CommentWithAuthor>(&query)
        .bind(post_id)
        .fetch_all(pool)
        .await?;
    Ok(result)
}

async fn fetch_comment_with_author(pool: &SqlitePool, id: i64) -> DbResult<CommentWithAuthor> {
    let query = format!("{COMMENT_WITH_AUTHOR_QUERY} WHERE comments.id = $1");
    sqlx::query_as::<_, CommentWithAuthor>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))
}

#[async_trait]
impl CommentStore for SqliteStore {
    async fn list_comments(&self, post_id: i64) -> DbResult<Vec<CommentWithAuthor>> {
        fetch_comments_for_post(&self.pool, post_id).await
    }

    async fn get_comment(&self, post_id: i64, id: i64) -> DbResult<Option<Comment>> {
        let result = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, content, user_id, post_id, created_at, updated_at
            FROM comments
            WHERE post_id = $1 AND id = $2
            "#,
        )
        .bind(post_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }

    async fn insert_comment(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> DbResult<CommentWithAuthor> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (content, user_id, post_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(content)
        .bind(user_id)
        .bind(post_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;
        tx.commit().await?;

        fetch_comment_with_author(&self.pool, id).await
    }

    async fn update_comment(
        &self,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> DbResult<CommentWithAuthor> {
        let result = sqlx::query("UPDATE comments SET content = $1, updated_at = $2 WHERE id = $3")
            .bind(content)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RequestError::NotFound("Comment not found"));
        }
        fetch_comment_with_author(&self.pool, id).await
    }

    async fn delete_comment(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

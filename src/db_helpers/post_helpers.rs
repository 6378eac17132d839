use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    errors::RequestError,
    expiry::ExpiryCheck,
    models::{NewPost, Post, PostChanges, PostDetails},
};

use super::{
    comment_helpers::fetch_comments_for_post,
    tag_helpers::{fetch_tags_for_post, replace_post_tags},
    DbResult, PostStore, SqliteStore,
};

const POST_COLUMNS: &str = "posts.id, posts.title, posts.body, posts.user_id, posts.created_at, posts.updated_at";

async fn fetch_post(pool: &SqlitePool, id: i64) -> DbResult<Option<Post>> {
    let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE posts.id = $1");
    let result = sqlx::query_as::<_, Post>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

async fn load_details(pool: &SqlitePool, post: Post) -> DbResult<PostDetails> {
    let tags = fetch_tags_for_post(pool, post.id).await?;
    let comments = fetch_comments_for_post(pool, post.id).await?;
    Ok(PostDetails {
        post,
        tags,
        comments,
    })
}

async fn fetch_post_details(pool: &SqlitePool, id: i64) -> DbResult<Option<PostDetails>> {
    match fetch_post(pool, id).await? {
        Some(post) => Ok(Some(load_details(pool, post).await?)),
        None => Ok(None),
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn list_posts(&self, tag_id: Option<i64>) -> DbResult<Vec<PostDetails>> {
        let query = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE $1 IS NULL
               OR EXISTS (SELECT 1
                          FROM post_tags
                          WHERE post_tags.post_id = posts.id
                            AND post_tags.tag_id = $2)
            ORDER BY posts.id
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&query)
            .bind(tag_id)
            .bind(tag_id)
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(posts.len());
        for post in posts {
            result.push(load_details(&self.pool, post).await?);
        }
        Ok(result)
    }

    async fn get_post(&self, id: i64) -> DbResult<Option<Post>> {
        fetch_post(&self.pool, id).await
    }

    async fn get_post_details(&self, id: i64) -> DbResult<Option<PostDetails>> {
        fetch_post_details(&self.pool, id).await
    }

    async fn create_post(
        &self,
        owner_id: i64,
        NewPost { title, body, tags }: NewPost,
        now: DateTime<Utc>,
    ) -> DbResult<(PostDetails, ExpiryCheck)> {
        let mut tx = self.pool.begin().await?;

        let post_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, body, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&title)
        .bind(&body)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut tx)
        .await?;

        replace_post_tags(&mut tx, post_id, &tags, now).await?;
        tx.commit().await?;

        let details = fetch_post_details(&self.pool, post_id)
            .await?
            .ok_or(RequestError::NotFound("Post not found"))?;
        let check = ExpiryCheck::for_post(&details.post);
        Ok((details, check))
    }

    async fn update_post(
        &self,
        id: i64,
        PostChanges { title, body, tags }: PostChanges,
        now: DateTime<Utc>,
    ) -> DbResult<PostDetails> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($1, title),
                body = COALESCE($2, body),
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(title)
        .bind(body)
        .bind(now)
        .bind(id)
        .execute(&mut tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RequestError::NotFound("Post not found"));
        }

        if let Some(tags) = tags {
            replace_post_tags(&mut tx, id, &tags, now).await?;
        }
        tx.commit().await?;

        fetch_post_details(&self.pool, id)
            .await?
            .ok_or(RequestError::NotFound("Post not found"))
    }

    async fn delete_post(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_post_ages(&self) -> DbResult<Vec<(i64, DateTime<Utc>)>> {
        let result = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "SELECT id, created_at FROM posts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(result)
    }
}

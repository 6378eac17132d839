use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::{
    models::{Tag, TagRemoval},
    tags::normalize_tag_name,
};

use super::{DbResult, SqliteStore, TagStore};

const POST_TAGS_QUERY: &str = r#"
        SELECT tags.id AS "id", tags.name AS "name"
        FROM tags
            JOIN post_tags ON post_tags.tag_id = tags.id
        WHERE post_tags.post_id = $1
        ORDER BY post_tags.id
"#;

pub(super) async fn fetch_tags_for_post(pool: &SqlitePool, post_id: i64) -> DbResult<Vec<Tag>> {
    let result = sqlx::query_as::<_, Tag>(POST_TAGS_QUERY)
        .bind(post_id)
        .fetch_all(pool)
        .await?;
    Ok(result)
}

/// Replaces the post's tag set with `names`, creating missing tags.
///
/// The upsert makes find-or-create safe when two writers introduce the same
/// new tag at once: both end up with the single surviving row.
pub(super) async fn replace_post_tags(
    tx: &mut Transaction<'_, Sqlite>,
    post_id: i64,
    names: &[String],
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    for name in names {
        let tag_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tags (name, created_at, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(normalize_tag_name(name))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, tag_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl TagStore for SqliteStore {
    async fn list_tags(&self) -> DbResult<Vec<Tag>> {
        let result = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(result)
    }

    async fn get_tag(&self, id: i64) -> DbResult<Option<Tag>> {
        let result = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(result)
    }

    async fn insert_tag(&self, name: &str, now: DateTime<Utc>) -> DbResult<Tag> {
        let result = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, created_at, updated_at)
            VALUES ($1, $2, $3)
            RETURNING id, name
            "#,
        )
        .bind(normalize_tag_name(name))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(result)
    }

    async fn tags_for_post(&self, post_id: i64) -> DbResult<Vec<Tag>> {
        fetch_tags_for_post(&self.pool, post_id).await
    }

    async fn remove_tag_from_post(&self, post_id: i64, tag_id: i64) -> DbResult<TagRemoval> {
        let result = sqlx::query(
            r#"
            DELETE FROM post_tags
            WHERE post_id = $1 AND tag_id = $2
                AND (SELECT COUNT(*) FROM post_tags WHERE post_id = $3) > 1
            "#,
        )
        .bind(post_id)
        .bind(tag_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(TagRemoval::Removed);
        }

        let attached: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM post_tags WHERE post_id = $1 AND tag_id = $2",
        )
        .bind(post_id)
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await?;
        if attached > 0 {
            Ok(TagRemoval::LastTag)
        } else {
            Ok(TagRemoval::NotAttached)
        }
    }
}

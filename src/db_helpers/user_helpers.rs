use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{NewUser, User};

use super::{DbResult, SqliteStore, UserStore};

const USER_COLUMNS: &str =
    "id, name, email, password_digest, image, created_at, updated_at";

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert_user(&self, user: &NewUser, now: DateTime<Utc>) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;
        let query = format!(
            r#"
            INSERT INTO users (name, email, password_digest, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, User>(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_digest)
            .bind(&user.image)
            .bind(now)
            .bind(now)
            .fetch_one(&mut tx)
            .await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let result = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(result)
    }

    async fn get_user_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let result = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(result)
    }

    async fn delete_user(&self, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

use sqlx::PgPool;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::db::models::{Image, RefreshTokenRecord, User};
use crate::error::AppError;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use std::sync::Arc;

#[derive(Clone)]
pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn get_pool_status(&self) -> Result<DbPoolStatus, AppError> {
        let size = self.pool.size() as u32;
        let idle = self.pool.num_idle() as u32;
        let active = size - idle;

        Ok(DbPoolStatus {
            total_connections: size,
            active_connections: active,
            idle_connections: idle,
        })
    }

    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))
    }

    pub async fn create_user(&self, user: &User) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    pub async fn create_refresh_token(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<RefreshTokenRecord, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (id, jti, user_id, expires_at, revoked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, jti, user_id, expires_at, revoked, created_at
            "#,
        )
        .bind(record.id)
        .bind(record.jti)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.revoked)
        .bind(record.created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    pub async fn get_refresh_token_by_jti(
        &self,
        jti: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, jti, user_id, expires_at, revoked, created_at FROM refresh_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    /// Revoke a still-active, unexpired refresh token. Returns false when the
    /// row was already revoked, already expired, or never existed.
    ///
    /// This single conditional UPDATE is the serialization point for refresh
    /// rotation: of two concurrent calls presenting the same jti, exactly one
    /// observes an affected row.
    pub async fn revoke_refresh_token(
        &self,
        jti: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1 AND NOT revoked AND expires_at > $2",
        )
        .bind(jti)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Owner-scoped revocation for logout. Matching on (jti, user_id) keeps
    /// one user from revoking another's token with a guessed jti.
    pub async fn revoke_refresh_token_for_user(
        &self,
        jti: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1 AND user_id = $2 AND NOT revoked",
        )
        .bind(jti)
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired_refresh_tokens(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_image(&self, image: &Image) -> Result<Image, AppError> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (id, user_id, url, public_id, processed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, url, public_id, processed, created_at, updated_at
            "#,
        )
        .bind(image.id)
        .bind(image.user_id)
        .bind(&image.url)
        .bind(&image.public_id)
        .bind(image.processed)
        .bind(image.created_at)
        .bind(image.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(image)
    }

    pub async fn get_image_by_id(&self, id: Uuid) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<_, Image>(
            "SELECT id, user_id, url, public_id, processed, created_at, updated_at FROM images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(image)
    }

    pub async fn list_images_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, user_id, url, public_id, processed, created_at, updated_at
            FROM images
            WHERE user_id = $1
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(images)
    }

    pub async fn delete_image(&self, id: Uuid) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            DELETE FROM images WHERE id = $1
            RETURNING id, user_id, url, public_id, processed, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(image)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

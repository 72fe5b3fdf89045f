//! User domain methods on Repository

use chrono::Utc;

use super::{is_unique_violation, Repository};
use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserStatus, UserSummary},
};

impl Repository {
    /// Get user by ID
    pub async fn users_get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username
    pub async fn users_get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Check if username already exists
    pub async fn users_username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Create a user together with its status row
    pub async fn users_create(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
        is_staff: bool,
    ) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, is_staff, date_joined)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(is_staff)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("username already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        sqlx::query("INSERT INTO user_status (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Non-staff users ordered by username
    pub async fn users_list_patrons(&self) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email FROM users WHERE is_staff = FALSE ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Update online/blocked flags, creating the status row if needed.
    /// Setting the online flag also stamps `last_seen`.
    pub async fn users_update_status(
        &self,
        user_id: i32,
        is_online: Option<bool>,
        is_blocked: Option<bool>,
    ) -> AppResult<UserStatus> {
        let last_seen = is_online.map(|_| Utc::now());

        let status = sqlx::query_as::<_, UserStatus>(
            r#"
            INSERT INTO user_status (user_id, is_online, is_blocked, last_seen)
            VALUES ($1, COALESCE($2, FALSE), COALESCE($3, FALSE), $4)
            ON CONFLICT (user_id) DO UPDATE SET
                is_online = COALESCE($2, user_status.is_online),
                is_blocked = COALESCE($3, user_status.is_blocked),
                last_seen = COALESCE($4, user_status.last_seen)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(is_online)
        .bind(is_blocked)
        .bind(last_seen)
        .fetch_one(&self.pool)
        .await?;
        Ok(status)
    }

    /// Replace a user's password hash
    pub async fn users_set_password(&self, user_id: i32, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        Ok(())
    }
}

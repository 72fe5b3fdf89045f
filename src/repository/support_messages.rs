//! Support message methods on Repository

use chrono::Utc;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::support_message::SupportMessage,
};

impl Repository {
    /// Store a new support message
    pub async fn support_messages_create(&self, name: &str, email: &str, message: &str) -> AppResult<SupportMessage> {
        let created = sqlx::query_as::<_, SupportMessage>(
            r#"
            INSERT INTO support_messages (name, email, message, created_at, processed)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Unprocessed messages first, then newest first
    pub async fn support_messages_list(&self) -> AppResult<Vec<SupportMessage>> {
        let rows = sqlx::query_as::<_, SupportMessage>(
            "SELECT * FROM support_messages ORDER BY processed ASC, created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn support_messages_mark_processed(&self, id: i32) -> AppResult<SupportMessage> {
        sqlx::query_as::<_, SupportMessage>(
            "UPDATE support_messages SET processed = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Support message not found".to_string()))
    }
}

//! Support inbox

use validator::Validate;

use crate::{
    error::AppResult,
    models::support_message::{CreateSupportMessage, SupportMessage},
    repository::Repository,
};

#[derive(Clone)]
pub struct SupportService {
    repository: Repository,
}

impl SupportService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Anyone may write in; blank name/email are stored as empty strings
    pub async fn submit(&self, data: CreateSupportMessage) -> AppResult<SupportMessage> {
        let data = CreateSupportMessage {
            email: data.email.filter(|e| !e.trim().is_empty()),
            ..data
        };
        data.validate()?;

        let message = self
            .repository
            .support_messages_create(
                data.name.as_deref().unwrap_or_default(),
                data.email.as_deref().unwrap_or_default(),
                &data.message,
            )
            .await?;

        tracing::info!("Support message {} received", message.id);
        Ok(message)
    }

    pub async fn list(&self) -> AppResult<Vec<SupportMessage>> {
        self.repository.support_messages_list().await
    }

    pub async fn mark_processed(&self, id: i32) -> AppResult<SupportMessage> {
        self.repository.support_messages_mark_processed(id).await
    }
}

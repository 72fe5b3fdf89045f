//! Support message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Contact message left for the administrators, possibly anonymously
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SupportMessage {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

/// Create support message request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupportMessage {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_rejected() {
        let msg = CreateSupportMessage {
            name: None,
            email: None,
            message: String::new(),
        };
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_anonymous_message_accepted() {
        let msg = CreateSupportMessage {
            name: None,
            email: None,
            message: "The return desk is closed".into(),
        };
        assert!(msg.validate().is_ok());
    }
}

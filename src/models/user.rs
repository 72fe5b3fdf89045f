//! User model, account status and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Lightweight user representation for nested displays and admin lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Online/blocked flags kept alongside a user account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserStatus {
    pub user_id: i32,
    pub is_online: bool,
    pub is_blocked: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 150, message = "Username must be between 3 and 150 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Administrator account creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminCreateUser {
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Falls back to the configured default password
    pub password: Option<String>,
    pub is_staff: Option<bool>,
}

/// Account creation response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedUser {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub is_staff: bool,
}

impl From<User> for CreatedUser {
    fn from(user: User) -> Self {
        CreatedUser {
            id: user.id,
            username: user.username,
            email: user.email,
            is_staff: user.is_staff,
        }
    }
}

/// Status update request (admin only)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserStatus {
    pub is_online: Option<bool>,
    pub is_blocked: Option<bool>,
    /// Reset the password to the configured default
    pub reset_password: Option<bool>,
}

/// Status update response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserStatusResponse {
    pub detail: String,
    pub is_online: bool,
    pub is_blocked: bool,
}

/// Credentials for the token endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Access + refresh token pair
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    pub access: String,
}

/// Kind of JWT issued by the token endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub username: String,
    pub is_staff: bool,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Build claims for a user, valid for `ttl` from now
    pub fn for_user(user: &User, token_type: TokenType, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        UserClaims {
            sub: user.id.to_string(),
            user_id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Require staff privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You do not have permission to perform this action.".to_string(),
            ))
        }
    }

    /// Owner of a record, or staff
    pub fn can_act_for(&self, owner_id: i32) -> bool {
        self.is_staff || self.user_id == owner_id
    }
}

//! Registration, password hashing and JWT issuance

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, TokenPair, TokenType, User, UserClaims, UserSummary},
    repository::Repository,
};

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Self-registration of a patron account
    pub async fn register(&self, data: RegisterUser) -> AppResult<UserSummary> {
        data.validate()?;

        if self.repository.users_username_exists(&data.username).await? {
            return Err(AppError::Conflict("username already exists".to_string()));
        }

        let password_hash = hash_password(&data.password)?;
        let email = data.email.as_deref().filter(|e| !e.is_empty());
        let user = self
            .repository
            .users_create(&data.username, email, &password_hash, false)
            .await?;

        tracing::info!("Registered user {} ({})", user.username, user.id);
        Ok(UserSummary::from(&user))
    }

    /// Exchange credentials for an access/refresh pair
    pub async fn obtain_tokens(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let user = self
            .repository
            .users_get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&user.password_hash, password)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        Ok(TokenPair {
            access: self.issue(&user, TokenType::Access)?,
            refresh: self.issue(&user, TokenType::Refresh)?,
        })
    }

    /// Issue a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = UserClaims::from_token(refresh_token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Token is invalid or expired".to_string()))?;

        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication("Token has wrong type".to_string()));
        }

        // Pick up staff changes made since the refresh token was issued
        let user = self.repository.users_get_by_id(claims.user_id).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::Authentication("User not found".to_string()),
            other => other,
        })?;

        self.issue(&user, TokenType::Access)
    }

    /// Decode a bearer token; only access tokens authenticate requests
    pub fn verify_access(&self, token: &str) -> AppResult<UserClaims> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::Authentication("Token has wrong type".to_string()));
        }
        Ok(claims)
    }

    fn issue(&self, user: &User, token_type: TokenType) -> AppResult<String> {
        let ttl = match token_type {
            TokenType::Access => chrono::Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => chrono::Duration::days(self.config.refresh_token_days),
        };

        UserClaims::for_user(user, token_type, ttl)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

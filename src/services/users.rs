//! Administrative user management

use validator::Validate;

use super::auth::hash_password;
use crate::{
    config::{BootstrapAdminConfig, LendingConfig},
    error::{AppError, AppResult},
    models::user::{AdminCreateUser, CreatedUser, UpdateUserStatus, UserStatusResponse, UserSummary},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: LendingConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self { repository, config }
    }

    /// Patrons (non-staff users) ordered by username
    pub async fn list_patrons(&self) -> AppResult<Vec<UserSummary>> {
        self.repository.users_list_patrons().await
    }

    /// Create an account on behalf of someone; password defaults to the
    /// configured default password
    pub async fn create_user(&self, data: AdminCreateUser) -> AppResult<CreatedUser> {
        data.validate()?;

        let username = data
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::BadRequest("username required".to_string()))?;

        if self.repository.users_username_exists(username).await? {
            return Err(AppError::Conflict("username already exists".to_string()));
        }

        let password = data
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.config.default_password);
        let password_hash = hash_password(password)?;
        let email = data.email.as_deref().filter(|e| !e.is_empty());

        let user = self
            .repository
            .users_create(username, email, &password_hash, data.is_staff.unwrap_or(false))
            .await?;

        tracing::info!("Account {} ({}) created by staff", user.username, user.id);
        Ok(CreatedUser::from(user))
    }

    /// Create the configured staff account unless the username is taken
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdminConfig) -> AppResult<()> {
        if self.repository.users_username_exists(&admin.username).await? {
            return Ok(());
        }
        let password_hash = hash_password(&admin.password)?;
        let user = self
            .repository
            .users_create(&admin.username, None, &password_hash, true)
            .await?;
        tracing::info!("Bootstrap staff account {} ({}) created", user.username, user.id);
        Ok(())
    }

    /// Update online/blocked flags and optionally reset the password
    pub async fn update_status(&self, user_id: i32, data: UpdateUserStatus) -> AppResult<UserStatusResponse> {
        self.repository.users_get_by_id(user_id).await?;

        let status = self
            .repository
            .users_update_status(user_id, data.is_online, data.is_blocked)
            .await?;

        if data.reset_password.unwrap_or(false) {
            let password_hash = hash_password(&self.config.default_password)?;
            self.repository.users_set_password(user_id, &password_hash).await?;
            tracing::info!("Password of user {} reset to default", user_id);
        }

        if let Some(blocked) = data.is_blocked {
            tracing::info!("User {} blocked: {}", user_id, blocked);
        }

        Ok(UserStatusResponse {
            detail: "status updated".to_string(),
            is_online: status.is_online,
            is_blocked: status.is_blocked,
        })
    }
}

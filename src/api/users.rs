//! Administrative user endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{AdminCreateUser, CreatedUser, UpdateUserStatus, UserStatusResponse, UserSummary},
    AppState,
};

use super::AuthenticatedUser;

/// Patrons ordered by username
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Non-staff users", body = Vec<UserSummary>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    claims.require_staff()?;

    let users = state.services.users.list_patrons().await?;
    Ok(Json(users))
}

/// Create an account; the password defaults to the configured one
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = AdminCreateUser,
    responses(
        (status = 201, description = "User created", body = CreatedUser),
        (status = 400, description = "Missing or duplicate username"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<AdminCreateUser>,
) -> AppResult<(StatusCode, Json<CreatedUser>)> {
    claims.require_staff()?;

    let user = state.services.users.create_user(data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update online/blocked flags or reset the password
#[utoipa::path(
    post,
    path = "/admin/users/{id}/status",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserStatus,
    responses(
        (status = 200, description = "Status updated", body = UserStatusResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateUserStatus>,
) -> AppResult<Json<UserStatusResponse>> {
    claims.require_staff()?;

    let status = state.services.users.update_status(id, data).await?;
    Ok(Json(status))
}

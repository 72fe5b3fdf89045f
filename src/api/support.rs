//! Support inbox endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::support_message::{CreateSupportMessage, SupportMessage},
    AppState,
};

use super::AuthenticatedUser;

/// Leave a message for the library staff; no account needed
#[utoipa::path(
    post,
    path = "/support",
    tag = "support",
    request_body = CreateSupportMessage,
    responses(
        (status = 201, description = "Message stored", body = SupportMessage),
        (status = 400, description = "Blank message or invalid email"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn submit_message(
    State(state): State<AppState>,
    Json(data): Json<CreateSupportMessage>,
) -> AppResult<(StatusCode, Json<SupportMessage>)> {
    let message = state.services.support.submit(data).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Unprocessed messages first
#[utoipa::path(
    get,
    path = "/support",
    tag = "support",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Support messages", body = Vec<SupportMessage>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SupportMessage>>> {
    claims.require_staff()?;

    let messages = state.services.support.list().await?;
    Ok(Json(messages))
}

#[utoipa::path(
    post,
    path = "/support/{id}/processed",
    tag = "support",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message marked processed", body = SupportMessage),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Message not found")
    )
)]
pub async fn mark_processed(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<SupportMessage>> {
    claims.require_staff()?;

    let message = state.services.support.mark_processed(id).await?;
    Ok(Json(message))
}

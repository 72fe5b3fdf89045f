//! Lending endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::borrow::{BorrowActionRequest, BorrowDetails, BorrowRequest},
    AppState,
};

use super::AuthenticatedUser;

/// Borrow a book; staff may borrow on behalf of another user
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "lending",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowDetails),
        (status = 400, description = "Missing book_id, unknown target user, duplicate borrow or no copies left"),
        (status = 403, description = "Target user is blocked"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowDetails>)> {
    let borrow = state.services.lending.borrow(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/return",
    tag = "lending",
    security(("bearer_auth" = [])),
    request_body = BorrowActionRequest,
    responses(
        (status = 200, description = "Book returned", body = BorrowDetails),
        (status = 400, description = "Missing borrow_id or borrow not in 'borrowed' state"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowActionRequest>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow_id = request.require_borrow_id()?;

    let borrow = state.services.lending.return_borrow(&claims, borrow_id).await?;
    Ok(Json(borrow))
}

/// Report a borrowed book as lost
#[utoipa::path(
    post,
    path = "/report-lost",
    tag = "lending",
    security(("bearer_auth" = [])),
    request_body = BorrowActionRequest,
    responses(
        (status = 200, description = "Borrow marked lost", body = BorrowDetails),
        (status = 400, description = "Missing borrow_id or borrow already lost/returned"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn report_lost(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowActionRequest>,
) -> AppResult<Json<BorrowDetails>> {
    let borrow_id = request.require_borrow_id()?;

    let borrow = state.services.lending.report_lost(&claims, borrow_id).await?;
    Ok(Json(borrow))
}

/// Record a fine as paid
#[utoipa::path(
    post,
    path = "/approve-fine",
    tag = "lending",
    security(("bearer_auth" = [])),
    request_body = BorrowActionRequest,
    responses(
        (status = 200, description = "Fine marked paid", body = BorrowDetails),
        (status = 400, description = "Missing borrow_id"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn approve_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowActionRequest>,
) -> AppResult<Json<BorrowDetails>> {
    claims.require_staff()?;
    let borrow_id = request.require_borrow_id()?;

    let borrow = state.services.lending.approve_fine(borrow_id).await?;
    Ok(Json(borrow))
}

/// Borrows of the current user, newest first
#[utoipa::path(
    get,
    path = "/my-borrows",
    tag = "lending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own borrows", body = Vec<BorrowDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    let borrows = state.services.lending.my_borrows(&claims).await?;
    Ok(Json(borrows))
}

/// Every borrow, newest first
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "lending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All borrows", body = Vec<BorrowDetails>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    claims.require_staff()?;

    let borrows = state.services.lending.all_borrows().await?;
    Ok(Json(borrows))
}

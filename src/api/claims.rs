//! Claim endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::claim::{ClaimDecision, ClaimDetails, CreateClaimRequest, ReviewClaimRequest},
    AppState,
};

use super::{AuthenticatedUser, DetailResponse};

/// Claims visible to the caller: all for staff, own otherwise
#[utoipa::path(
    get,
    path = "/claims",
    tag = "claims",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Claims, newest first", body = Vec<ClaimDetails>)
    )
)]
pub async fn list_claims(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ClaimDetails>>> {
    let list = state.services.claims.list(&claims).await?;
    Ok(Json(list))
}

/// File a claim against a borrow
#[utoipa::path(
    post,
    path = "/claims",
    tag = "claims",
    security(("bearer_auth" = [])),
    request_body = CreateClaimRequest,
    responses(
        (status = 201, description = "Claim created", body = ClaimDetails),
        (status = 400, description = "Missing fields, fine already paid or invalid offer"),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn create_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateClaimRequest>,
) -> AppResult<(StatusCode, Json<ClaimDetails>)> {
    let claim = state.services.claims.create(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(claim)))
}

#[utoipa::path(
    get,
    path = "/claims/{id}",
    tag = "claims",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Claim details", body = ClaimDetails),
        (status = 403, description = "Not the claimant"),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn get_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ClaimDetails>> {
    let claim = state.services.claims.get(&claims, id).await?;
    Ok(Json(claim))
}

#[utoipa::path(
    delete,
    path = "/claims/{id}",
    tag = "claims",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Claim ID")),
    responses(
        (status = 204, description = "Claim deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn delete_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.claims.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve or decline a claim by path
#[utoipa::path(
    post,
    path = "/claims/{id}/{action}",
    tag = "claims",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Claim ID"),
        ("action" = String, Path, description = "approve or decline")
    ),
    responses(
        (status = 200, description = "Claim reviewed", body = DetailResponse),
        (status = 400, description = "Invalid action or claim already reviewed"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn claim_action(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, action)): Path<(i32, String)>,
) -> AppResult<Json<DetailResponse>> {
    claims.require_staff()?;
    let decision: ClaimDecision = action.parse()?;

    let detail = state.services.claims.review(claims.user_id, id, decision).await?;
    Ok(Json(DetailResponse::new(detail)))
}

/// Approve or decline a claim named in the body
#[utoipa::path(
    post,
    path = "/claims/review",
    tag = "claims",
    security(("bearer_auth" = [])),
    request_body = ReviewClaimRequest,
    responses(
        (status = 200, description = "Claim reviewed", body = DetailResponse),
        (status = 400, description = "Missing claim_id or claim already reviewed"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn review_claim(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReviewClaimRequest>,
) -> AppResult<Json<DetailResponse>> {
    claims.require_staff()?;
    let claim_id = request
        .claim_id
        .ok_or_else(|| AppError::BadRequest("claim_id required".to_string()))?;
    let decision = if request.approve {
        ClaimDecision::Approve
    } else {
        ClaimDecision::Decline
    };

    let detail = state.services.claims.review(claims.user_id, claim_id, decision).await?;
    Ok(Json(DetailResponse::new(detail)))
}

//! Claims workflow: patrons dispute fines, staff review

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        claim::{ClaimDecision, ClaimDetails, ClaimType, CreateClaimRequest},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ClaimsService {
    repository: Repository,
    saw_ratio: Decimal,
}

impl ClaimsService {
    pub fn new(repository: Repository, saw_ratio: Decimal) -> Self {
        Self { repository, saw_ratio }
    }

    pub async fn create(&self, requester: &UserClaims, request: CreateClaimRequest) -> AppResult<ClaimDetails> {
        let (borrow_id, raw_type) = match (request.borrow_id, request.claim_type.as_deref()) {
            (Some(id), Some(t)) if !t.is_empty() => (id, t),
            _ => return Err(AppError::BadRequest("borrow_id and type are required".to_string())),
        };
        let claim_type: ClaimType = raw_type.parse()?;

        self.repository
            .claims_create(
                borrow_id,
                requester,
                claim_type,
                request.offered_amount,
                request.message.as_deref().unwrap_or_default(),
                self.saw_ratio,
            )
            .await
    }

    /// Staff see every claim, patrons their own
    pub async fn list(&self, requester: &UserClaims) -> AppResult<Vec<ClaimDetails>> {
        let owner = if requester.is_staff { None } else { Some(requester.user_id) };
        self.repository.claims_list(owner).await
    }

    pub async fn get(&self, requester: &UserClaims, id: i32) -> AppResult<ClaimDetails> {
        let claim = self.repository.claims_get_details(id).await?;
        if !requester.can_act_for(claim.user.id) {
            return Err(AppError::Authorization("Not allowed to view this claim".to_string()));
        }
        Ok(claim)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.claims_delete(id).await?;
        tracing::info!("Claim {} deleted", id);
        Ok(())
    }

    /// Approve or decline a pending claim
    pub async fn review(&self, reviewer_id: i32, claim_id: i32, decision: ClaimDecision) -> AppResult<&'static str> {
        self.repository
            .claims_review(claim_id, reviewer_id, decision, self.saw_ratio)
            .await
    }
}

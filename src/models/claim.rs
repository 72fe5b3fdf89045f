//! Claim model and review rules
//!
//! A claim disputes the fine on a borrow. It is created `pending` and moves
//! once to `approved` or `declined`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::borrow::{Borrow, BorrowDetails, BorrowRow, BorrowStatus};
use super::user::UserSummary;
use crate::error::{AppError, AppResult};

/// What the patron is claiming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "claim_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    /// The patron saw the book and offers a partial payment
    Saw,
    /// The patron says the book was in fact returned
    Returned,
}

impl std::str::FromStr for ClaimType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "saw" => Ok(ClaimType::Saw),
            "returned" => Ok(ClaimType::Returned),
            _ => Err(AppError::Validation(format!("Invalid claim type: {}", s))),
        }
    }
}

/// Review state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "claim_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Declined,
}

/// Claim record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Claim {
    pub id: i32,
    pub borrow_id: i32,
    pub user_id: i32,
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub message: String,
    pub offered_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Claim {
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status != ClaimStatus::Pending {
            return Err(AppError::Conflict("Claim has already been reviewed".to_string()));
        }
        Ok(())
    }
}

/// Amount an offer is measured against: the outstanding fine, or the
/// book's lost fine when nothing is outstanding yet.
pub fn fine_baseline(borrow: &Borrow, lost_fine: Decimal) -> Decimal {
    if borrow.fine_due > Decimal::ZERO {
        borrow.fine_due
    } else {
        lost_fine
    }
}

/// Default offer for a "saw" claim: `ratio` of the lost fine, to the cent.
/// No default when the book carries no lost fine.
pub fn default_offer(lost_fine: Decimal, ratio: Decimal) -> Option<Decimal> {
    if lost_fine.is_zero() {
        None
    } else {
        Some((lost_fine * ratio).round_dp(2))
    }
}

/// Validate a new claim against its borrow and resolve the offered amount
/// to store.
pub fn prepare_offer(
    borrow: &Borrow,
    claim_type: ClaimType,
    offered_amount: Option<Decimal>,
    lost_fine: Decimal,
    ratio: Decimal,
) -> AppResult<Option<Decimal>> {
    if borrow.fine_paid {
        return Err(AppError::Conflict(
            "Fine already paid for this borrow; cannot submit a claim.".to_string(),
        ));
    }
    if claim_type == ClaimType::Saw && borrow.status == BorrowStatus::Returned {
        return Err(AppError::Conflict(
            "Cannot submit 'saw' claim for a returned borrow.".to_string(),
        ));
    }

    let baseline = fine_baseline(borrow, lost_fine);
    match offered_amount {
        Some(amount) => {
            if amount < Decimal::ZERO {
                return Err(AppError::Validation("offered_amount must be >= 0".to_string()));
            }
            if amount > baseline {
                return Err(AppError::Validation(
                    "offered_amount cannot exceed the current fine.".to_string(),
                ));
            }
            Ok(Some(amount))
        }
        None if claim_type == ClaimType::Saw && borrow.status == BorrowStatus::Lost => {
            Ok(default_offer(lost_fine, ratio).map(|offer| offer.min(baseline)))
        }
        None => Ok(None),
    }
}

/// Effect of approving a claim on its borrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// Offer actually applied (for "saw" claims)
    pub applied_offer: Option<Decimal>,
    /// A copy goes back on the shelf
    pub copy_restored: bool,
    pub detail: &'static str,
}

/// Apply an approved claim to its borrow.
///
/// "saw": the offer (or the default offer, or zero) is deducted from the
/// fine; a fully covered fine is cleared and a lost borrow is settled as
/// returned. "returned": the fine is cleared and the borrow forced to
/// returned.
pub fn apply_approval(
    claim: &Claim,
    borrow: &mut Borrow,
    lost_fine: Decimal,
    ratio: Decimal,
    now: DateTime<Utc>,
) -> Approval {
    match claim.claim_type {
        ClaimType::Saw => {
            let offer = claim
                .offered_amount
                .or_else(|| default_offer(lost_fine, ratio))
                .unwrap_or(Decimal::ZERO);
            let remaining = borrow.fine_due - offer;

            let mut copy_restored = false;
            if remaining <= Decimal::ZERO {
                borrow.fine_due = Decimal::ZERO;
                borrow.fine_paid = true;
                if borrow.status == BorrowStatus::Lost {
                    copy_restored = borrow.mark_returned(now);
                }
            } else {
                borrow.fine_due = remaining;
            }

            Approval {
                applied_offer: Some(offer),
                copy_restored,
                detail: "claim approved and fine updated/borrow possibly returned",
            }
        }
        ClaimType::Returned => {
            borrow.fine_due = Decimal::ZERO;
            borrow.fine_paid = true;
            let copy_restored = borrow.mark_returned(now);

            Approval {
                applied_offer: claim.offered_amount,
                copy_restored,
                detail: "returned claim approved; borrow marked returned",
            }
        }
    }
}

/// Claim joined with its claimant and borrow
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: i32,
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub message: String,
    pub offered_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub claimant_id: i32,
    pub claimant_username: String,
    pub claimant_email: Option<String>,
    #[sqlx(flatten)]
    pub borrow: BorrowRow,
}

impl From<ClaimRow> for ClaimDetails {
    fn from(row: ClaimRow) -> Self {
        ClaimDetails {
            id: row.id,
            user: UserSummary {
                id: row.claimant_id,
                username: row.claimant_username,
                email: row.claimant_email,
            },
            borrow: row.borrow.into(),
            claim_type: row.claim_type,
            status: row.status,
            created_at: row.created_at,
            offered_amount: row.offered_amount,
            message: row.message,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
        }
    }
}

/// Claim for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimDetails {
    pub id: i32,
    pub user: UserSummary,
    pub borrow: BorrowDetails,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, example = "5.00")]
    pub offered_amount: Option<Decimal>,
    pub message: String,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Create claim request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateClaimRequest {
    pub borrow_id: Option<i32>,
    /// "saw" or "returned"
    #[serde(rename = "type")]
    pub claim_type: Option<String>,
    #[schema(value_type = Option<String>)]
    pub offered_amount: Option<Decimal>,
    pub message: Option<String>,
}

/// Body-driven review request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewClaimRequest {
    pub claim_id: Option<i32>,
    #[serde(default = "default_approve")]
    pub approve: bool,
}

fn default_approve() -> bool {
    true
}

/// Review decision taken by staff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    Approve,
    Decline,
}

impl std::str::FromStr for ClaimDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ClaimDecision::Approve),
            "decline" => Ok(ClaimDecision::Decline),
            _ => Err(AppError::BadRequest("invalid action".to_string())),
        }
    }
}

//! Claim domain methods on Repository

use chrono::Utc;
use rust_decimal::Decimal;

use super::{
    borrows::{book_lost_fine, lock_borrow, save_borrow},
    Repository, BOOK_COLUMNS, BORROW_COLUMNS,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        claim::{apply_approval, prepare_offer, Claim, ClaimDecision, ClaimDetails, ClaimRow, ClaimStatus, ClaimType},
        user::UserClaims,
    },
};

const CLAIM_COLUMNS: &str = r#"
    c.id, c.claim_type, c.status, c.message, c.offered_amount, c.created_at,
    c.reviewed_by, c.reviewed_at,
    cu.id AS claimant_id, cu.username AS claimant_username, cu.email AS claimant_email
"#;

const CLAIM_FROM: &str = r#"
    FROM claims c
    JOIN users cu ON cu.id = c.user_id
    JOIN borrows br ON br.id = c.borrow_id
    JOIN users bu ON bu.id = br.user_id
    JOIN books b ON b.id = br.book_id
    JOIN authors a ON a.id = b.author_id
"#;

fn claim_select(condition: &str) -> String {
    format!(
        "SELECT {}, {}, {} {} {}",
        CLAIM_COLUMNS, BORROW_COLUMNS, BOOK_COLUMNS, CLAIM_FROM, condition
    )
}

impl Repository {
    /// Get claim with claimant and borrow details
    pub async fn claims_get_details(&self, id: i32) -> AppResult<ClaimDetails> {
        sqlx::query_as::<_, ClaimRow>(&claim_select("WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(ClaimDetails::from)
            .ok_or_else(|| AppError::NotFound("Claim not found".to_string()))
    }

    /// Claims of one user, or of everyone, newest first
    pub async fn claims_list(&self, user_id: Option<i32>) -> AppResult<Vec<ClaimDetails>> {
        let query = claim_select("WHERE ($1::int IS NULL OR c.user_id = $1) ORDER BY c.created_at DESC, c.id DESC");
        let rows = sqlx::query_as::<_, ClaimRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ClaimDetails::from).collect())
    }

    /// File a claim against a borrow; the borrow stays locked while the
    /// offer is checked.
    pub async fn claims_create(
        &self,
        borrow_id: i32,
        requester: &UserClaims,
        claim_type: ClaimType,
        offered_amount: Option<Decimal>,
        message: &str,
        saw_ratio: Decimal,
    ) -> AppResult<ClaimDetails> {
        let mut tx = self.pool.begin().await?;

        let borrow = lock_borrow(&mut tx, borrow_id).await?;
        if !requester.can_act_for(borrow.user_id) {
            return Err(AppError::Authorization(
                "Not allowed to create claim for this borrow".to_string(),
            ));
        }

        let lost_fine = book_lost_fine(&mut tx, borrow.book_id).await?;
        let offer = prepare_offer(&borrow, claim_type, offered_amount, lost_fine, saw_ratio)?;

        let claim_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO claims (borrow_id, user_id, claim_type, status, message, offered_amount, created_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(borrow.id)
        .bind(requester.user_id)
        .bind(claim_type)
        .bind(message)
        .bind(offer)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Claim {} ({:?}) filed on borrow {} by user {}",
            claim_id,
            claim_type,
            borrow.id,
            requester.user_id
        );
        self.claims_get_details(claim_id).await
    }

    /// Approve or decline a pending claim. Returns the outcome message.
    pub async fn claims_review(
        &self,
        claim_id: i32,
        reviewer_id: i32,
        decision: ClaimDecision,
        saw_ratio: Decimal,
    ) -> AppResult<&'static str> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let claim = sqlx::query_as::<_, Claim>("SELECT * FROM claims WHERE id = $1 FOR UPDATE")
            .bind(claim_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Claim not found".to_string()))?;
        claim.ensure_pending()?;

        let (status, offered_amount, detail) = match decision {
            ClaimDecision::Decline => (ClaimStatus::Declined, claim.offered_amount, "claim declined"),
            ClaimDecision::Approve => {
                let mut borrow = lock_borrow(&mut tx, claim.borrow_id).await?;
                let lost_fine = book_lost_fine(&mut tx, borrow.book_id).await?;
                let approval = apply_approval(&claim, &mut borrow, lost_fine, saw_ratio, now);
                save_borrow(&mut tx, &borrow, approval.copy_restored).await?;
                (ClaimStatus::Approved, approval.applied_offer, approval.detail)
            }
        };

        sqlx::query(
            r#"
            UPDATE claims
            SET status = $2, offered_amount = $3, reviewed_by = $4, reviewed_at = $5
            WHERE id = $1
            "#,
        )
        .bind(claim.id)
        .bind(status)
        .bind(offered_amount)
        .bind(reviewer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Claim {} {:?} by user {}", claim.id, status, reviewer_id);
        Ok(detail)
    }

    /// Delete claim
    pub async fn claims_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM claims WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Claim not found".to_string()));
        }
        Ok(())
    }
}

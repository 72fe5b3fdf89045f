//! Borrow domain methods on Repository
//!
//! Every state change runs in one transaction and takes a row lock on the
//! borrow (or, for a new borrow, on the book) before reading it.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use super::{is_unique_violation, Repository, BOOK_COLUMNS, BORROW_COLUMNS, BORROW_FROM};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{ensure_can_borrow, Borrow, BorrowDetails, BorrowRow, BorrowStatus},
        user::UserClaims,
    },
};

/// Lock a borrow row for the rest of the transaction
pub(super) async fn lock_borrow(conn: &mut PgConnection, borrow_id: i32) -> AppResult<Borrow> {
    sqlx::query_as::<_, Borrow>("SELECT * FROM borrows WHERE id = $1 FOR UPDATE")
        .bind(borrow_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Borrow not found".to_string()))
}

/// Lost fine of the borrowed book
pub(super) async fn book_lost_fine(conn: &mut PgConnection, book_id: i32) -> AppResult<Decimal> {
    let fine: Decimal = sqlx::query_scalar("SELECT lost_fine FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(fine)
}

/// Write back a mutated borrow and, when asked, put a copy back on the shelf.
///
/// (user, book, status) is unique, so a borrow moving to `returned` first
/// removes an older returned record for the same user and book. Its claims
/// go with it through the cascade and are locked first: lock order is
/// claim, then borrow, as in a claim review.
pub(super) async fn save_borrow(conn: &mut PgConnection, borrow: &Borrow, restore_copy: bool) -> AppResult<()> {
    if borrow.status == BorrowStatus::Returned {
        sqlx::query(
            r#"
            SELECT c.id FROM claims c
            JOIN borrows br ON br.id = c.borrow_id
            WHERE br.user_id = $1 AND br.book_id = $2 AND br.status = 'returned' AND br.id <> $3
            ORDER BY c.id
            FOR UPDATE OF c
            "#,
        )
        .bind(borrow.user_id)
        .bind(borrow.book_id)
        .bind(borrow.id)
        .fetch_all(&mut *conn)
        .await?;

        let stale = sqlx::query(
            r#"
            DELETE FROM borrows
            WHERE user_id = $1 AND book_id = $2 AND status = 'returned' AND id <> $3
            "#,
        )
        .bind(borrow.user_id)
        .bind(borrow.book_id)
        .bind(borrow.id)
        .execute(&mut *conn)
        .await?;

        if stale.rows_affected() > 0 {
            tracing::debug!(
                "Removed {} stale returned borrow(s) for user {} and book {}",
                stale.rows_affected(),
                borrow.user_id,
                borrow.book_id
            );
        }
    }

    sqlx::query(
        r#"
        UPDATE borrows
        SET status = $2, return_date = $3, fine_due = $4, fine_paid = $5
        WHERE id = $1
        "#,
    )
    .bind(borrow.id)
    .bind(borrow.status)
    .bind(borrow.return_date)
    .bind(borrow.fine_due)
    .bind(borrow.fine_paid)
    .execute(&mut *conn)
    .await?;

    if restore_copy {
        sqlx::query("UPDATE books SET copies_available = copies_available + 1 WHERE id = $1")
            .bind(borrow.book_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

impl Repository {
    /// Get a borrow with user and book details
    pub async fn borrows_get_details(&self, id: i32) -> AppResult<BorrowDetails> {
        let query = format!("SELECT {}, {} {} WHERE br.id = $1", BORROW_COLUMNS, BOOK_COLUMNS, BORROW_FROM);
        sqlx::query_as::<_, BorrowRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(BorrowDetails::from)
            .ok_or_else(|| AppError::NotFound("Borrow not found".to_string()))
    }

    /// Borrows of one user, or of everyone, newest first
    pub async fn borrows_list(&self, user_id: Option<i32>) -> AppResult<Vec<BorrowDetails>> {
        let query = format!(
            "SELECT {}, {} {} WHERE ($1::int IS NULL OR br.user_id = $1) ORDER BY br.borrow_date DESC, br.id DESC",
            BORROW_COLUMNS, BOOK_COLUMNS, BORROW_FROM
        );
        let rows = sqlx::query_as::<_, BorrowRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BorrowDetails::from).collect())
    }

    /// Create a borrow, taking one copy off the shelf
    pub async fn borrows_create(&self, book_id: i32, user_id: i32) -> AppResult<BorrowDetails> {
        let mut tx = self.pool.begin().await?;

        let copies_available: i32 =
            sqlx::query_scalar("SELECT copies_available FROM books WHERE id = $1 FOR UPDATE")
                .bind(book_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrows WHERE user_id = $1 AND book_id = $2 AND status <> 'returned')",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        let is_blocked: bool = sqlx::query_scalar(
            "SELECT COALESCE((SELECT is_blocked FROM user_status WHERE user_id = $1), FALSE)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        ensure_can_borrow(copies_available, has_active, is_blocked)?;

        sqlx::query("UPDATE books SET copies_available = copies_available - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let borrow_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO borrows (user_id, book_id, borrow_date, status, fine_due, fine_paid)
            VALUES ($1, $2, $3, 'borrowed', 0.00, FALSE)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already has an active borrow for this book".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        tx.commit().await?;

        tracing::info!("Book {} borrowed by user {} (borrow {})", book_id, user_id, borrow_id);
        self.borrows_get_details(borrow_id).await
    }

    /// Return a borrowed book; owner or staff only
    pub async fn borrows_return(&self, borrow_id: i32, requester: &UserClaims) -> AppResult<BorrowDetails> {
        let mut tx = self.pool.begin().await?;

        let mut borrow = lock_borrow(&mut tx, borrow_id).await?;
        if !requester.can_act_for(borrow.user_id) {
            return Err(AppError::Authorization("Not allowed to return this borrow".to_string()));
        }

        borrow.return_book(Utc::now())?;
        save_borrow(&mut tx, &borrow, true).await?;

        tx.commit().await?;

        tracing::info!("Borrow {} returned (book {})", borrow.id, borrow.book_id);
        self.borrows_get_details(borrow_id).await
    }

    /// Mark a borrow lost and charge the book's lost fine; owner or staff only
    pub async fn borrows_report_lost(&self, borrow_id: i32, requester: &UserClaims) -> AppResult<BorrowDetails> {
        let mut tx = self.pool.begin().await?;

        let mut borrow = lock_borrow(&mut tx, borrow_id).await?;
        if !requester.can_act_for(borrow.user_id) {
            return Err(AppError::Authorization("Not allowed to report this borrow".to_string()));
        }

        let lost_fine = book_lost_fine(&mut tx, borrow.book_id).await?;
        borrow.report_lost(lost_fine)?;
        save_borrow(&mut tx, &borrow, false).await?;

        tx.commit().await?;

        tracing::info!("Borrow {} reported lost, fine due {}", borrow.id, borrow.fine_due);
        self.borrows_get_details(borrow_id).await
    }

    /// Record a paid fine; a lost borrow is settled as returned
    pub async fn borrows_approve_fine(&self, borrow_id: i32) -> AppResult<BorrowDetails> {
        let mut tx = self.pool.begin().await?;

        let mut borrow = lock_borrow(&mut tx, borrow_id).await?;
        let restored = borrow.approve_fine(Utc::now());
        save_borrow(&mut tx, &borrow, restored).await?;

        tx.commit().await?;

        tracing::info!("Fine approved for borrow {} (copy restored: {})", borrow.id, restored);
        self.borrows_get_details(borrow_id).await
    }
}

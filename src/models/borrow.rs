//! Borrow model and lending lifecycle rules
//!
//! A borrow moves through `borrowed -> returned` or `borrowed -> lost -> returned`.
//! The transition methods here only mutate the in-memory record and report
//! whether a copy must go back on the shelf; the repository persists the
//! result inside the transaction that locked the row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::{Book, BookRow};
use super::user::UserSummary;
use crate::error::{AppError, AppResult};

/// Borrow lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "borrow_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
    Lost,
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Lost => "lost",
        };
        write!(f, "{}", s)
    }
}

/// Borrow record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Borrow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub fine_due: Decimal,
    pub fine_paid: bool,
}

impl Borrow {
    /// Move to `returned`, clearing the fine.
    ///
    /// Returns `true` when the record was not already returned, i.e. when a
    /// copy has to be restored to the book.
    #[must_use]
    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == BorrowStatus::Returned {
            return false;
        }
        self.status = BorrowStatus::Returned;
        self.return_date = Some(now);
        self.fine_due = Decimal::ZERO;
        self.fine_paid = true;
        true
    }

    /// Patron (or staff) brings the book back
    pub fn return_book(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != BorrowStatus::Borrowed {
            return Err(AppError::Conflict(
                "Borrow is already returned or not in 'borrowed' state".to_string(),
            ));
        }
        let restored = self.mark_returned(now);
        debug_assert!(restored);
        Ok(())
    }

    /// Flag the borrowed copy as lost and charge the book's lost fine.
    ///
    /// A zero `lost_fine` keeps whatever fine was already due.
    pub fn report_lost(&mut self, lost_fine: Decimal) -> AppResult<()> {
        match self.status {
            BorrowStatus::Lost => {
                return Err(AppError::Conflict("Borrow already marked lost".to_string()))
            }
            BorrowStatus::Returned => {
                return Err(AppError::Conflict(
                    "Cannot report a returned borrow as lost".to_string(),
                ))
            }
            BorrowStatus::Borrowed => {}
        }
        self.status = BorrowStatus::Lost;
        if !lost_fine.is_zero() {
            self.fine_due = lost_fine;
        }
        self.fine_paid = false;
        Ok(())
    }

    /// Staff records the fine as paid. A lost borrow is settled as returned.
    ///
    /// Returns `true` when a copy has to be restored.
    #[must_use]
    pub fn approve_fine(&mut self, now: DateTime<Utc>) -> bool {
        self.fine_paid = true;
        if self.status == BorrowStatus::Lost {
            self.mark_returned(now)
        } else {
            false
        }
    }
}

/// Checks run, in order, before a new borrow is created
pub fn ensure_can_borrow(copies_available: i32, has_active_borrow: bool, target_blocked: bool) -> AppResult<()> {
    if has_active_borrow {
        return Err(AppError::Conflict(
            "User already has an active borrow for this book".to_string(),
        ));
    }
    if copies_available <= 0 {
        return Err(AppError::Conflict("No copies available".to_string()));
    }
    if target_blocked {
        return Err(AppError::Authorization("User is blocked".to_string()));
    }
    Ok(())
}

/// Borrow joined with its user, book and author
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRow {
    pub borrow_id: i32,
    pub borrow_user_id: i32,
    pub borrow_username: String,
    pub borrow_user_email: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub borrow_status: BorrowStatus,
    pub fine_due: Decimal,
    pub fine_paid: bool,
    #[sqlx(flatten)]
    pub book: BookRow,
}

impl From<BorrowRow> for BorrowDetails {
    fn from(row: BorrowRow) -> Self {
        BorrowDetails {
            id: row.borrow_id,
            user: UserSummary {
                id: row.borrow_user_id,
                username: row.borrow_username,
                email: row.borrow_user_email,
            },
            book: row.book.into(),
            borrow_date: row.borrow_date,
            return_date: row.return_date,
            status: row.borrow_status,
            fine_due: row.fine_due,
            fine_paid: row.fine_paid,
        }
    }
}

/// Borrow with nested user and book for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowDetails {
    pub id: i32,
    pub user: UserSummary,
    pub book: Book,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    #[schema(value_type = String, example = "0.00")]
    pub fine_due: Decimal,
    pub fine_paid: bool,
}

/// Borrow request; staff may borrow on behalf of another user
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub book_id: Option<i32>,
    /// Target user by username (staff only)
    pub username: Option<String>,
    /// Target user by id (staff only, ignored when username is given)
    pub user_id: Option<i32>,
}

/// Request body for return, report-lost and approve-fine
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BorrowActionRequest {
    pub borrow_id: Option<i32>,
}

impl BorrowActionRequest {
    pub fn require_borrow_id(&self) -> AppResult<i32> {
        self.borrow_id
            .ok_or_else(|| AppError::BadRequest("borrow_id required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrow(status: BorrowStatus) -> Borrow {
        Borrow {
            id: 1,
            user_id: 10,
            book_id: 20,
            borrow_date: Utc::now(),
            return_date: None,
            status,
            fine_due: Decimal::ZERO,
            fine_paid: false,
        }
    }

    #[test]
    fn test_return_clears_fine() {
        let mut b = borrow(BorrowStatus::Borrowed);
        b.fine_due = Decimal::new(500, 2);
        let now = Utc::now();
        b.return_book(now).unwrap();
        assert_eq!(b.status, BorrowStatus::Returned);
        assert_eq!(b.return_date, Some(now));
        assert!(b.fine_due.is_zero());
        assert!(b.fine_paid);
    }

    #[test]
    fn test_return_twice_rejected() {
        let mut b = borrow(BorrowStatus::Borrowed);
        b.return_book(Utc::now()).unwrap();
        assert!(matches!(b.return_book(Utc::now()), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_return_lost_rejected() {
        let mut b = borrow(BorrowStatus::Lost);
        assert!(matches!(b.return_book(Utc::now()), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_mark_returned_only_restores_once() {
        let mut b = borrow(BorrowStatus::Lost);
        assert!(b.mark_returned(Utc::now()));
        assert!(!b.mark_returned(Utc::now()));
    }

    #[test]
    fn test_report_lost_sets_fine() {
        let mut b = borrow(BorrowStatus::Borrowed);
        b.report_lost(Decimal::new(2000, 2)).unwrap();
        assert_eq!(b.status, BorrowStatus::Lost);
        assert_eq!(b.fine_due, Decimal::new(2000, 2));
        assert!(!b.fine_paid);
    }

    #[test]
    fn test_report_lost_zero_fine_keeps_existing() {
        let mut b = borrow(BorrowStatus::Borrowed);
        b.fine_due = Decimal::new(300, 2);
        b.report_lost(Decimal::ZERO).unwrap();
        assert_eq!(b.fine_due, Decimal::new(300, 2));
    }

    #[test]
    fn test_report_lost_twice_rejected() {
        let mut b = borrow(BorrowStatus::Lost);
        assert!(matches!(b.report_lost(Decimal::ONE), Err(AppError::Conflict(_))));
        let mut b = borrow(BorrowStatus::Returned);
        assert!(matches!(b.report_lost(Decimal::ONE), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_approve_fine_on_lost_returns_book() {
        let mut b = borrow(BorrowStatus::Lost);
        b.fine_due = Decimal::new(2000, 2);
        assert!(b.approve_fine(Utc::now()));
        assert_eq!(b.status, BorrowStatus::Returned);
        assert!(b.fine_paid);
        assert!(b.fine_due.is_zero());
    }

    #[test]
    fn test_approve_fine_on_borrowed_only_marks_paid() {
        let mut b = borrow(BorrowStatus::Borrowed);
        b.fine_due = Decimal::new(100, 2);
        assert!(!b.approve_fine(Utc::now()));
        assert_eq!(b.status, BorrowStatus::Borrowed);
        assert!(b.fine_paid);
        assert_eq!(b.fine_due, Decimal::new(100, 2));
    }

    #[test]
    fn test_ensure_can_borrow_order() {
        assert!(ensure_can_borrow(1, false, false).is_ok());

        match ensure_can_borrow(0, false, false) {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "No copies available"),
            other => panic!("unexpected: {:?}", other),
        }
        match ensure_can_borrow(0, true, true) {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("active borrow")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(ensure_can_borrow(3, false, true), Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&BorrowStatus::Lost).unwrap(), "\"lost\"");
        assert_eq!(BorrowStatus::Borrowed.to_string(), "borrowed");
    }

    #[test]
    fn test_require_borrow_id() {
        assert!(BorrowActionRequest::default().require_borrow_id().is_err());
        let req = BorrowActionRequest { borrow_id: Some(4) };
        assert_eq!(req.require_borrow_id().unwrap(), 4);
    }
}

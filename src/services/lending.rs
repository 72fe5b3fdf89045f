//! Lending workflow: borrow, return, report lost, approve fine

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{BorrowDetails, BorrowRequest},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book for the requester, or for another user when the
    /// requester is staff
    pub async fn borrow(&self, requester: &UserClaims, request: BorrowRequest) -> AppResult<BorrowDetails> {
        let book_id = request
            .book_id
            .ok_or_else(|| AppError::BadRequest("book_id is required".to_string()))?;

        self.repository.books_get_by_id(book_id).await?;

        let user_id = self.resolve_borrower(requester, &request).await?;
        self.repository.borrows_create(book_id, user_id).await
    }

    /// Staff may name the borrower by username (preferred) or id.
    /// Everyone else borrows for themselves.
    async fn resolve_borrower(&self, requester: &UserClaims, request: &BorrowRequest) -> AppResult<i32> {
        if !requester.is_staff {
            return Ok(requester.user_id);
        }

        if let Some(username) = request.username.as_deref().filter(|u| !u.is_empty()) {
            let user = self
                .repository
                .users_get_by_username(username)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("username '{}' not found", username)))?;
            return Ok(user.id);
        }

        if let Some(user_id) = request.user_id {
            let user = self.repository.users_get_by_id(user_id).await.map_err(|e| match e {
                AppError::NotFound(_) => AppError::BadRequest(format!("user_id '{}' not found", user_id)),
                other => other,
            })?;
            return Ok(user.id);
        }

        Ok(requester.user_id)
    }

    pub async fn return_borrow(&self, requester: &UserClaims, borrow_id: i32) -> AppResult<BorrowDetails> {
        self.repository.borrows_return(borrow_id, requester).await
    }

    pub async fn report_lost(&self, requester: &UserClaims, borrow_id: i32) -> AppResult<BorrowDetails> {
        self.repository.borrows_report_lost(borrow_id, requester).await
    }

    pub async fn approve_fine(&self, borrow_id: i32) -> AppResult<BorrowDetails> {
        self.repository.borrows_approve_fine(borrow_id).await
    }

    pub async fn my_borrows(&self, requester: &UserClaims) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows_list(Some(requester.user_id)).await
    }

    pub async fn all_borrows(&self) -> AppResult<Vec<BorrowDetails>> {
        self.repository.borrows_list(None).await
    }
}

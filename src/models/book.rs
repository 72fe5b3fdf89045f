//! Book model and related types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::Author;
use crate::error::{AppError, AppResult};

/// Book joined with its author, as read from the database.
///
/// Columns are aliased (`book_*`, `author_*`) so the row can be flattened
/// into larger joins without clashing.
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub book_id: i32,
    pub book_title: String,
    pub book_isbn: String,
    pub book_publication_year: Option<i32>,
    pub book_copies_available: i32,
    pub book_lost_fine: Decimal,
    pub author_id: i32,
    pub author_name: String,
    pub author_birth_date: Option<NaiveDate>,
    pub author_biography: String,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.book_id,
            title: row.book_title,
            isbn: row.book_isbn,
            author: Author {
                id: row.author_id,
                name: row.author_name,
                birth_date: row.author_birth_date,
                biography: row.author_biography,
            },
            publication_year: row.book_publication_year,
            copies_available: row.book_copies_available,
            lost_fine: row.book_lost_fine,
        }
    }
}

/// Book with nested author
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author: Author,
    pub publication_year: Option<i32>,
    /// Copies currently on the shelf
    pub copies_available: i32,
    /// Fine charged when a borrowed copy is reported lost
    #[schema(value_type = String, example = "20.00")]
    pub lost_fine: Decimal,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 20, message = "ISBN must be between 1 and 20 characters"))]
    pub isbn: String,
    pub author_id: i32,
    pub publication_year: Option<i32>,
    #[validate(range(min = 0, message = "copies_available must be 0 or greater."))]
    pub copies_available: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub lost_fine: Option<Decimal>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20, message = "ISBN must be between 1 and 20 characters"))]
    pub isbn: Option<String>,
    pub author_id: Option<i32>,
    pub publication_year: Option<i32>,
    #[validate(range(min = 0, message = "copies_available must be 0 or greater."))]
    pub copies_available: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub lost_fine: Option<Decimal>,
}

/// Reject negative fines; `range` validation does not cover decimals.
pub fn check_lost_fine(lost_fine: Option<Decimal>) -> AppResult<()> {
    match lost_fine {
        Some(fine) if fine < Decimal::ZERO => Err(AppError::Validation(
            "lost_fine must be 0 or greater.".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Matches title, ISBN or author name
    pub search: Option<String>,
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub author_id: Option<i32>,
    pub publication_year: Option<i32>,
    /// "1", "true" or "yes" keeps only books with copies on the shelf
    pub available: Option<String>,
    /// title, publication_year or copies_available, prefix with '-' for descending
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn only_available(&self) -> bool {
        self.available
            .as_deref()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// ORDER BY clause for the requested ordering; unknown fields fall back to title
    pub fn order_clause(&self) -> &'static str {
        match self.ordering.as_deref() {
            Some("-title") => "b.title DESC",
            Some("publication_year") => "b.publication_year ASC NULLS LAST, b.title",
            Some("-publication_year") => "b.publication_year DESC NULLS LAST, b.title",
            Some("copies_available") => "b.copies_available ASC, b.title",
            Some("-copies_available") => "b.copies_available DESC, b.title",
            _ => "b.title ASC",
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 200)
    }

    /// Rows to skip; a page past the addressable range is rejected
    pub fn offset(&self) -> AppResult<i64> {
        (self.page() - 1)
            .checked_mul(self.per_page())
            .ok_or_else(|| AppError::Validation("page is out of range".to_string()))
    }
}

/// One page of books
#[derive(Debug, Serialize, ToSchema)]
pub struct BookPage {
    pub items: Vec<Book>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_available() {
        let mut query = BookQuery::default();
        assert!(!query.only_available());
        for v in ["1", "true", "YES"] {
            query.available = Some(v.to_string());
            assert!(query.only_available());
        }
        query.available = Some("no".to_string());
        assert!(!query.only_available());
    }

    #[test]
    fn test_order_clause_is_whitelisted() {
        let mut query = BookQuery::default();
        assert_eq!(query.order_clause(), "b.title ASC");
        query.ordering = Some("-copies_available".to_string());
        assert_eq!(query.order_clause(), "b.copies_available DESC, b.title");
        query.ordering = Some("title; DROP TABLE books".to_string());
        assert_eq!(query.order_clause(), "b.title ASC");
    }

    #[test]
    fn test_pagination_bounds() {
        let query = BookQuery {
            page: Some(0),
            per_page: Some(1000),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 200);
        assert_eq!(query.offset().unwrap(), 0);

        let query = BookQuery {
            page: Some(3),
            per_page: Some(10),
            ..Default::default()
        };
        assert_eq!(query.offset().unwrap(), 20);
    }

    #[test]
    fn test_huge_page_is_rejected() {
        let query = BookQuery {
            page: Some(i64::MAX),
            per_page: Some(20),
            ..Default::default()
        };
        assert!(matches!(query.offset(), Err(AppError::Validation(_))));

        let query = BookQuery {
            page: Some(i64::MAX),
            per_page: Some(1),
            ..Default::default()
        };
        assert_eq!(query.offset().unwrap(), i64::MAX - 1);
    }

    #[test]
    fn test_check_lost_fine() {
        assert!(check_lost_fine(None).is_ok());
        assert!(check_lost_fine(Some(Decimal::ZERO)).is_ok());
        assert!(check_lost_fine(Some(Decimal::new(1999, 2))).is_ok());
        assert!(check_lost_fine(Some(Decimal::new(-1, 2))).is_err());
    }

    #[test]
    fn test_copies_range_validation() {
        let book = CreateBook {
            title: "Dune".into(),
            isbn: "9780441013593".into(),
            author_id: 1,
            publication_year: Some(1965),
            copies_available: Some(-1),
            lost_fine: None,
        };
        assert!(book.validate().is_err());
    }
}

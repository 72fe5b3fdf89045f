//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod borrows;
pub mod claims;
pub mod support_messages;
pub mod users;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

/// Book + author columns, aliased to match [`crate::models::book::BookRow`].
/// Expects `books b` and `authors a` in the FROM clause.
pub(crate) const BOOK_COLUMNS: &str = r#"
    b.id AS book_id, b.title AS book_title, b.isbn AS book_isbn,
    b.publication_year AS book_publication_year,
    b.copies_available AS book_copies_available, b.lost_fine AS book_lost_fine,
    a.id AS author_id, a.name AS author_name,
    a.birth_date AS author_birth_date, a.biography AS author_biography
"#;

pub(crate) const BOOK_FROM: &str = "FROM books b JOIN authors a ON a.id = b.author_id";

/// Borrow + borrower columns, to be combined with [`BOOK_COLUMNS`].
/// Expects `borrows br` and `users bu` in the FROM clause.
pub(crate) const BORROW_COLUMNS: &str = r#"
    br.id AS borrow_id, br.user_id AS borrow_user_id,
    bu.username AS borrow_username, bu.email AS borrow_user_email,
    br.borrow_date, br.return_date, br.status AS borrow_status,
    br.fine_due, br.fine_paid
"#;

pub(crate) const BORROW_FROM: &str = r#"
    FROM borrows br
    JOIN users bu ON bu.id = br.user_id
    JOIN books b ON b.id = br.book_id
    JOIN authors a ON a.id = b.author_id
"#;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// True when the error is a unique constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

//! Book domain methods on Repository

use sqlx::{Postgres, QueryBuilder};

use super::{is_unique_violation, Repository, BOOK_COLUMNS, BOOK_FROM};
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookRow, CreateBook, UpdateBook},
};

const DUPLICATE_ISBN: &str = "A book with this ISBN already exists.";

/// Append the WHERE conditions of a book search
fn push_book_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    builder.push(" WHERE 1=1");

    if let Some(ref search) = query.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.isbn ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(ref title) = query.title {
        builder.push(" AND b.title ILIKE ").push_bind(format!("%{}%", title));
    }
    if let Some(ref isbn) = query.isbn {
        builder.push(" AND b.isbn ILIKE ").push_bind(format!("%{}%", isbn));
    }
    if let Some(author_id) = query.author_id {
        builder.push(" AND b.author_id = ").push_bind(author_id);
    }
    if let Some(year) = query.publication_year {
        builder.push(" AND b.publication_year = ").push_bind(year);
    }
    if query.only_available() {
        builder.push(" AND b.copies_available > 0");
    }
}

impl Repository {
    /// Search books with filters, ordering and pagination
    pub async fn books_search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let offset = query.offset()?;

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {}", BOOK_FROM));
        push_book_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} {}", BOOK_COLUMNS, BOOK_FROM));
        push_book_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.order_clause())
            .push(" LIMIT ")
            .push_bind(query.per_page())
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = select
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Book::from).collect(), total))
    }

    /// Get book with its author
    pub async fn books_get_by_id(&self, id: i32) -> AppResult<Book> {
        let query = format!("SELECT {} {} WHERE b.id = $1", BOOK_COLUMNS, BOOK_FROM);
        sqlx::query_as::<_, BookRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::from)
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Check if an ISBN is already used by another book
    pub async fn books_isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create book
    pub async fn books_create(&self, data: &CreateBook) -> AppResult<Book> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, isbn, author_id, publication_year, copies_available, lost_fine)
            VALUES ($1, $2, $3, $4, COALESCE($5, 1), COALESCE($6, 0.00))
            RETURNING id
            "#,
        )
        .bind(&data.title)
        .bind(&data.isbn)
        .bind(data.author_id)
        .bind(data.publication_year)
        .bind(data.copies_available)
        .bind(data.lost_fine)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation(DUPLICATE_ISBN.to_string())
            } else {
                AppError::from(e)
            }
        })?;

        self.books_get_by_id(id).await
    }

    /// Update book; absent fields are left unchanged
    pub async fn books_update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut sets: Vec<String> = Vec::new();
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.isbn, "isbn");
        add_field!(data.author_id, "author_id");
        add_field!(data.publication_year, "publication_year");
        add_field!(data.copies_available, "copies_available");
        add_field!(data.lost_fine, "lost_fine");

        if sets.is_empty() {
            return self.books_get_by_id(id).await;
        }

        let query = format!("UPDATE books SET {} WHERE id = $1 RETURNING id", sets.join(", "));
        let mut builder = sqlx::query_scalar::<_, i32>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.isbn);
        bind_field!(data.author_id);
        bind_field!(data.publication_year);
        bind_field!(data.copies_available);
        bind_field!(data.lost_fine);

        let updated = builder
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Validation(DUPLICATE_ISBN.to_string())
                } else {
                    AppError::from(e)
                }
            })?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        self.books_get_by_id(updated).await
    }

    /// Delete book
    pub async fn books_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        Ok(())
    }
}

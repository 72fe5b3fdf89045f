//! Catalog management service: authors and books

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{check_lost_fine, Book, BookPage, BookQuery, CreateBook, UpdateBook},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors_list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors_get_by_id(id).await
    }

    pub async fn create_author(&self, data: CreateAuthor) -> AppResult<Author> {
        data.validate()?;
        let author = self.repository.authors_create(&data).await?;
        tracing::info!("Author {} created ({})", author.id, author.name);
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, data: UpdateAuthor) -> AppResult<Author> {
        data.validate()?;
        self.repository.authors_update(id, &data).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors_delete(id).await?;
        tracing::info!("Author {} deleted", id);
        Ok(())
    }

    /// Search books with filters and pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<BookPage> {
        let (items, total) = self.repository.books_search(query).await?;
        Ok(BookPage {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        })
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books_get_by_id(id).await
    }

    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;
        check_lost_fine(data.lost_fine)?;
        self.ensure_author(data.author_id).await?;

        if self.repository.books_isbn_exists(&data.isbn, None).await? {
            return Err(AppError::Validation("A book with this ISBN already exists.".to_string()));
        }

        let book = self.repository.books_create(&data).await?;
        tracing::info!("Book {} created ({})", book.id, book.isbn);
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        data.validate()?;
        check_lost_fine(data.lost_fine)?;
        if let Some(author_id) = data.author_id {
            self.ensure_author(author_id).await?;
        }

        if let Some(ref isbn) = data.isbn {
            if self.repository.books_isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Validation("A book with this ISBN already exists.".to_string()));
            }
        }

        self.repository.books_update(id, &data).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books_delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    async fn ensure_author(&self, author_id: i32) -> AppResult<()> {
        if !self.repository.authors_exists(author_id).await? {
            return Err(AppError::Validation(format!(
                "Invalid pk \"{}\" - object does not exist.",
                author_id
            )));
        }
        Ok(())
    }
}

//! Catalog service
//!
//! Book CRUD with field validation and ISBN uniqueness.

use std::sync::Arc;

use crate::domain::entities::{
    book, is_valid_isbn, Book, BookChanges, BookFilter, BookId, NewBook, DUPLICATE_ISBN,
};
use crate::domain::ports::BookRepository;
use crate::error::{AppError, DomainError, FieldErrors};

/// Service for managing the book catalogue
pub struct CatalogService<BR>
where
    BR: BookRepository,
{
    books: Arc<BR>,
}

impl<BR> CatalogService<BR>
where
    BR: BookRepository,
{
    pub fn new(books: Arc<BR>) -> Self {
        Self { books }
    }

    /// List books matching the filter, newest first
    pub async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>, AppError> {
        Ok(self.books.list(filter).await?)
    }

    /// List books with at least one copy on the shelf
    pub async fn list_available(&self, filter: &BookFilter) -> Result<Vec<Book>, AppError> {
        let filter = BookFilter {
            available_only: true,
            ..filter.clone()
        };
        Ok(self.books.list(&filter).await?)
    }

    pub async fn get(&self, id: BookId) -> Result<Book, AppError> {
        self.books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Add a book to the catalogue
    ///
    /// Negative counters are rejected; `available_copies` above
    /// `total_copies` is clamped.
    pub async fn create(&self, mut input: NewBook) -> Result<Book, AppError> {
        input.title = input.title.trim().to_string();
        input.author = input.author.trim().to_string();
        input.isbn = input.isbn.trim().to_string();

        let mut errors = FieldErrors::new();
        check_book_fields(
            &mut errors,
            &input.title,
            &input.author,
            &input.isbn,
            input.total_copies,
            input.available_copies,
        );
        errors.into_result()?;

        if self.books.find_by_isbn(&input.isbn).await?.is_some() {
            return Err(DomainError::field("isbn", DUPLICATE_ISBN).into());
        }

        input.normalize();
        let book = self.books.create(&input).await?;
        tracing::info!(book_id = %book.id, isbn = %book.isbn, "Book added to catalogue");
        Ok(book)
    }

    /// Apply a partial update; a full update is a partial update with every field set
    pub async fn update(&self, id: BookId, changes: BookChanges) -> Result<Book, AppError> {
        let book = self.get(id).await?;
        let isbn_changed = changes
            .isbn
            .as_deref()
            .is_some_and(|isbn| isbn.trim() != book.isbn);

        let changes = BookChanges {
            title: changes.title.map(|s| s.trim().to_string()),
            author: changes.author.map(|s| s.trim().to_string()),
            isbn: changes.isbn.map(|s| s.trim().to_string()),
            ..changes
        };

        // Validate before normalizing so negative counters are reported
        let mut errors = FieldErrors::new();
        check_book_fields(
            &mut errors,
            changes.title.as_deref().unwrap_or(&book.title),
            changes.author.as_deref().unwrap_or(&book.author),
            changes.isbn.as_deref().unwrap_or(&book.isbn),
            changes.total_copies.unwrap_or(book.total_copies),
            changes.available_copies.unwrap_or(book.available_copies),
        );
        errors.into_result()?;

        if isbn_changed {
            if let Some(isbn) = changes.isbn.as_deref() {
                if let Some(other) = self.books.find_by_isbn(isbn).await? {
                    if other.id != book.id {
                        return Err(DomainError::field("isbn", DUPLICATE_ISBN).into());
                    }
                }
            }
        }

        // Counters are applied to the locked row, not to the copy read above
        let book = self.books.update(id, &changes).await?;
        tracing::info!(book_id = %book.id, "Book updated");
        Ok(book)
    }

    /// Remove a book and its lending history
    pub async fn delete(&self, id: BookId) -> Result<(), AppError> {
        if !self.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }
}

fn check_book_fields(
    errors: &mut FieldErrors,
    title: &str,
    author: &str,
    isbn: &str,
    total_copies: i32,
    available_copies: i32,
) {
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > book::MAX_TITLE_LEN {
        errors.add(
            "title",
            format!(
                "Ensure this field has no more than {} characters.",
                book::MAX_TITLE_LEN
            ),
        );
    }

    if author.is_empty() {
        errors.add("author", "This field may not be blank.");
    } else if author.chars().count() > book::MAX_AUTHOR_LEN {
        errors.add(
            "author",
            format!(
                "Ensure this field has no more than {} characters.",
                book::MAX_AUTHOR_LEN
            ),
        );
    }

    if isbn.is_empty() {
        errors.add("isbn", "This field may not be blank.");
    } else if !is_valid_isbn(isbn) {
        errors.add(
            "isbn",
            format!(
                "Enter a valid ISBN: up to {} digits, optionally ending in X.",
                book::MAX_ISBN_LEN
            ),
        );
    }

    if total_copies < 0 {
        errors.add(
            "total_copies",
            "Ensure this value is greater than or equal to 0.",
        );
    }
    if available_copies < 0 {
        errors.add(
            "available_copies",
            "Ensure this value is greater than or equal to 0.",
        );
    }
}

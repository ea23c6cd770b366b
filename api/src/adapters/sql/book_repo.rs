//! SQL adapter for BookRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{contains_ci, search_term, unique_violation};
use crate::domain::entities::{Book, BookChanges, BookFilter, BookId, NewBook, DUPLICATE_ISBN};
use crate::domain::ports::BookRepository;
use crate::entity::books;
use crate::error::DomainError;

/// SeaORM implementation of BookRepository
pub struct SqlBookRepository {
    db: DatabaseConnection,
}

impl SqlBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<books::Model> for Book {
    fn from(m: books::Model) -> Self {
        Book {
            id: BookId(m.id),
            title: m.title,
            author: m.author,
            isbn: m.isbn,
            publication_date: m.publication_date,
            total_copies: m.total_copies,
            available_copies: m.available_copies,
            description: m.description,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, DomainError> {
        let result = books::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = books::Entity::find()
            .filter(books::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, DomainError> {
        let result = books::Entity::find()
            .filter(books::Column::Isbn.eq(isbn))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>, DomainError> {
        let mut query = books::Entity::find();

        if let Some(term) = search_term(&filter.search) {
            query = query.filter(
                Condition::any()
                    .add(contains_ci(books::Column::Title, term))
                    .add(contains_ci(books::Column::Author, term))
                    .add(contains_ci(books::Column::Isbn, term)),
            );
        }

        if filter.available_only {
            query = query.filter(books::Column::AvailableCopies.gt(0));
        }

        let results = query
            .order_by_desc(books::Column::CreatedAt)
            .order_by_desc(books::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn create(&self, book: &NewBook) -> Result<Book, DomainError> {
        let mut book = book.clone();
        book.normalize();
        let now = Utc::now().fixed_offset();

        let model = books::ActiveModel {
            title: Set(book.title),
            author: Set(book.author),
            isbn: Set(book.isbn),
            publication_date: Set(book.publication_date),
            total_copies: Set(book.total_copies),
            available_copies: Set(book.available_copies),
            description: Set(book.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, "isbn", DUPLICATE_ISBN))?;

        Ok(result.into())
    }

    async fn update(&self, id: BookId, changes: &BookChanges) -> Result<Book, DomainError> {
        let txn = self.db.begin().await?;

        // Lock the row so a concurrent issue or return cannot be overwritten
        // with a stale available_copies
        let current = books::Entity::find_by_id(id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Book {}", id)))?;

        let mut book = Book::from(current.clone());
        book.apply(changes.clone());

        let mut model: books::ActiveModel = current.into();
        model.title = Set(book.title);
        model.author = Set(book.author);
        model.isbn = Set(book.isbn);
        model.publication_date = Set(book.publication_date);
        model.total_copies = Set(book.total_copies);
        model.available_copies = Set(book.available_copies);
        model.description = Set(book.description);
        model.updated_at = Set(Utc::now().fixed_offset());

        let result = model
            .update(&txn)
            .await
            .map_err(|e| unique_violation(e, "isbn", DUPLICATE_ISBN))?;
        txn.commit().await?;

        Ok(result.into())
    }

    async fn delete(&self, id: BookId) -> Result<bool, DomainError> {
        let result = books::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

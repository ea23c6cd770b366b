//! Book handlers
//!
//! The catalogue is readable anonymously; changes require a signed-in caller.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{double_option, required, BookResponse, ListQuery};
use crate::auth::AuthUser;
use crate::domain::entities::{BookChanges, BookFilter, BookId, NewBook};
use crate::error::{AppError, FieldErrors, JsonBody};
use crate::AppState;

/// Body for creating or updating a book
///
/// On create, `title`, `author` and `isbn` are required and both copy counts
/// default to 1. On update every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct BookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub publication_date: Option<Option<NaiveDate>>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
    pub description: Option<String>,
}

impl BookRequest {
    /// Collect "required" errors for the fields a full write must carry
    fn check_required(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        required(&mut errors, "title", self.title.as_ref());
        required(&mut errors, "author", self.author.as_ref());
        required(&mut errors, "isbn", self.isbn.as_ref());
        errors.into_result()?;
        Ok(())
    }

    fn into_changes(self) -> BookChanges {
        BookChanges {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            publication_date: self.publication_date,
            total_copies: self.total_copies,
            available_copies: self.available_copies,
            description: self.description,
        }
    }
}

fn book_filter(query: &ListQuery) -> BookFilter {
    let (limit, offset) = query.page();
    BookFilter {
        search: query.search.clone(),
        available_only: false,
        limit,
        offset,
    }
}

/// GET /books
///
/// List the catalogue. `search` matches title, author or ISBN.
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let books = state.catalog_service.list(&book_filter(&query)).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// GET /books/available
pub async fn list_available_books(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookResponse>>, AppError> {
    let books = state
        .catalog_service
        .list_available(&book_filter(&query))
        .await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// GET /books/:id
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<BookResponse>, AppError> {
    let book = state.catalog_service.get(BookId(id)).await?;
    Ok(Json(book.into()))
}

/// POST /books
pub async fn create_book(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    JsonBody(request): JsonBody<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    request.check_required()?;

    let book = state
        .catalog_service
        .create(NewBook {
            title: request.title.unwrap_or_default(),
            author: request.author.unwrap_or_default(),
            isbn: request.isbn.unwrap_or_default(),
            publication_date: request.publication_date.flatten(),
            total_copies: request.total_copies.unwrap_or(1),
            available_copies: request.available_copies.unwrap_or(1),
            description: request.description.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(book.into())))
}

/// PUT /books/:id
///
/// Full update: `title`, `author` and `isbn` must be present.
pub async fn put_book(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<BookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    // Missing book wins over a malformed body
    state.catalog_service.get(BookId(id)).await?;
    request.check_required()?;

    let book = state
        .catalog_service
        .update(BookId(id), request.into_changes())
        .await?;
    Ok(Json(book.into()))
}

/// PATCH /books/:id
pub async fn patch_book(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<BookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let book = state
        .catalog_service
        .update(BookId(id), request.into_changes())
        .await?;
    Ok(Json(book.into()))
}

/// DELETE /books/:id
pub async fn delete_book(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.catalog_service.delete(BookId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

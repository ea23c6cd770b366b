//! Issue record handlers
//!
//! Issuing and returning books, plus read access to the lending ledger.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{required, IssueRecordResponse, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, REQUIRED};
use crate::auth::AuthUser;
use crate::domain::entities::{BookId, IssueFilter, IssueRecordId, IssueStatus, MemberId};
use crate::error::{AppError, DomainError, FieldErrors, JsonBody};
use crate::AppState;

/// Query parameters for listing issue records
#[derive(Debug, Default, Deserialize)]
pub struct IssueListQuery {
    /// `issued`, `overdue` or `returned`
    pub status: Option<String>,
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl IssueListQuery {
    fn into_filter(self) -> Result<IssueFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse::<IssueStatus>().map_err(|_| {
                DomainError::field(
                    "status",
                    format!("Select a valid choice. {} is not one of the available choices.", s),
                )
            })?),
        };

        Ok(IssueFilter {
            status,
            member_id: self.member_id.map(MemberId),
            book_id: self.book_id.map(BookId),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueBookRequest {
    pub book_id: Option<i32>,
    pub member_id: Option<i32>,
    /// Defaults to today plus the loan period
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnBookRequest {
    pub issue_record_id: Option<i32>,
}

/// GET /issues
pub async fn list_issues(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(query): Query<IssueListQuery>,
) -> Result<Json<Vec<IssueRecordResponse>>, AppError> {
    let filter = query.into_filter()?;
    let records = state.lending_service.list(&filter).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /issues/:id
pub async fn get_issue(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<IssueRecordResponse>, AppError> {
    let details = state.lending_service.get(IssueRecordId(id)).await?;
    Ok(Json(details.into()))
}

/// POST /issues/issue
///
/// Lend a book to a member. Every failed precondition is reported at once.
pub async fn issue_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<IssueBookRequest>,
) -> Result<(StatusCode, Json<IssueRecordResponse>), AppError> {
    let (Some(book_id), Some(member_id)) = (request.book_id, request.member_id) else {
        let mut errors = FieldErrors::new();
        required(&mut errors, "book_id", request.book_id);
        required(&mut errors, "member_id", request.member_id);
        return Err(DomainError::Validation(errors).into());
    };

    tracing::debug!(issued_by = %user.id, book_id, member_id, "Issue requested");
    let details = state
        .lending_service
        .issue_book(BookId(book_id), MemberId(member_id), request.due_date)
        .await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// POST /issues/return_book
///
/// Close a lending; the response carries any fine assessed.
pub async fn return_book(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    JsonBody(request): JsonBody<ReturnBookRequest>,
) -> Result<Json<IssueRecordResponse>, AppError> {
    let Some(id) = request.issue_record_id else {
        return Err(DomainError::field("issue_record_id", REQUIRED).into());
    };

    let details = state.lending_service.return_book(IssueRecordId(id)).await?;
    Ok(Json(details.into()))
}

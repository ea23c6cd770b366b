//! HTTP handlers
//!
//! Axum request handlers for the API endpoints, plus the request and response
//! shapes they share.

pub mod auth;
pub mod books;
pub mod issues;
pub mod members;

pub use auth::{login, me, register};
pub use books::{
    create_book, delete_book, get_book, list_available_books, list_books, patch_book, put_book,
};
pub use issues::{get_issue, issue_book, list_issues, return_book};
pub use members::{
    create_member, delete_member, get_member, list_members, member_history, patch_member,
    put_member,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::app::{IssueDetails, MemberDetails};
use crate::domain::entities::{Book, Member, Money, User};
use crate::error::FieldErrors;

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const MAX_PAGE_SIZE: u64 = 200;

pub(crate) const REQUIRED: &str = "This field is required.";

/// Record a "required" error when `value` is absent
pub(crate) fn required<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

/// Distinguish an explicit `null` (`Some(None)`) from a missing field (`None`)
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query parameters shared by the list endpoints
///
/// Lists are paged: `limit` defaults to [`DEFAULT_PAGE_SIZE`] and is capped at
/// [`MAX_PAGE_SIZE`]; callers walk further with `offset`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListQuery {
    /// `(limit, offset)` with the default page size and upper bound applied
    pub fn page(&self) -> (u64, u64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (limit, self.offset.unwrap_or(0))
    }
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Option<NaiveDate>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(b: Book) -> Self {
        Self {
            id: b.id.0,
            title: b.title,
            author: b.author,
            isbn: b.isbn,
            publication_date: b.publication_date,
            total_copies: b.total_copies,
            available_copies: b.available_copies,
            description: b.description,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.0,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            date_joined: u.date_joined,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: i32,
    pub user: UserResponse,
    /// Public membership code, `M#####`
    pub member_id: String,
    pub phone: String,
    pub address: String,
    pub date_joined: NaiveDate,
    pub is_active: bool,
}

impl MemberResponse {
    pub fn new(member: Member, user: User) -> Self {
        Self {
            id: member.id.0,
            user: user.into(),
            member_id: member.member_id,
            phone: member.phone,
            address: member.address,
            date_joined: member.date_joined,
            is_active: member.is_active,
        }
    }
}

impl From<MemberDetails> for MemberResponse {
    fn from(d: MemberDetails) -> Self {
        Self::new(d.member, d.user)
    }
}

#[derive(Debug, Serialize)]
pub struct IssueRecordResponse {
    pub id: i32,
    pub book: Option<BookResponse>,
    pub book_id: i32,
    pub member: Option<MemberResponse>,
    pub member_id: i32,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: String,
    /// Decimal string, e.g. `"5.00"`
    pub fine_amount: Money,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IssueDetails> for IssueRecordResponse {
    fn from(d: IssueDetails) -> Self {
        let r = d.record;
        Self {
            id: r.id.0,
            book: d.book.map(Into::into),
            book_id: r.book_id.0,
            member: d.member.map(Into::into),
            member_id: r.member_id.0,
            issue_date: r.issue_date,
            due_date: r.due_date,
            return_date: r.return_date,
            status: r.status.to_string(),
            fine_amount: r.fine_amount,
            is_overdue: d.is_overdue,
            days_overdue: d.days_overdue,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

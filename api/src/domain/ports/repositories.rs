//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., the SeaORM SQL adapter).

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::entities::{
    Book, BookChanges, BookFilter, BookId, IssueFilter, IssueRecord, IssueRecordId, Member,
    MemberFilter, MemberId, Money, NewBook, NewIssueRecord, NewMember, NewUser, User, UserId,
};
use crate::error::DomainError;

/// Repository for Book entities
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Find a book by ID
    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, DomainError>;

    /// Find several books at once (missing IDs are skipped)
    async fn find_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, DomainError>;

    /// Find a book by ISBN
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, DomainError>;

    /// List books, newest first
    async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>, DomainError>;

    /// Create a new book; copy counters are clamped before the insert
    async fn create(&self, book: &NewBook) -> Result<Book, DomainError>;

    /// Apply `changes` to the stored row under a row lock; copy counters are
    /// clamped before the write
    async fn update(&self, id: BookId, changes: &BookChanges) -> Result<Book, DomainError>;

    /// Delete a book and, by cascade, its issue records. Returns false if absent.
    async fn delete(&self, id: BookId) -> Result<bool, DomainError>;
}

/// Repository for Member entities
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Find a member by ID
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError>;

    /// Find several members at once (missing IDs are skipped)
    async fn find_by_ids(&self, ids: &[MemberId]) -> Result<Vec<Member>, DomainError>;

    /// Find the member profile linked to a user
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Member>, DomainError>;

    /// Check whether a membership code is taken
    async fn member_code_exists(&self, code: &str) -> Result<bool, DomainError>;

    /// List active members, newest first
    async fn list_active(&self, filter: &MemberFilter) -> Result<Vec<Member>, DomainError>;

    /// Create a member profile for an existing user
    async fn create(&self, member: &NewMember) -> Result<Member, DomainError>;

    /// Persist the mutable fields of a member (never the membership code)
    async fn update(&self, member: &Member) -> Result<Member, DomainError>;
}

/// Repository for User entities (the identity side of a member)
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Find several users at once (missing IDs are skipped)
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DomainError>;

    /// Find a user by username (exact match)
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Find the user holding an API token, by token hash
    async fn find_by_token_hash(&self, hash: &str) -> Result<Option<User>, DomainError>;

    /// Create a user together with its member profile in one transaction
    async fn register(
        &self,
        user: &NewUser,
        member_code: &str,
    ) -> Result<(User, Member), DomainError>;

    /// Replace the user's API token hash
    async fn set_token_hash(&self, id: UserId, hash: &str) -> Result<(), DomainError>;
}

/// Repository for IssueRecord entities
///
/// `issue` and `return_record` are the two lending transactions; each one
/// must update the record and the book counter atomically.
#[async_trait]
pub trait IssueRecordRepository: Send + Sync {
    /// Find an issue record by ID
    async fn find_by_id(&self, id: IssueRecordId) -> Result<Option<IssueRecord>, DomainError>;

    /// List issue records, most recently issued first
    async fn list(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>, DomainError>;

    /// Whether the member currently holds this book with status `issued`
    async fn has_issued(&self, book_id: BookId, member_id: MemberId)
        -> Result<bool, DomainError>;

    /// Open a lending and take one copy off the shelf.
    ///
    /// Re-checks availability, membership and duplicates under isolation and
    /// fails with a field validation error without writing anything.
    async fn issue(&self, record: &NewIssueRecord) -> Result<IssueRecord, DomainError>;

    /// Close a lending on `today`, assessing any fine at `daily_rate`, and put
    /// the copy back on the shelf.
    async fn return_record(
        &self,
        id: IssueRecordId,
        today: NaiveDate,
        daily_rate: Money,
    ) -> Result<IssueRecord, DomainError>;
}

//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod book;
pub mod issue_record;
pub mod member;
pub mod money;
pub mod user;

pub use book::{is_valid_isbn, Book, BookChanges, BookFilter, BookId, NewBook, DUPLICATE_ISBN};
pub use issue_record::{
    IssueFilter, IssueRecord, IssueRecordId, IssueStatus, NewIssueRecord, ALREADY_ISSUED,
    BOOK_NOT_FOUND, MEMBER_UNAVAILABLE, NOT_RETURNABLE, NO_COPIES_AVAILABLE,
};
pub use member::{
    format_member_code, is_valid_member_code, Member, MemberChanges, MemberFilter, MemberId,
    NewMember, DUPLICATE_MEMBER_CODE, DUPLICATE_PROFILE,
};
pub use money::Money;
pub use user::{NewUser, User, UserId, DUPLICATE_USERNAME};

//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture function creates a valid entity that can be customized.

use chrono::{NaiveDate, Utc};

use crate::domain::entities::{
    Book, BookId, IssueRecord, IssueRecordId, IssueStatus, Member, MemberId, Money, User, UserId,
};

/// Shorthand for a calendar date
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Create a test book with three copies on the shelf
pub fn test_book() -> Book {
    Book {
        id: BookId(1),
        title: "The Great Gatsby".to_string(),
        author: "F. Scott Fitzgerald".to_string(),
        isbn: "9780743273565".to_string(),
        publication_date: Some(date(1925, 4, 10)),
        total_copies: 3,
        available_copies: 3,
        description: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Create a test user with default values
pub fn test_user() -> User {
    User {
        id: UserId(1),
        username: "ada".to_string(),
        email: "ada@example.com".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        password_hash: "not-a-real-hash".to_string(),
        date_joined: Utc::now(),
    }
}

/// Create an active member linked to `user_id`
pub fn test_member(user_id: UserId) -> Member {
    Member {
        id: MemberId(1),
        user_id,
        member_id: "M48213".to_string(),
        phone: String::new(),
        address: String::new(),
        date_joined: date(2024, 1, 1),
        is_active: true,
    }
}

/// Create an outstanding issue record for book 1 and member 1
pub fn test_issue_record(issue_date: NaiveDate, due_date: NaiveDate) -> IssueRecord {
    IssueRecord {
        id: IssueRecordId(1),
        book_id: BookId(1),
        member_id: MemberId(1),
        issue_date,
        due_date,
        return_date: None,
        status: IssueStatus::Issued,
        fine_amount: Money::ZERO,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

//! Issue record domain entity
//!
//! One lending of a book copy to a member, from issue through return.
//!
//! ```text
//!  issued ──────────────► returned
//!     │                      ▲
//!     └──► overdue ──────────┘
//! ```
//!
//! `overdue` is only written when a fine is assessed, which happens on return.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::book::BookId;
use super::member::MemberId;
use super::money::Money;
use crate::error::DomainError;

/// Unique identifier for an issue record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueRecordId(pub i32);

impl From<i32> for IssueRecordId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for IssueRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Messages reported by the lending rules
pub const BOOK_NOT_FOUND: &str = "Book not found.";
pub const NO_COPIES_AVAILABLE: &str = "No copies available for this book.";
pub const MEMBER_UNAVAILABLE: &str = "Member not found or inactive.";
pub const ALREADY_ISSUED: &str = "Member already has this book issued.";
pub const NOT_RETURNABLE: &str = "Issue record not found or already returned.";

/// Lending status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Issued,
    Overdue,
    Returned,
}

impl IssueStatus {
    /// The copy is still out with the member
    pub fn is_outstanding(&self) -> bool {
        matches!(self, IssueStatus::Issued | IssueStatus::Overdue)
    }

    /// Statuses only move forward
    pub fn can_transition_to(&self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Issued, IssueStatus::Overdue)
                | (IssueStatus::Issued, IssueStatus::Returned)
                | (IssueStatus::Overdue, IssueStatus::Returned)
        )
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueStatus::Issued => write!(f, "issued"),
            IssueStatus::Overdue => write!(f, "overdue"),
            IssueStatus::Returned => write!(f, "returned"),
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "issued" => Ok(IssueStatus::Issued),
            "overdue" => Ok(IssueStatus::Overdue),
            "returned" => Ok(IssueStatus::Returned),
            _ => Err(format!("Unknown issue status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueRecord {
    pub id: IssueRecordId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: IssueStatus,
    pub fine_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueRecord {
    /// Charge `daily_rate` for each day past the due date.
    ///
    /// Only a record still in `issued` is assessed; it moves to `overdue` when
    /// a fine applies. An `overdue` record keeps the fine it already has.
    pub fn assess_fine(&mut self, today: NaiveDate, daily_rate: Money) -> Money {
        if self.status == IssueStatus::Issued && today > self.due_date {
            let days_overdue = (today - self.due_date).num_days();
            self.fine_amount = daily_rate.times(days_overdue);
            self.status = IssueStatus::Overdue;
        }
        self.fine_amount
    }

    /// Close the record on `today`
    pub fn mark_returned(&mut self, today: NaiveDate) -> Result<(), DomainError> {
        if !self.status.can_transition_to(IssueStatus::Returned) {
            return Err(DomainError::field("issue_record_id", NOT_RETURNABLE));
        }
        self.return_date = Some(today);
        self.status = IssueStatus::Returned;
        Ok(())
    }

    /// Assess any fine, then close the record
    pub fn settle(&mut self, today: NaiveDate, daily_rate: Money) -> Result<(), DomainError> {
        if !self.status.is_outstanding() {
            return Err(DomainError::field("issue_record_id", NOT_RETURNABLE));
        }
        self.assess_fine(today, daily_rate);
        self.mark_returned(today)
    }

    /// Past due and not yet returned, regardless of the stored status
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_outstanding() && today > self.due_date
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }
}

/// Data needed to open a new lending
#[derive(Debug, Clone)]
pub struct NewIssueRecord {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Listing filter for issue records
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub member_id: Option<MemberId>,
    pub book_id: Option<BookId>,
    pub limit: u64,
    pub offset: u64,
}

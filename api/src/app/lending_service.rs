//! Lending service
//!
//! Issues books to members and takes them back, assessing late fines.
//!
//! The repository re-checks every precondition inside the lending
//! transaction; the checks here run first so a request with several problems
//! gets all of them reported at once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::domain::entities::{
    Book, BookId, IssueFilter, IssueRecord, IssueRecordId, MemberId, Money, NewIssueRecord,
    ALREADY_ISSUED, BOOK_NOT_FOUND, MEMBER_UNAVAILABLE, NO_COPIES_AVAILABLE,
};
use crate::domain::ports::{
    BookRepository, Clock, IssueRecordRepository, MemberRepository, UserRepository,
};
use crate::error::{AppError, FieldErrors, NON_FIELD_ERRORS};

use super::membership_service::{with_users, MemberDetails};

/// An issue record with its book and member, as seen on `today`
#[derive(Debug, Clone)]
pub struct IssueDetails {
    pub record: IssueRecord,
    pub book: Option<Book>,
    pub member: Option<MemberDetails>,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

/// Service for issuing and returning books
pub struct LendingService<BR, MR, UR, IR>
where
    BR: BookRepository,
    MR: MemberRepository,
    UR: UserRepository,
    IR: IssueRecordRepository,
{
    books: Arc<BR>,
    members: Arc<MR>,
    users: Arc<UR>,
    issues: Arc<IR>,
    clock: Arc<dyn Clock>,
    loan_period_days: i64,
    daily_fine: Money,
}

impl<BR, MR, UR, IR> LendingService<BR, MR, UR, IR>
where
    BR: BookRepository,
    MR: MemberRepository,
    UR: UserRepository,
    IR: IssueRecordRepository,
{
    pub fn new(
        books: Arc<BR>,
        members: Arc<MR>,
        users: Arc<UR>,
        issues: Arc<IR>,
        clock: Arc<dyn Clock>,
        loan_period_days: i64,
        daily_fine: Money,
    ) -> Self {
        Self {
            books,
            members,
            users,
            issues,
            clock,
            loan_period_days,
            daily_fine,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Lend a copy of a book to a member
    ///
    /// The loan starts today and runs until `due_date`, or for the configured
    /// loan period when none is given.
    pub async fn issue_book(
        &self,
        book_id: BookId,
        member_id: MemberId,
        due_date: Option<NaiveDate>,
    ) -> Result<IssueDetails, AppError> {
        let today = self.today();
        let mut errors = FieldErrors::new();

        match self.books.find_by_id(book_id).await? {
            None => errors.add("book_id", BOOK_NOT_FOUND),
            Some(book) if !book.is_available() => errors.add("book_id", NO_COPIES_AVAILABLE),
            Some(_) => {}
        }

        let member = self.members.find_by_id(member_id).await?;
        if !member.as_ref().is_some_and(|m| m.can_borrow()) {
            errors.add("member_id", MEMBER_UNAVAILABLE);
        }

        if due_date.is_some_and(|due| due < today) {
            errors.add("due_date", "Due date cannot be in the past.");
        }

        if errors.is_empty() && self.issues.has_issued(book_id, member_id).await? {
            errors.add(NON_FIELD_ERRORS, ALREADY_ISSUED);
        }
        errors.into_result()?;

        let due_date = match due_date {
            Some(due) => due,
            None => Duration::try_days(self.loan_period_days)
                .and_then(|period| today.checked_add_signed(period))
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Loan period of {} days overflows the calendar",
                        self.loan_period_days
                    ))
                })?,
        };
        let record = self
            .issues
            .issue(&NewIssueRecord {
                book_id,
                member_id,
                issue_date: today,
                due_date,
            })
            .await?;

        tracing::info!(
            issue_id = %record.id,
            book_id = %book_id,
            member_id = %member_id,
            due_date = %record.due_date,
            "Book issued"
        );
        self.details(record).await
    }

    /// Take a book back, charging the daily fine for every day past due
    pub async fn return_book(&self, id: IssueRecordId) -> Result<IssueDetails, AppError> {
        let record = self
            .issues
            .return_record(id, self.today(), self.daily_fine)
            .await?;

        tracing::info!(
            issue_id = %record.id,
            book_id = %record.book_id,
            fine = %record.fine_amount,
            "Book returned"
        );
        self.details(record).await
    }

    pub async fn get(&self, id: IssueRecordId) -> Result<IssueDetails, AppError> {
        let record = self
            .issues
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue record {} not found", id)))?;
        self.details(record).await
    }

    /// List issue records, most recently issued first
    pub async fn list(&self, filter: &IssueFilter) -> Result<Vec<IssueDetails>, AppError> {
        let records = self.issues.list(filter).await?;
        self.details_many(records).await
    }

    async fn details(&self, record: IssueRecord) -> Result<IssueDetails, AppError> {
        let mut details = self.details_many(vec![record]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::Internal("Issue record lost while loading".to_string()))
    }

    /// Batch-load books, members and users for a page of records
    async fn details_many(&self, records: Vec<IssueRecord>) -> Result<Vec<IssueDetails>, AppError> {
        let today = self.today();

        let book_ids: Vec<BookId> = records.iter().map(|r| r.book_id).collect();
        let books: HashMap<BookId, Book> = self
            .books
            .find_by_ids(&book_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let member_ids: Vec<MemberId> = records.iter().map(|r| r.member_id).collect();
        let members = self.members.find_by_ids(&member_ids).await?;
        let members: HashMap<MemberId, MemberDetails> = with_users(self.users.as_ref(), members)
            .await?
            .into_iter()
            .map(|d| (d.member.id, d))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| IssueDetails {
                book: books.get(&record.book_id).cloned(),
                member: members.get(&record.member_id).cloned(),
                is_overdue: record.is_overdue(today),
                days_overdue: record.days_overdue(today),
                record,
            })
            .collect())
    }
}

//! SQL adapter for IssueRecordRepository
//!
//! Both lending transactions lock the rows they touch (`SELECT ... FOR UPDATE`
//! on PostgreSQL). Locks are always taken book first, then issue record, so
//! concurrent issue and return calls cannot deadlock each other.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::domain::entities::{
    BookId, IssueFilter, IssueRecord, IssueRecordId, IssueStatus, MemberId, Money,
    NewIssueRecord, ALREADY_ISSUED, BOOK_NOT_FOUND, MEMBER_UNAVAILABLE, NOT_RETURNABLE,
    NO_COPIES_AVAILABLE,
};
use crate::domain::ports::IssueRecordRepository;
use crate::entity::{books, issue_records, members};
use crate::error::{DomainError, NON_FIELD_ERRORS};

/// SeaORM implementation of IssueRecordRepository
pub struct SqlIssueRecordRepository {
    db: DatabaseConnection,
}

impl SqlIssueRecordRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl TryFrom<issue_records::Model> for IssueRecord {
    type Error = DomainError;

    fn try_from(m: issue_records::Model) -> Result<Self, Self::Error> {
        let status = m.status.parse::<IssueStatus>().map_err(DomainError::Internal)?;

        Ok(IssueRecord {
            id: IssueRecordId(m.id),
            book_id: BookId(m.book_id),
            member_id: MemberId(m.member_id),
            issue_date: m.issue_date,
            due_date: m.due_date,
            return_date: m.return_date,
            status,
            fine_amount: Money::from_cents(m.fine_cents),
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        })
    }
}

async fn count_issued<C: ConnectionTrait>(
    conn: &C,
    book_id: BookId,
    member_id: MemberId,
) -> Result<u64, DomainError> {
    let count = issue_records::Entity::find()
        .filter(issue_records::Column::BookId.eq(book_id.0))
        .filter(issue_records::Column::MemberId.eq(member_id.0))
        .filter(issue_records::Column::Status.eq(IssueStatus::Issued.to_string()))
        .count(conn)
        .await?;
    Ok(count)
}

#[async_trait]
impl IssueRecordRepository for SqlIssueRecordRepository {
    async fn find_by_id(&self, id: IssueRecordId) -> Result<Option<IssueRecord>, DomainError> {
        let result = issue_records::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(IssueRecord::try_from).transpose()
    }

    async fn list(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>, DomainError> {
        let mut query = issue_records::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(issue_records::Column::Status.eq(status.to_string()));
        }
        if let Some(member_id) = filter.member_id {
            query = query.filter(issue_records::Column::MemberId.eq(member_id.0));
        }
        if let Some(book_id) = filter.book_id {
            query = query.filter(issue_records::Column::BookId.eq(book_id.0));
        }

        let results = query
            .order_by_desc(issue_records::Column::IssueDate)
            .order_by_desc(issue_records::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        results.into_iter().map(IssueRecord::try_from).collect()
    }

    async fn has_issued(
        &self,
        book_id: BookId,
        member_id: MemberId,
    ) -> Result<bool, DomainError> {
        Ok(count_issued(&self.db, book_id, member_id).await? > 0)
    }

    async fn issue(&self, record: &NewIssueRecord) -> Result<IssueRecord, DomainError> {
        let txn = self.db.begin().await?;

        let book = books::Entity::find_by_id(record.book_id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::field("book_id", BOOK_NOT_FOUND))?;

        if book.available_copies <= 0 {
            return Err(DomainError::field("book_id", NO_COPIES_AVAILABLE));
        }

        let member_active = members::Entity::find_by_id(record.member_id.0)
            .one(&txn)
            .await?
            .is_some_and(|m| m.is_active);
        if !member_active {
            return Err(DomainError::field("member_id", MEMBER_UNAVAILABLE));
        }

        if count_issued(&txn, record.book_id, record.member_id).await? > 0 {
            return Err(DomainError::field(NON_FIELD_ERRORS, ALREADY_ISSUED));
        }

        let now = Utc::now().fixed_offset();
        let inserted = issue_records::ActiveModel {
            book_id: Set(record.book_id.0),
            member_id: Set(record.member_id.0),
            issue_date: Set(record.issue_date),
            due_date: Set(record.due_date),
            return_date: Set(None),
            status: Set(IssueStatus::Issued.to_string()),
            fine_cents: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let remaining = book.available_copies - 1;
        let mut book: books::ActiveModel = book.into();
        book.available_copies = Set(remaining);
        book.updated_at = Set(now);
        book.update(&txn).await?;

        txn.commit().await?;

        IssueRecord::try_from(inserted)
    }

    async fn return_record(
        &self,
        id: IssueRecordId,
        today: NaiveDate,
        daily_rate: Money,
    ) -> Result<IssueRecord, DomainError> {
        let txn = self.db.begin().await?;

        // Unlocked read to learn the book, so the book row can be locked first
        let book_id = issue_records::Entity::find_by_id(id.0)
            .one(&txn)
            .await?
            .map(|m| m.book_id)
            .ok_or_else(|| DomainError::field("issue_record_id", NOT_RETURNABLE))?;

        let book = books::Entity::find_by_id(book_id)
            .lock_exclusive()
            .one(&txn)
            .await?;

        let model = issue_records::Entity::find_by_id(id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::field("issue_record_id", NOT_RETURNABLE))?;

        let mut record = IssueRecord::try_from(model.clone())?;
        record.settle(today, daily_rate)?;

        let now = Utc::now();
        let mut active: issue_records::ActiveModel = model.into();
        active.return_date = Set(record.return_date);
        active.status = Set(record.status.to_string());
        active.fine_cents = Set(record.fine_amount.cents());
        active.updated_at = Set(now.fixed_offset());
        active.update(&txn).await?;
        record.updated_at = now;

        if let Some(book) = book {
            let restored = (book.available_copies + 1).min(book.total_copies);
            let mut book: books::ActiveModel = book.into();
            book.available_copies = Set(restored);
            book.updated_at = Set(now.fixed_offset());
            book.update(&txn).await?;
        }

        txn.commit().await?;

        Ok(record)
    }
}

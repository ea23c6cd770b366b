//! Mock implementations of port traits
//!
//! In-memory repositories share one set of tables so that cross-entity rules
//! (copy counters, member lookups, cascades) behave as they do in SQL. Each
//! lending transaction runs under a single write lock.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use crate::domain::entities::{
    Book, BookChanges, BookFilter, BookId, IssueFilter, IssueRecord, IssueRecordId, IssueStatus,
    Member, MemberFilter, MemberId, Money, NewBook, NewIssueRecord, NewMember, NewUser, User,
    UserId,
    ALREADY_ISSUED, BOOK_NOT_FOUND, DUPLICATE_ISBN, DUPLICATE_MEMBER_CODE, DUPLICATE_PROFILE,
    DUPLICATE_USERNAME, MEMBER_UNAVAILABLE, NOT_RETURNABLE, NO_COPIES_AVAILABLE,
};
use crate::domain::ports::{
    BookRepository, Clock, IssueRecordRepository, MemberCodeSource, MemberRepository,
    RandomMemberCodes, UserRepository,
};
use crate::error::{DomainError, NON_FIELD_ERRORS};

// ============================================================================
// Shared tables
// ============================================================================

#[derive(Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    users: BTreeMap<UserId, User>,
    token_hashes: HashMap<UserId, String>,
    members: BTreeMap<MemberId, Member>,
    issues: BTreeMap<IssueRecordId, IssueRecord>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn bump_past(&mut self, id: i32) {
        self.last_id = self.last_id.max(id);
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T>(items: Vec<T>, limit: u64, offset: u64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// In-memory library database handing out repositories over shared tables
#[derive(Clone, Default)]
pub struct InMemoryLibrary {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a book for testing
    pub fn with_book(self, book: Book) -> Self {
        {
            let mut tables = self.tables.write().unwrap();
            tables.bump_past(book.id.0);
            tables.books.insert(book.id, book);
        }
        self
    }

    /// Pre-populate with a user for testing
    pub fn with_user(self, user: User) -> Self {
        {
            let mut tables = self.tables.write().unwrap();
            tables.bump_past(user.id.0);
            tables.users.insert(user.id, user);
        }
        self
    }

    /// Pre-populate with a member for testing
    pub fn with_member(self, member: Member) -> Self {
        {
            let mut tables = self.tables.write().unwrap();
            tables.bump_past(member.id.0);
            tables.members.insert(member.id, member);
        }
        self
    }

    /// Pre-populate with an issue record for testing
    pub fn with_issue(self, record: IssueRecord) -> Self {
        {
            let mut tables = self.tables.write().unwrap();
            tables.bump_past(record.id.0);
            tables.issues.insert(record.id, record);
        }
        self
    }

    pub fn books(&self) -> InMemoryBookRepository {
        InMemoryBookRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn members(&self) -> InMemoryMemberRepository {
        InMemoryMemberRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn issues(&self) -> InMemoryIssueRecordRepository {
        InMemoryIssueRecordRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn user_count(&self) -> usize {
        self.tables.read().unwrap().users.len()
    }

    pub fn member_count(&self) -> usize {
        self.tables.read().unwrap().members.len()
    }
}

// ============================================================================
// In-Memory Book Repository
// ============================================================================

pub struct InMemoryBookRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.books.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.books.get(id).cloned())
            .collect())
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>, DomainError> {
        let tables = self.tables.read().unwrap();
        let term = search_term(&filter.search);

        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|b| !filter.available_only || b.available_copies > 0)
            .filter(|b| {
                term.map_or(true, |t| {
                    contains_ci(&b.title, t) || contains_ci(&b.author, t) || contains_ci(&b.isbn, t)
                })
            })
            .cloned()
            .collect();
        books.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(page(books, filter.limit, filter.offset))
    }

    async fn create(&self, new_book: &NewBook) -> Result<Book, DomainError> {
        let mut tables = self.tables.write().unwrap();
        if tables.books.values().any(|b| b.isbn == new_book.isbn) {
            return Err(DomainError::field("isbn", DUPLICATE_ISBN));
        }

        let mut input = new_book.clone();
        input.normalize();
        let now = Utc::now();
        let book = Book {
            id: BookId(tables.next_id()),
            title: input.title,
            author: input.author,
            isbn: input.isbn,
            publication_date: input.publication_date,
            total_copies: input.total_copies,
            available_copies: input.available_copies,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(&self, id: BookId, changes: &BookChanges) -> Result<Book, DomainError> {
        let mut tables = self.tables.write().unwrap();
        if let Some(isbn) = changes.isbn.as_deref() {
            if tables.books.values().any(|b| b.id != id && b.isbn == isbn) {
                return Err(DomainError::field("isbn", DUPLICATE_ISBN));
            }
        }

        let stored = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("Book {}", id)))?;
        stored.apply(changes.clone());
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: BookId) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let removed = tables.books.remove(&id).is_some();
        if removed {
            tables.issues.retain(|_, r| r.book_id != id);
        }
        Ok(removed)
    }
}

// ============================================================================
// In-Memory Member Repository
// ============================================================================

pub struct InMemoryMemberRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.members.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[MemberId]) -> Result<Vec<Member>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.members.get(id).cloned())
            .collect())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Member>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .members
            .values()
            .find(|m| m.user_id == user_id)
            .cloned())
    }

    async fn member_code_exists(&self, code: &str) -> Result<bool, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.members.values().any(|m| m.member_id == code))
    }

    async fn list_active(&self, filter: &MemberFilter) -> Result<Vec<Member>, DomainError> {
        let tables = self.tables.read().unwrap();
        let term = search_term(&filter.search);

        let mut members: Vec<Member> = tables
            .members
            .values()
            .filter(|m| m.is_active)
            .filter(|m| {
                term.map_or(true, |t| {
                    contains_ci(&m.member_id, t)
                        || tables.users.get(&m.user_id).is_some_and(|u| {
                            contains_ci(&u.username, t) || contains_ci(&u.email, t)
                        })
                })
            })
            .cloned()
            .collect();
        members.sort_by(|a, b| (b.date_joined, b.id).cmp(&(a.date_joined, a.id)));

        Ok(page(members, filter.limit, filter.offset))
    }

    async fn create(&self, new_member: &NewMember) -> Result<Member, DomainError> {
        let mut tables = self.tables.write().unwrap();
        if tables
            .members
            .values()
            .any(|m| m.user_id == new_member.user_id)
        {
            return Err(DomainError::field("user_id", DUPLICATE_PROFILE));
        }

        let member = Member {
            id: MemberId(tables.next_id()),
            user_id: new_member.user_id,
            member_id: new_member.member_id.clone(),
            phone: new_member.phone.clone(),
            address: new_member.address.clone(),
            date_joined: Utc::now().date_naive(),
            is_active: true,
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update(&self, member: &Member) -> Result<Member, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let stored = tables
            .members
            .get_mut(&member.id)
            .ok_or_else(|| DomainError::NotFound(format!("Member {}", member.id)))?;
        stored.phone = member.phone.clone();
        stored.address = member.address.clone();
        stored.is_active = member.is_active;
        Ok(stored.clone())
    }
}

// ============================================================================
// In-Memory User Repository
// ============================================================================

pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_token_hash(&self, hash: &str) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .token_hashes
            .iter()
            .find(|(_, h)| h.as_str() == hash)
            .and_then(|(id, _)| tables.users.get(id).cloned()))
    }

    async fn register(
        &self,
        new_user: &NewUser,
        member_code: &str,
    ) -> Result<(User, Member), DomainError> {
        let mut tables = self.tables.write().unwrap();
        if tables.users.values().any(|u| u.username == new_user.username) {
            return Err(DomainError::field("username", DUPLICATE_USERNAME));
        }
        if tables.members.values().any(|m| m.member_id == member_code) {
            return Err(DomainError::field("member_id", DUPLICATE_MEMBER_CODE));
        }

        let now = Utc::now();
        let user = User {
            id: UserId(tables.next_id()),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            password_hash: new_user.password_hash.clone(),
            date_joined: now,
        };
        let member = Member {
            id: MemberId(tables.next_id()),
            user_id: user.id,
            member_id: member_code.to_string(),
            phone: String::new(),
            address: String::new(),
            date_joined: now.date_naive(),
            is_active: true,
        };
        tables.users.insert(user.id, user.clone());
        tables.members.insert(member.id, member.clone());
        Ok((user, member))
    }

    async fn set_token_hash(&self, id: UserId, hash: &str) -> Result<(), DomainError> {
        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&id) {
            return Err(DomainError::NotFound(format!("User {}", id)));
        }
        tables.token_hashes.insert(id, hash.to_string());
        Ok(())
    }
}

// ============================================================================
// In-Memory Issue Record Repository
// ============================================================================

pub struct InMemoryIssueRecordRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl IssueRecordRepository for InMemoryIssueRecordRepository {
    async fn find_by_id(&self, id: IssueRecordId) -> Result<Option<IssueRecord>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.issues.get(&id).cloned())
    }

    async fn list(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>, DomainError> {
        let tables = self.tables.read().unwrap();

        let mut records: Vec<IssueRecord> = tables
            .issues
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.member_id.map_or(true, |m| r.member_id == m))
            .filter(|r| filter.book_id.map_or(true, |b| r.book_id == b))
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.issue_date, b.id).cmp(&(a.issue_date, a.id)));

        Ok(page(records, filter.limit, filter.offset))
    }

    async fn has_issued(
        &self,
        book_id: BookId,
        member_id: MemberId,
    ) -> Result<bool, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.issues.values().any(|r| {
            r.book_id == book_id && r.member_id == member_id && r.status == IssueStatus::Issued
        }))
    }

    async fn issue(&self, new_record: &NewIssueRecord) -> Result<IssueRecord, DomainError> {
        let mut tables = self.tables.write().unwrap();

        let available = tables
            .books
            .get(&new_record.book_id)
            .map(|b| b.available_copies)
            .ok_or_else(|| DomainError::field("book_id", BOOK_NOT_FOUND))?;
        if available <= 0 {
            return Err(DomainError::field("book_id", NO_COPIES_AVAILABLE));
        }

        let member_active = tables
            .members
            .get(&new_record.member_id)
            .is_some_and(|m| m.is_active);
        if !member_active {
            return Err(DomainError::field("member_id", MEMBER_UNAVAILABLE));
        }

        let duplicate = tables.issues.values().any(|r| {
            r.book_id == new_record.book_id
                && r.member_id == new_record.member_id
                && r.status == IssueStatus::Issued
        });
        if duplicate {
            return Err(DomainError::field(NON_FIELD_ERRORS, ALREADY_ISSUED));
        }

        let now = Utc::now();
        let record = IssueRecord {
            id: IssueRecordId(tables.next_id()),
            book_id: new_record.book_id,
            member_id: new_record.member_id,
            issue_date: new_record.issue_date,
            due_date: new_record.due_date,
            return_date: None,
            status: IssueStatus::Issued,
            fine_amount: Money::ZERO,
            created_at: now,
            updated_at: now,
        };
        tables.issues.insert(record.id, record.clone());
        if let Some(book) = tables.books.get_mut(&new_record.book_id) {
            book.available_copies -= 1;
            book.updated_at = now;
        }
        Ok(record)
    }

    async fn return_record(
        &self,
        id: IssueRecordId,
        today: NaiveDate,
        daily_rate: Money,
    ) -> Result<IssueRecord, DomainError> {
        let mut tables = self.tables.write().unwrap();

        let mut record = tables
            .issues
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::field("issue_record_id", NOT_RETURNABLE))?;
        record.settle(today, daily_rate)?;
        record.updated_at = Utc::now();
        tables.issues.insert(id, record.clone());

        if let Some(book) = tables.books.get_mut(&record.book_id) {
            book.available_copies = (book.available_copies + 1).min(book.total_copies);
            book.updated_at = record.updated_at;
        }
        Ok(record)
    }
}

// ============================================================================
// Clock and membership codes
// ============================================================================

/// Clock pinned to a settable date
pub struct FixedClock {
    today: RwLock<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: RwLock::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.write().unwrap() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.read().unwrap()
    }
}

/// Hands out scripted codes in order, then falls back to random ones
#[derive(Default)]
pub struct ScriptedMemberCodes {
    codes: Mutex<VecDeque<String>>,
}

impl ScriptedMemberCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: Mutex::new(codes.into_iter().map(Into::into).collect()),
        }
    }
}

impl MemberCodeSource for ScriptedMemberCodes {
    fn next_code(&self) -> String {
        self.codes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomMemberCodes.next_code())
    }
}

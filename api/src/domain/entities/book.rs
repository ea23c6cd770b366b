//! Book domain entity
//!
//! A catalogued title with a fixed number of physical copies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub i32);

impl From<i32> for BookId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_AUTHOR_LEN: usize = 100;
pub const MAX_ISBN_LEN: usize = 13;

pub const DUPLICATE_ISBN: &str = "A book with this ISBN already exists.";

#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: BookId,
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

impl Book {
    /// Clamp the copy counters so that `0 <= available <= total`
    pub fn normalize(&mut self) {
        (self.total_copies, self.available_copies) =
            clamp_copies(self.total_copies, self.available_copies);
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Apply a partial update; counters are normalized afterwards
    pub fn apply(&mut self, changes: BookChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(author) = changes.author {
            self.author = author;
        }
        if let Some(isbn) = changes.isbn {
            self.isbn = isbn;
        }
        if let Some(publication_date) = changes.publication_date {
            self.publication_date = publication_date;
        }
        if let Some(total_copies) = changes.total_copies {
            self.total_copies = total_copies;
        }
        if let Some(available_copies) = changes.available_copies {
            self.available_copies = available_copies;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        self.normalize();
    }
}

/// Data needed to catalogue a new book
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Option<NaiveDate>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub description: String,
}

impl NewBook {
    pub fn normalize(&mut self) {
        (self.total_copies, self.available_copies) =
            clamp_copies(self.total_copies, self.available_copies);
    }
}

/// Partial update for a book. `publication_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_date: Option<Option<NaiveDate>>,
    pub total_copies: Option<i32>,
    pub available_copies: Option<i32>,
    pub description: Option<String>,
}

/// Listing filter for the catalogue
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Case-insensitive substring matched against title, author and ISBN
    pub search: Option<String>,
    pub available_only: bool,
    pub limit: u64,
    pub offset: u64,
}

fn clamp_copies(total: i32, available: i32) -> (i32, i32) {
    let total = total.max(0);
    (total, available.clamp(0, total))
}

/// ISBNs are digits with an optional trailing check character `X`
pub fn is_valid_isbn(isbn: &str) -> bool {
    let len = isbn.len();
    if len == 0 || len > MAX_ISBN_LEN {
        return false;
    }
    isbn.char_indices().all(|(i, c)| {
        c.is_ascii_digit() || (i == len - 1 && (c == 'X' || c == 'x'))
    })
}

//! SQL adapters
//!
//! Implementations of repository traits using SeaORM. Production runs on
//! PostgreSQL; the adapter tests run the same code against in-memory SQLite.

pub mod book_repo;
pub mod issue_record_repo;
pub mod member_repo;
pub mod schema;
pub mod user_repo;


pub use book_repo::SqlBookRepository;
pub use issue_record_repo::SqlIssueRecordRepository;
pub use member_repo::SqlMemberRepository;
pub use schema::ensure_schema;
pub use user_repo::SqlUserRepository;

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{DbErr, SqlErr};

use crate::error::DomainError;

const LIKE_ESCAPE: char = '\\';

/// Case-insensitive substring match, portable across PostgreSQL and SQLite
///
/// `%` and `_` in the term match themselves.
pub(crate) fn contains_ci(column: impl IntoColumnRef, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Map a unique-constraint violation onto a field error, anything else onto a database error
pub(crate) fn unique_violation(e: DbErr, field: &str, message: &str) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::field(field, message),
        _ => e.into(),
    }
}

/// Normalise the search term of a listing filter
pub(crate) fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_guards_wildcards() {
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("dune"), "dune");
    }
}

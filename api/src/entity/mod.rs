//! SeaORM entities
//!
//! Table definitions mirrored from the database schema. Domain code never
//! touches these directly; the SQL adapters convert to and from
//! `crate::domain::entities`.

pub mod books;
pub mod issue_records;
pub mod members;
pub mod users;

//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! Why manual mocks instead of mockall?
//! - The lending rules span several repositories, so the fakes need shared state
//! - Manual mocks are more explicit and easier to debug
//! - We control exactly what they return without macro magic
//!
//! HTTP-level tests in `crate::integration_tests` use the SQL adapters over
//! in-memory SQLite instead of these mocks.

pub mod database;
pub mod fixtures;
pub mod mocks;

pub use database::get_test_db;
pub use fixtures::*;
pub use mocks::*;

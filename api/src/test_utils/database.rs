//! In-memory database for adapter and HTTP tests

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::adapters::ensure_schema;

/// Fresh SQLite database with the schema applied
pub async fn get_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    // A single connection keeps every query on the same in-memory database
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to open SQLite database");
    ensure_schema(&db).await.expect("Failed to create schema");
    db
}

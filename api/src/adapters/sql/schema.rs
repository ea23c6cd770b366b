//! Schema bootstrap
//!
//! Creates any missing tables from the SeaORM entity definitions, including
//! unique constraints and the cascading foreign keys declared on the relations.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::entity::{books, issue_records, members, users};

/// Create the library tables if they do not exist yet.
///
/// Tables are created parents first so foreign keys resolve.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(books::Entity),
        schema.create_table_from_entity(members::Entity),
        schema.create_table_from_entity(issue_records::Entity),
    ];

    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    tracing::info!("Database schema ready");
    Ok(())
}

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: String,
    #[sea_orm(unique)]
    pub isbn: String,
    #[sea_orm(nullable)]
    pub publication_date: Option<Date>,
    pub total_copies: i32,
    pub available_copies: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::issue_records::Entity")]
    IssueRecords,
}

impl Related<super::issue_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IssueRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

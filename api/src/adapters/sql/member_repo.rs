//! SQL adapter for MemberRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};

use super::{contains_ci, search_term, unique_violation};
use crate::domain::entities::{
    Member, MemberFilter, MemberId, NewMember, UserId, DUPLICATE_PROFILE,
};
use crate::domain::ports::MemberRepository;
use crate::entity::{members, users};
use crate::error::DomainError;

/// SeaORM implementation of MemberRepository
pub struct SqlMemberRepository {
    db: DatabaseConnection,
}

impl SqlMemberRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<members::Model> for Member {
    fn from(m: members::Model) -> Self {
        Member {
            id: MemberId(m.id),
            user_id: UserId(m.user_id),
            member_id: m.member_id,
            phone: m.phone,
            address: m.address,
            date_joined: m.date_joined,
            is_active: m.is_active,
        }
    }
}

#[async_trait]
impl MemberRepository for SqlMemberRepository {
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, DomainError> {
        let result = members::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_ids(&self, ids: &[MemberId]) -> Result<Vec<Member>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = members::Entity::find()
            .filter(members::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Member>, DomainError> {
        let result = members::Entity::find()
            .filter(members::Column::UserId.eq(user_id.0))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn member_code_exists(&self, code: &str) -> Result<bool, DomainError> {
        let count = members::Entity::find()
            .filter(members::Column::MemberId.eq(code))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn list_active(&self, filter: &MemberFilter) -> Result<Vec<Member>, DomainError> {
        let mut query = members::Entity::find().filter(members::Column::IsActive.eq(true));

        if let Some(term) = search_term(&filter.search) {
            query = query
                .join(JoinType::InnerJoin, members::Relation::User.def())
                .filter(
                    Condition::any()
                        .add(contains_ci((users::Entity, users::Column::Username), term))
                        .add(contains_ci((users::Entity, users::Column::Email), term))
                        .add(contains_ci((members::Entity, members::Column::MemberId), term)),
                );
        }

        let results = query
            .order_by_desc(members::Column::DateJoined)
            .order_by_desc(members::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn create(&self, member: &NewMember) -> Result<Member, DomainError> {
        let model = members::ActiveModel {
            user_id: Set(member.user_id.0),
            member_id: Set(member.member_id.clone()),
            phone: Set(member.phone.clone()),
            address: Set(member.address.clone()),
            date_joined: Set(Utc::now().date_naive()),
            is_active: Set(true),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| unique_violation(e, "user_id", DUPLICATE_PROFILE))?;

        Ok(result.into())
    }

    async fn update(&self, member: &Member) -> Result<Member, DomainError> {
        let result = members::ActiveModel {
            id: Set(member.id.0),
            phone: Set(member.phone.clone()),
            address: Set(member.address.clone()),
            is_active: Set(member.is_active),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                DomainError::NotFound(format!("Member {}", member.id))
            }
            e => DomainError::Database(e.to_string()),
        })?;

        Ok(result.into())
    }
}

//! SQL adapter for UserRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use super::unique_violation;
use crate::domain::entities::{
    Member, NewUser, User, UserId, DUPLICATE_MEMBER_CODE, DUPLICATE_USERNAME,
};
use crate::domain::ports::UserRepository;
use crate::entity::{members, users};
use crate::error::DomainError;

/// SeaORM implementation of UserRepository
pub struct SqlUserRepository {
    db: DatabaseConnection,
}

impl SqlUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<users::Model> for User {
    fn from(m: users::Model) -> Self {
        User {
            id: UserId(m.id),
            username: m.username,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            password_hash: m.password_hash,
            date_joined: m.date_joined.with_timezone(&Utc),
        }
    }
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let result = users::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let result = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_token_hash(&self, hash: &str) -> Result<Option<User>, DomainError> {
        let result = users::Entity::find()
            .filter(users::Column::ApiTokenHash.eq(hash))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn register(
        &self,
        user: &NewUser,
        member_code: &str,
    ) -> Result<(User, Member), DomainError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let user_model = users::ActiveModel {
            username: Set(user.username.clone()),
            email: Set(user.email.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            password_hash: Set(user.password_hash.clone()),
            api_token_hash: Set(None),
            date_joined: Set(now.fixed_offset()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| unique_violation(e, "username", DUPLICATE_USERNAME))?;

        let member_model = members::ActiveModel {
            user_id: Set(user_model.id),
            member_id: Set(member_code.to_string()),
            phone: Set(String::new()),
            address: Set(String::new()),
            date_joined: Set(now.date_naive()),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| unique_violation(e, "member_id", DUPLICATE_MEMBER_CODE))?;

        // Dropping the transaction on an early return rolls it back
        txn.commit().await?;

        Ok((user_model.into(), member_model.into()))
    }

    async fn set_token_hash(&self, id: UserId, hash: &str) -> Result<(), DomainError> {
        users::ActiveModel {
            id: Set(id.0),
            api_token_hash: Set(Some(hash.to_string())),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => DomainError::NotFound(format!("User {}", id)),
            e => DomainError::Database(e.to_string()),
        })?;

        Ok(())
    }
}

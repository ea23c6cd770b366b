//! Member handlers
//!
//! Only active members are visible; DELETE deactivates instead of removing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{IssueRecordResponse, ListQuery, MemberResponse, REQUIRED};
use crate::auth::AuthUser;
use crate::domain::entities::{MemberChanges, MemberFilter, MemberId, UserId};
use crate::error::{AppError, DomainError, JsonBody};
use crate::AppState;

/// Request to create a member profile for an existing user
#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub user_id: Option<UserId>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Request to update a member; the membership code cannot be changed
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateMemberRequest> for MemberChanges {
    fn from(r: UpdateMemberRequest) -> Self {
        MemberChanges {
            phone: r.phone,
            address: r.address,
            is_active: r.is_active,
        }
    }
}

/// GET /members
///
/// List active members. `search` matches username, email or membership code.
pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<MemberResponse>>, AppError> {
    let (limit, offset) = query.page();
    let members = state
        .membership_service
        .list(&MemberFilter {
            search: query.search,
            limit,
            offset,
        })
        .await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// POST /members
pub async fn create_member(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    JsonBody(request): JsonBody<CreateMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), AppError> {
    let Some(user_id) = request.user_id else {
        return Err(DomainError::field("user_id", REQUIRED).into());
    };

    let details = state
        .membership_service
        .create(
            user_id,
            request.phone.unwrap_or_default(),
            request.address.unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /members/:id
pub async fn get_member(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<MemberResponse>, AppError> {
    let details = state.membership_service.get(MemberId(id)).await?;
    Ok(Json(details.into()))
}

/// PUT /members/:id
///
/// Every member field is optional, so a full update behaves like PATCH.
pub async fn put_member(
    state: State<AppState>,
    user: AuthUser,
    path: Path<i32>,
    body: JsonBody<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    patch_member(state, user, path, body).await
}

/// PATCH /members/:id
pub async fn patch_member(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, AppError> {
    let details = state
        .membership_service
        .update(MemberId(id), request.into())
        .await?;
    Ok(Json(details.into()))
}

/// DELETE /members/:id
///
/// Soft delete: the member is deactivated and kept for lending history.
pub async fn delete_member(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state.membership_service.deactivate(MemberId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /members/:id/issues
///
/// Lending history of one member, most recent first.
pub async fn member_history(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<IssueRecordResponse>>, AppError> {
    let (limit, offset) = query.page();
    let history = state
        .membership_service
        .history(MemberId(id), limit, offset)
        .await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_code_is_not_writable() {
        let json = r#"{"phone": "555-0100", "member_id": "M99999"}"#;
        let request: UpdateMemberRequest = serde_json::from_str(json).unwrap();
        let changes = MemberChanges::from(request);

        assert_eq!(changes.phone.as_deref(), Some("555-0100"));
        assert!(changes.address.is_none());
        assert!(changes.is_active.is_none());
    }

    #[test]
    fn parse_create_member_request() {
        let request: CreateMemberRequest =
            serde_json::from_str(r#"{"user_id": 3, "address": "1 Main St"}"#).unwrap();
        assert_eq!(request.user_id, Some(UserId(3)));
        assert!(request.phone.is_none());
    }
}

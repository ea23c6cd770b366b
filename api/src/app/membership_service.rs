//! Membership service
//!
//! Member profiles: listing, creation for existing users, updates, soft
//! deletion and lending history.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::{
    member, IssueFilter, Member, MemberChanges, MemberFilter, MemberId, NewMember, User, UserId,
    DUPLICATE_PROFILE,
};
use crate::domain::ports::{
    BookRepository, IssueRecordRepository, MemberCodeSource, MemberRepository, UserRepository,
};
use crate::error::{AppError, DomainError, FieldErrors};

use super::lending_service::{IssueDetails, LendingService};

/// Attempts at drawing an unused membership code before giving up
pub const MAX_CODE_ATTEMPTS: usize = 32;

/// A member together with the user account behind it
#[derive(Debug, Clone)]
pub struct MemberDetails {
    pub member: Member,
    pub user: User,
}

/// Draw membership codes until one is not taken
pub(crate) async fn unused_member_code<MR>(
    members: &MR,
    codes: &dyn MemberCodeSource,
) -> Result<String, AppError>
where
    MR: MemberRepository,
{
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = codes.next_code();
        if !members.member_code_exists(&code).await? {
            return Ok(code);
        }
        tracing::debug!(code = %code, "Membership code taken, drawing another");
    }
    Err(AppError::Internal(
        "Could not allocate a unique membership code".to_string(),
    ))
}

/// Attach users to members, dropping members whose user is gone
pub(crate) async fn with_users<UR>(
    users: &UR,
    members: Vec<Member>,
) -> Result<Vec<MemberDetails>, AppError>
where
    UR: UserRepository,
{
    let ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
    let by_id: HashMap<UserId, User> = users
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(members
        .into_iter()
        .filter_map(|member| {
            let user = by_id.get(&member.user_id)?.clone();
            Some(MemberDetails { member, user })
        })
        .collect())
}

fn check_contact(errors: &mut FieldErrors, phone: Option<&str>) {
    if let Some(phone) = phone {
        if phone.chars().count() > member::MAX_PHONE_LEN {
            errors.add(
                "phone",
                format!(
                    "Ensure this field has no more than {} characters.",
                    member::MAX_PHONE_LEN
                ),
            );
        }
    }
}

/// Service for managing library members
pub struct MembershipService<BR, MR, UR, IR>
where
    BR: BookRepository,
    MR: MemberRepository,
    UR: UserRepository,
    IR: IssueRecordRepository,
{
    members: Arc<MR>,
    users: Arc<UR>,
    lending: Arc<LendingService<BR, MR, UR, IR>>,
    codes: Arc<dyn MemberCodeSource>,
}

impl<BR, MR, UR, IR> MembershipService<BR, MR, UR, IR>
where
    BR: BookRepository,
    MR: MemberRepository,
    UR: UserRepository,
    IR: IssueRecordRepository,
{
    pub fn new(
        members: Arc<MR>,
        users: Arc<UR>,
        lending: Arc<LendingService<BR, MR, UR, IR>>,
        codes: Arc<dyn MemberCodeSource>,
    ) -> Self {
        Self {
            members,
            users,
            lending,
            codes,
        }
    }

    /// List active members, newest first
    pub async fn list(&self, filter: &MemberFilter) -> Result<Vec<MemberDetails>, AppError> {
        let members = self.members.list_active(filter).await?;
        with_users(self.users.as_ref(), members).await
    }

    /// Get an active member; deactivated members are hidden
    pub async fn get(&self, id: MemberId) -> Result<MemberDetails, AppError> {
        let member = self.active_member(id).await?;
        let user = self
            .users
            .find_by_id(member.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;
        Ok(MemberDetails { member, user })
    }

    /// Create a member profile for an existing user with a fresh membership code
    pub async fn create(
        &self,
        user_id: UserId,
        phone: String,
        address: String,
    ) -> Result<MemberDetails, AppError> {
        let mut errors = FieldErrors::new();
        check_contact(&mut errors, Some(&phone));
        errors.into_result()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::field("user_id", "User not found."))?;

        if self.members.find_by_user(user_id).await?.is_some() {
            return Err(DomainError::field("user_id", DUPLICATE_PROFILE).into());
        }

        let code = unused_member_code(self.members.as_ref(), self.codes.as_ref()).await?;
        let member = self
            .members
            .create(&NewMember {
                user_id,
                member_id: code,
                phone,
                address,
            })
            .await?;

        tracing::info!(member_id = %member.member_id, user_id = %user_id, "Member created");
        Ok(MemberDetails { member, user })
    }

    /// Update contact details or activity; the membership code never changes
    pub async fn update(
        &self,
        id: MemberId,
        changes: MemberChanges,
    ) -> Result<MemberDetails, AppError> {
        let mut errors = FieldErrors::new();
        check_contact(&mut errors, changes.phone.as_deref());
        errors.into_result()?;

        let mut details = self.get(id).await?;
        details.member.apply(changes);
        details.member = self.members.update(&details.member).await?;

        tracing::info!(member_id = %details.member.member_id, "Member updated");
        Ok(details)
    }

    /// Soft delete: the member is deactivated and drops out of listings
    pub async fn deactivate(&self, id: MemberId) -> Result<(), AppError> {
        let mut member = self.active_member(id).await?;
        member.is_active = false;
        self.members.update(&member).await?;

        tracing::info!(member_id = %member.member_id, "Member deactivated");
        Ok(())
    }

    /// Every issue record of an active member, most recent first
    pub async fn history(
        &self,
        id: MemberId,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<IssueDetails>, AppError> {
        let member = self.active_member(id).await?;
        self.lending
            .list(&IssueFilter {
                member_id: Some(member.id),
                limit,
                offset,
                ..Default::default()
            })
            .await
    }

    async fn active_member(&self, id: MemberId) -> Result<Member, AppError> {
        self.members
            .find_by_id(id)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }
}

//! Member domain entity
//!
//! A registered library patron, linked one-to-one with a user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Unique identifier for a member row (not the public `member_id` code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i32);

impl From<i32> for MemberId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const MEMBER_CODE_PREFIX: char = 'M';
pub const MEMBER_CODE_MIN: u32 = 10_000;
pub const MEMBER_CODE_MAX: u32 = 99_999;
pub const MAX_PHONE_LEN: usize = 15;

pub const DUPLICATE_PROFILE: &str = "This user already has a member profile.";
pub const DUPLICATE_MEMBER_CODE: &str = "Membership code already in use.";

#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub user_id: UserId,
    /// Public membership code, e.g. `M48213`. Immutable once assigned.
    pub member_id: String,
    pub phone: String,
    pub address: String,
    pub date_joined: NaiveDate,
    pub is_active: bool,
}

impl Member {
    /// Patrons can borrow only while their membership is active
    pub fn can_borrow(&self) -> bool {
        self.is_active
    }

    pub fn apply(&mut self, changes: MemberChanges) {
        if let Some(phone) = changes.phone {
            self.phone = phone;
        }
        if let Some(address) = changes.address {
            self.address = address;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
    }
}

/// Data needed to create a member profile
#[derive(Debug, Clone)]
pub struct NewMember {
    pub user_id: UserId,
    pub member_id: String,
    pub phone: String,
    pub address: String,
}

/// Mutable member fields; `member_id` is deliberately absent
#[derive(Debug, Clone, Default)]
pub struct MemberChanges {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

/// Listing filter for active members
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    /// Case-insensitive substring matched against username, email and member code
    pub search: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

/// Format a numeric code as a membership code
pub fn format_member_code(n: u32) -> String {
    format!("{}{}", MEMBER_CODE_PREFIX, n)
}

/// `M` followed by exactly five digits in the allowed range
pub fn is_valid_member_code(code: &str) -> bool {
    code.strip_prefix(MEMBER_CODE_PREFIX)
        .filter(|digits| digits.len() == 5 && digits.chars().all(|c| c.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u32>().ok())
        .is_some_and(|n| (MEMBER_CODE_MIN..=MEMBER_CODE_MAX).contains(&n))
}

//! Membership code source
//!
//! Produces candidate `M#####` codes. Uniqueness is checked by the caller.

use rand::Rng;

use crate::domain::entities::{format_member_code, member};

pub trait MemberCodeSource: Send + Sync {
    fn next_code(&self) -> String;
}

/// Uniformly random codes in `M10000..=M99999`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMemberCodes;

impl MemberCodeSource for RandomMemberCodes {
    fn next_code(&self) -> String {
        let n = rand::thread_rng().gen_range(member::MEMBER_CODE_MIN..=member::MEMBER_CODE_MAX);
        format_member_code(n)
    }
}

//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod clock;
pub mod member_codes;
pub mod repositories;

pub use clock::{Clock, SystemClock};
pub use member_codes::{MemberCodeSource, RandomMemberCodes};
pub use repositories::{BookRepository, IssueRecordRepository, MemberRepository, UserRepository};

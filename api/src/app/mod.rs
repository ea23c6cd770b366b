//! Application layer
//!
//! Contains use cases and service orchestration.
//! Services coordinate between domain entities and ports.

pub mod catalog_service;
pub mod identity_service;
pub mod lending_service;
pub mod membership_service;

pub use catalog_service::CatalogService;
pub use identity_service::{IdentityService, Registration};
pub use lending_service::{IssueDetails, LendingService};
pub use membership_service::{MemberDetails, MembershipService};

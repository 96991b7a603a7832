//! Identity domain model
//!
//! Entities and their invariants. Repositories are the only mutator
//! surface; services hold short-lived references to these values.

mod organization;
mod permission;
mod role;
mod user;

pub use organization::{is_valid_slug, slugify, NewOrganization, Organization};
pub use permission::{permissions, PermissionRegistry};
pub use role::{Assignment, Membership, NewRole, Role, RoleScope};
pub use user::{canonicalize_email, NewUser, User};

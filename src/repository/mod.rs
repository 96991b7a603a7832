//! Repository contracts and adapters
//!
//! Services depend on these traits only; they never couple to a particular
//! store. Tests and single-process deployments use the in-memory adapter
//! under [`memory`]; a relational adapter lives outside this crate and
//! wraps its calls with [`retry::with_retry`].
//!
//! All read paths filter soft-deleted rows by default. Cross-entity atomic
//! operations (assign role, add member) are repository methods, not
//! transactions leaked to callers.

pub mod memory;
mod organization;
mod page;
pub mod retry;
mod role;
mod user;

pub use organization::{OrganizationChanges, OrganizationRepository};
pub use page::{ListQuery, Page, SortOrder, MAX_PAGE_SIZE};
pub use role::{RoleChanges, RoleRepository};
pub use user::{UserChanges, UserRepository};

use std::sync::Arc;

/// The repository set a handler holds for the duration of one request.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub roles: Arc<dyn RoleRepository>,
}

impl Repositories {
    /// A fully in-memory repository set.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserRepository::new()),
            organizations: Arc::new(memory::MemoryOrganizationRepository::new()),
            roles: Arc::new(memory::MemoryRoleRepository::new()),
        }
    }
}

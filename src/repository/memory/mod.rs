//! In-memory repository adapters
//!
//! Reference implementation of the repository contracts, used by tests and
//! single-process deployments. State lives behind `parking_lot` locks;
//! no lock is held across an await point.

mod organization;
mod role;
mod user;

pub use organization::MemoryOrganizationRepository;
pub use role::MemoryRoleRepository;
pub use user::MemoryUserRepository;

use crate::repository::{ListQuery, Page};

/// Apply ordering, offset/limit, and the optional total to a filtered
/// result set.
fn paginate<T>(mut items: Vec<T>, query: &ListQuery) -> Page<T> {
    let query = query.clone().clamped();
    let total = query.include_total.then_some(items.len() as i64);

    let start = (query.offset as usize).min(items.len());
    let end = (start + query.limit as usize).min(items.len());
    let items = items.drain(start..end).collect();

    Page {
        items,
        offset: query.offset,
        limit: query.limit,
        total,
    }
}

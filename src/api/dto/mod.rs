//! Typed request and response bodies for every broker operation.

mod auth;
mod organization;
mod pagination;
mod role;
mod user;

pub use auth::*;
pub use organization::*;
pub use pagination::ListParams;
pub use role::*;
pub use user::*;

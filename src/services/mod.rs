//! Domain services
//!
//! Orchestration over the repositories, credential and token engines, and
//! the RBAC engine. Handlers call these; nothing here knows about the
//! broker envelope.

mod auth;
mod organization;
mod role;
mod user;

pub use auth::{AuthService, ClientInfo, LoginOutcome};
pub use organization::OrganizationService;
pub use role::RoleService;
pub use user::{RegisterUserInput, UserService};

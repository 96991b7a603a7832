//! Request gating
//!
//! The authorization gate sits between the envelope layer and the domain
//! services: it validates the bearer token, consults the RBAC engine, and
//! attaches a subject context to the request.

mod authorize;

pub use authorize::{AuthorizationGate, SubjectContext};

//! Broker-facing surface
//!
//! Request/response envelopes, typed DTOs with field validation, and the
//! operation dispatcher. Nothing below this layer knows about the broker
//! transport itself.

pub mod dto;
pub mod envelope;
pub mod handlers;
mod validate;

pub use envelope::{error_response, gate_rejection, success_response, RequestHeader};
pub use handlers::Dispatcher;
pub use validate::validate_request;

//! Error handling infrastructure for the identity service
//!
//! The error system is built around three components:
//! 1. `ApiError` - the single discriminated error type services return
//! 2. `ErrorCode` - closed enumeration of every failure kind
//! 3. `ErrorContext` - structured metadata and details attached to an error
//!
//! Handlers map `ErrorCode` to a stable wire code; raw lower-layer errors
//! are wrapped here and never reach the wire.

mod api_error;
mod error_code;
mod error_context;

pub use api_error::ApiError;
pub use error_code::ErrorCode;
pub use error_context::ErrorContext;

/// Type alias for Results that use ApiError as the error type
pub type Result<T> = std::result::Result<T, ApiError>;

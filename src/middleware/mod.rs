//! HTTP middleware

mod auth;
mod tracing;

pub use auth::{AuthenticatedUser, StaffUser, USER_ID_HEADER};
pub use tracing::request_tracing;

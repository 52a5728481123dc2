//! Identity extraction middleware
//!
//! Authentication happens at the host gateway, which forwards the caller's
//! identity as an `x-user-id` header. These extractors resolve that header
//! against the users table so handlers get a full user with its role.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::users::{User, UserService};

/// Header carrying the gateway-authenticated user ID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated caller
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<UserService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                CoreError::Unauthorized(format!("{} header required", USER_ID_HEADER))
                    .into_response()
            })?;

        let user_id = Uuid::parse_str(header).map_err(|_| {
            CoreError::Unauthorized("user id header is not a valid UUID".to_string())
                .into_response()
        })?;

        let users = Arc::<UserService>::from_ref(state);
        let user = users
            .find_user(user_id)
            .await
            .map_err(|e| e.into_response())?
            .ok_or_else(|| CoreError::Unauthorized("unknown user".to_string()).into_response())?;

        Ok(AuthenticatedUser(user))
    }
}

/// Extractor requiring a staff caller (moderator or admin)
pub struct StaffUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    Arc<UserService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.is_staff() {
            return Err(
                CoreError::Forbidden("staff role required for this action".to_string())
                    .into_response(),
            );
        }

        Ok(StaffUser(user))
    }
}

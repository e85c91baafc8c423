//! Caller identity extractors.
//!
//! Authentication happens upstream; the identity layer in front of this
//! service forwards the authenticated user's id in `x-user-id`. A request
//! without the header is a guest.

use axum::{extract::FromRequestParts, http::request::Parts};

use carefund_shared::AppError;
use carefund_shared::types::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

fn header_user(parts: &Parts) -> Result<Option<UserId>, ApiError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let id = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<UserId>().ok())
        .ok_or_else(|| AppError::Validation(format!("{USER_ID_HEADER} must be a UUID")))?;
    Ok(Some(id))
}

/// Extractor for routes that require an identified caller.
///
/// Whether the caller has the right role is decided by the workflow.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl AuthUser {
    /// Returns the user ID.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_user(parts)?
            .map(Self)
            .ok_or_else(|| AppError::Authorization("Authentication required".to_string()).into())
    }
}

/// Extractor for routes guests may call.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_user(parts).map(Self)
    }
}

//! Caller identification.

use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use repairdesk_domain::id::UserId;

use crate::error::ApiError;

/// Header carrying the calling user's id.
pub const ACTOR_HEADER: &str = "x-user-id";

/// The user a request acts as.
///
/// Only the id is extracted here; the use-case looks the user up and rejects
/// unknown or inactive ones.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;
        UserId::from_str(raw.trim())
            .map(Self)
            .map_err(|_| ApiError::Unauthenticated)
    }
}

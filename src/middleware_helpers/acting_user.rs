use crate::errors::ServiceError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header the fronting gateway uses to forward the authenticated user.
pub const ACTING_USER_HEADER: &str = "x-acting-user";

/// Identity of the user performing a mutating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl ActingUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| ActingUser(value.to_string()))
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!("missing {} header", ACTING_USER_HEADER))
            })
    }
}

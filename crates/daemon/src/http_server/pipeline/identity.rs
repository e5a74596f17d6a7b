use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

/// Caller identity recorded by the authenticate stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject(pub Uuid);

/// Extractor for the authenticated caller's user id
///
/// Only valid on routes behind the authenticate stage. Anywhere else the request
/// is answered with a 500: a handler asking for an identity nobody checked is a
/// routing bug, not a client error.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

#[derive(Debug, thiserror::Error)]
#[error("no authenticated identity on request; authenticate stage did not run")]
pub struct MissingIdentity;

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        tracing::error!("BUG: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = MissingIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Subject>()
            .map(|subject| AuthenticatedUser(subject.0))
            .ok_or(MissingIdentity)
    }
}

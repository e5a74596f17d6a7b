use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use common::auth::TokenIssuer;

use super::{Stage, Subject};

/// Verifies the bearer token and records who is calling
#[derive(Debug, Clone)]
pub struct AuthenticateStage {
    tokens: Arc<TokenIssuer>,
}

impl AuthenticateStage {
    pub fn new(tokens: Arc<TokenIssuer>) -> Self {
        Self { tokens }
    }

    fn subject(&self, request: &Request) -> Result<Subject, &'static str> {
        let header_value = request
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or("missing authorization header")?
            .to_str()
            .map_err(|_| "authorization header is not valid text")?;

        let subject = self.tokens.verify(header_value).map_err(|e| match e {
            common::auth::TokenError::InvalidToken(reason) => reason,
            _ => "token rejected",
        })?;

        Uuid::parse_str(&subject)
            .map(Subject)
            .map_err(|_| "token subject is not a user id")
    }
}

#[async_trait]
impl Stage for AuthenticateStage {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn process(&self, mut request: Request) -> Result<Request, Response> {
        match self.subject(&request) {
            Ok(subject) => {
                request.extensions_mut().insert(subject);
                Ok(request)
            }
            Err(reason) => {
                tracing::warn!(
                    method = %request.method(),
                    uri = %request.uri(),
                    "AUTHENTICATE: rejected request: {}",
                    reason
                );
                Err((StatusCode::UNAUTHORIZED, "unauthorized").into_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use time::OffsetDateTime;

    use super::*;

    fn tokens() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(
            b"pipeline-test-key".to_vec(),
            Duration::from_secs(3600),
        ))
    }

    fn request_with(header_value: Option<&str>) -> Request {
        let mut builder = Request::builder();
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_attaches_subject() {
        let tokens = tokens();
        let user = Uuid::new_v4();
        let header_value = tokens.issue(&user.to_string()).unwrap();

        let request = AuthenticateStage::new(tokens)
            .process(request_with(Some(&header_value)))
            .await
            .unwrap();
        assert_eq!(request.extensions().get::<Subject>(), Some(&Subject(user)));
    }

    #[tokio::test]
    async fn test_rejections_are_unauthorized() {
        let tokens = tokens();
        let user = Uuid::new_v4().to_string();
        let expired = tokens
            .issue_at(&user, OffsetDateTime::now_utc() - time::Duration::hours(3))
            .unwrap();
        let not_a_uuid = tokens.issue("alice").unwrap();
        let stage = AuthenticateStage::new(tokens);

        for header_value in [
            None,
            Some("Bearer"),
            Some("Bearer garbage"),
            Some(expired.as_str()),
            Some(not_a_uuid.as_str()),
        ] {
            let response = stage
                .process(request_with(header_value))
                .await
                .unwrap_err();
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "header {header_value:?}"
            );
        }
    }
}

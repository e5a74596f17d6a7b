use axum::http::header;
use axum::routing::post;
use axum::Router;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use common::credential::Credential;
use common::crypto::{Encryptor, EnvelopeError};

use crate::http_server::api::client::ApiError;
use crate::http_server::pipeline::{self, Pipeline, RouteClass};
use crate::ServiceState;

pub mod login;
pub mod register;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let pipeline = Pipeline::build(RouteClass::Credentials, &state);

    Router::new()
        .route("/register", post(register::handler))
        .route("/login", post(login::handler))
        .route_layer(axum::middleware::from_fn_with_state(
            pipeline,
            pipeline::middleware,
        ))
        .with_state(state)
}

/// Bearer header value handed back by register and login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken(pub String);

/// Credential JSON sealed in the server's envelope, as sent over the wire
#[derive(Clone)]
pub struct SealedCredential(Vec<u8>);

impl SealedCredential {
    pub fn seal(credential: &Credential, encryptor: &Encryptor) -> Result<Self, EnvelopeError> {
        let json = zeroize::Zeroizing::new(
            serde_json::to_vec(credential).map_err(|e| EnvelopeError::Crypto(e.to_string()))?,
        );
        Ok(Self(encryptor.encrypt(&json)?))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl std::fmt::Debug for SealedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SealedCredential")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

/// Shared by register and login: 200 plus an `Authorization` header
async fn parse_auth_response(response: reqwest::Response) -> Result<AuthToken, ApiError> {
    let response = ApiError::expect_status(response, StatusCode::OK).await?;
    response
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| AuthToken(value.to_string()))
        .ok_or(ApiError::MissingAuthorization)
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialBodyError {
    #[error("malformed credential body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the plaintext credential the decrypt stage left in the body
pub(crate) fn parse_credential(body: &[u8]) -> Result<Credential, CredentialBodyError> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_parse_credential() {
        let credential = parse_credential(br#"{"login":"alice","password":"s3cret"}"#).unwrap();
        assert_eq!(credential.login, "alice");
        assert!(credential.validate().is_ok());

        let bad_bodies: [&[u8]; 3] = [b"[1, 2, 3]", br#"{"login":"alice"}"#, b"not json"];
        for bad in bad_bodies {
            let err = parse_credential(bad).unwrap_err();
            assert!(matches!(err, CredentialBodyError::Json(_)));
        }
    }

    #[test]
    fn test_body_error_maps_to_bad_request() {
        let err = parse_credential(b"{").unwrap_err();
        let register = register::RegisterError::from(err).into_response();
        assert_eq!(register.status(), StatusCode::BAD_REQUEST);

        let err = parse_credential(b"{").unwrap_err();
        let login = login::LoginError::from(err).into_response();
        assert_eq!(login.status(), StatusCode::BAD_REQUEST);
    }
}

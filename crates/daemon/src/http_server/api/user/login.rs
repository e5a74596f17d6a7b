use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::TokenError;

use super::{parse_auth_response, parse_credential, AuthToken, CredentialBodyError, SealedCredential};
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::storage::StorageError;
use crate::ServiceState;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub credential: SealedCredential,
}

pub async fn handler(
    State(state): State<ServiceState>,
    body: Bytes,
) -> Result<impl IntoResponse, LoginError> {
    let credential = parse_credential(&body)?;
    tracing::info!("LOGIN: request for login '{}'", credential.login);

    let (user_id, stored_hash) = match state.store().find_user_for_login(&credential.login).await
    {
        Ok(found) => found,
        Err(StorageError::NotFound) => return Err(LoginError::BadCredentials),
        Err(e) => return Err(e.into()),
    };

    let matches =
        tokio::task::spawn_blocking(move || credential.check_password(&stored_hash)).await?;
    if !matches {
        return Err(LoginError::BadCredentials);
    }

    let token = state.tokens().issue(&user_id.to_string())?;

    tracing::info!("LOGIN: user {} authenticated", user_id);
    Ok((StatusCode::OK, [(header::AUTHORIZATION, token)]).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid body: {0}")]
    Body(#[from] CredentialBodyError),
    // unknown login and wrong password look the same from outside
    #[error("bad login or password")]
    BadCredentials,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("password check task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match self {
            LoginError::Body(_) => {
                tracing::warn!("LOGIN ERROR: {}", self);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            LoginError::BadCredentials => {
                tracing::warn!("LOGIN ERROR: {}", self);
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            LoginError::Storage(_) | LoginError::Token(_) | LoginError::Task(_) => {
                tracing::error!("LOGIN ERROR: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
#[async_trait::async_trait]
impl ApiRequest for LoginRequest {
    type Response = AuthToken;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/user/login")?;
        Ok(client
            .post(full_url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(self.credential.into_bytes()))
    }

    async fn parse_response(response: reqwest::Response) -> Result<Self::Response, ApiError> {
        parse_auth_response(response).await
    }
}

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::TokenError;
use common::credential::CredentialError;

use super::{parse_auth_response, parse_credential, AuthToken, CredentialBodyError, SealedCredential};
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::storage::StorageError;
use crate::ServiceState;

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub credential: SealedCredential,
}

pub async fn handler(
    State(state): State<ServiceState>,
    body: Bytes,
) -> Result<impl IntoResponse, RegisterError> {
    let credential = parse_credential(&body)?;
    credential.validate()?;
    tracing::info!("REGISTER: request for login '{}'", credential.login);

    if state.store().user_exists(&credential.login).await? {
        return Err(RegisterError::LoginTaken);
    }

    let hashed = tokio::task::spawn_blocking(move || credential.hash_password()).await??;

    let user_id = state.store().create_user(&hashed).await.map_err(|e| match e {
        // lost a race with a concurrent registration
        StorageError::Conflict => RegisterError::LoginTaken,
        e => RegisterError::Storage(e),
    })?;
    let token = state.tokens().issue(&user_id.to_string())?;

    tracing::info!("REGISTER: created user {} for '{}'", user_id, hashed.login);
    Ok((StatusCode::OK, [(header::AUTHORIZATION, token)]).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("invalid body: {0}")]
    Body(#[from] CredentialBodyError),
    #[error("invalid credential: {0}")]
    Credential(#[from] CredentialError),
    #[error("login already exists")]
    LoginTaken,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            RegisterError::Body(_) | RegisterError::Credential(_) => {
                tracing::warn!("REGISTER ERROR: {}", self);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            RegisterError::LoginTaken => {
                tracing::warn!("REGISTER ERROR: {}", self);
                (StatusCode::CONFLICT, self.to_string()).into_response()
            }
            RegisterError::Storage(_) | RegisterError::Token(_) | RegisterError::Task(_) => {
                tracing::error!("REGISTER ERROR: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
#[async_trait::async_trait]
impl ApiRequest for RegisterRequest {
    type Response = AuthToken;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/user/register")?;
        Ok(client
            .post(full_url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(self.credential.into_bytes()))
    }

    async fn parse_response(response: reqwest::Response) -> Result<Self::Response, ApiError> {
        parse_auth_response(response).await
    }
}

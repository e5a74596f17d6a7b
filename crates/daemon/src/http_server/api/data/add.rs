use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use super::data_url;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::pipeline::AuthenticatedUser;
use crate::storage::StorageError;
use crate::ServiceState;

/// Store (or replace) a secret; the payload is already encrypted by the client
#[derive(Debug, Clone)]
pub struct AddDataRequest {
    pub id: String,
    pub ciphertext: Vec<u8>,
    pub token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AddError> {
    state.store().put_secret(user_id, &id, &body).await?;

    tracing::info!(
        "ADD DATA: stored secret '{}' ({} bytes) for user {}",
        id,
        body.len(),
        user_id
    );
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, thiserror::Error)]
pub enum AddError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for AddError {
    fn into_response(self) -> Response {
        tracing::error!("ADD DATA ERROR: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

// Client implementation - builds request for this operation
#[async_trait::async_trait]
impl ApiRequest for AddDataRequest {
    type Response = ();

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client
            .post(data_url(base_url, &self.id)?)
            .header(header::AUTHORIZATION, self.token)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(self.ciphertext))
    }

    async fn parse_response(response: reqwest::Response) -> Result<Self::Response, ApiError> {
        ApiError::expect_status(response, StatusCode::ACCEPTED).await?;
        Ok(())
    }
}

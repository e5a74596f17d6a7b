use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use super::data_url;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::pipeline::AuthenticatedUser;
use crate::storage::StorageError;
use crate::ServiceState;

#[derive(Debug, Clone)]
pub struct GetDataRequest {
    pub id: String,
    pub token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GetError> {
    let data = state.store().get_secret(user_id, &id).await?;

    tracing::info!("GET DATA: returning secret '{}' for user {}", id, user_id);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for GetError {
    fn into_response(self) -> Response {
        match self {
            GetError::Storage(StorageError::NotFound) => {
                tracing::warn!("GET DATA ERROR: {}", self);
                (StatusCode::NOT_FOUND, "secret not found").into_response()
            }
            GetError::Storage(_) => {
                tracing::error!("GET DATA ERROR: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
#[async_trait::async_trait]
impl ApiRequest for GetDataRequest {
    type Response = Vec<u8>;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client
            .get(data_url(base_url, &self.id)?)
            .header(header::AUTHORIZATION, self.token))
    }

    async fn parse_response(response: reqwest::Response) -> Result<Self::Response, ApiError> {
        let response = ApiError::expect_status(response, StatusCode::OK).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

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
pub struct DeleteDataRequest {
    pub id: String,
    pub token: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DeleteError> {
    state.store().delete_secret(user_id, &id).await?;

    tracing::info!("DELETE DATA: removed secret '{}' for user {}", id, user_id);
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for DeleteError {
    fn into_response(self) -> Response {
        match self {
            DeleteError::Storage(StorageError::NotFound) => {
                tracing::warn!("DELETE DATA ERROR: {}", self);
                (StatusCode::NOT_FOUND, "secret not found").into_response()
            }
            DeleteError::Storage(_) => {
                tracing::error!("DELETE DATA ERROR: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
#[async_trait::async_trait]
impl ApiRequest for DeleteDataRequest {
    type Response = ();

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        Ok(client
            .delete(data_url(base_url, &self.id)?)
            .header(header::AUTHORIZATION, self.token))
    }

    async fn parse_response(response: reqwest::Response) -> Result<Self::Response, ApiError> {
        ApiError::expect_status(response, StatusCode::ACCEPTED).await?;
        Ok(())
    }
}

use axum::routing::post;
use axum::Router;
use url::Url;

use crate::http_server::api::client::ApiError;
use crate::http_server::pipeline::{self, Pipeline, RouteClass};
use crate::ServiceState;

pub mod add;
pub mod delete;
pub mod get;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let pipeline = Pipeline::build(RouteClass::SecretData, &state);

    Router::new()
        .route(
            "/:id",
            post(add::handler).get(get::handler).delete(delete::handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            pipeline,
            pipeline::middleware,
        ))
        .with_state(state)
}

/// `/api/data/<id>` with the id percent-encoded as a single path segment
fn data_url(base_url: &Url, id: &str) -> Result<Url, ApiError> {
    let mut url = base_url.join("/api/data")?;
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?
        .push(id);
    Ok(url)
}

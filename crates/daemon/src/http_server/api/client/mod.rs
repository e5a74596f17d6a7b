#[allow(clippy::module_inception)]
mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use url::Url;

/// One API operation as seen from the client side
#[async_trait]
pub trait ApiRequest: Send {
    type Response: Send;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;

    async fn parse_response(response: reqwest::Response) -> Result<Self::Response, ApiError>;
}

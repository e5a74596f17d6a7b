use std::time::Duration;

use reqwest::Client;
use url::Url;

use super::error::ApiError;
use super::ApiRequest;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Accepts `host:port` as well as full URLs; bare addresses get `http://`
    pub fn from_address(address: &str) -> Result<Self, ApiError> {
        let address = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        Self::new(&Url::parse(&address)?)
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client)?;
        let response = request_builder.send().await?;
        T::parse_response(response).await
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address_gets_scheme() {
        let client = ApiClient::from_address("localhost:8088").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8088/");

        let client = ApiClient::from_address("https://vault.example.com").unwrap();
        assert_eq!(client.base_url().scheme(), "https");
    }
}

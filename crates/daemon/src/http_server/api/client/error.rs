use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("URL {0} cannot carry a path")]
    InvalidBaseUrl(String),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("response carried no authorization header")]
    MissingAuthorization,
}

impl ApiError {
    /// Pass the response through if it has the status the operation promises
    pub async fn expect_status(
        response: reqwest::Response,
        expected: StatusCode,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status == expected {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::HttpStatus(status, body))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::HttpStatus(status, _) => Some(*status),
            ApiError::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use common::crypto::Decryptor;

use super::Stage;

/// Largest sealed credential body accepted before decryption
pub const MAX_ENVELOPE_SIZE_BYTES: usize = 64 * 1024;

/// Opens the RSA envelope around a credential body and swaps in the plaintext
#[derive(Debug, Clone)]
pub struct DecryptStage {
    decryptor: Arc<Decryptor>,
}

impl DecryptStage {
    pub fn new(decryptor: Arc<Decryptor>) -> Self {
        Self { decryptor }
    }
}

#[derive(Debug, thiserror::Error)]
enum DecryptError {
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("failed to open envelope: {0}")]
    Envelope(#[from] common::crypto::EnvelopeError),
    #[error("decryption task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for DecryptError {
    fn into_response(self) -> Response {
        match self {
            DecryptError::Join(e) => {
                tracing::error!("DECRYPT INGRESS: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
            e => {
                tracing::warn!("DECRYPT INGRESS: {}", e);
                (StatusCode::BAD_REQUEST, "undecryptable request body").into_response()
            }
        }
    }
}

impl DecryptStage {
    async fn open(&self, request: Request) -> Result<Request, DecryptError> {
        let (mut parts, body) = request.into_parts();

        let sealed = to_bytes(body, MAX_ENVELOPE_SIZE_BYTES)
            .await
            .map_err(|e| DecryptError::Body(e.to_string()))?;

        // RSA private key operations are too slow for the async workers
        let decryptor = self.decryptor.clone();
        let plaintext = tokio::task::spawn_blocking(move || decryptor.decrypt(&sealed)).await??;

        parts.headers.remove(header::CONTENT_LENGTH);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Ok(Request::from_parts(parts, Body::from(plaintext)))
    }
}

#[async_trait]
impl Stage for DecryptStage {
    fn name(&self) -> &'static str {
        "decrypt-ingress"
    }

    async fn process(&self, request: Request) -> Result<Request, Response> {
        self.open(request).await.map_err(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PEM: &str = include_str!("../../../tests/fixtures/private.pem");

    fn stage() -> (DecryptStage, common::crypto::Encryptor) {
        let decryptor = Decryptor::from_pem(PRIVATE_PEM).unwrap();
        let encryptor = decryptor.encryptor();
        (DecryptStage::new(Arc::new(decryptor)), encryptor)
    }

    #[tokio::test]
    async fn test_replaces_body_with_plaintext() {
        let (stage, encryptor) = stage();
        let sealed = encryptor
            .encrypt(br#"{"login":"alice","password":"s3cret"}"#)
            .unwrap();
        let request = Request::builder()
            .header(header::CONTENT_LENGTH, sealed.len())
            .body(Body::from(sealed))
            .unwrap();

        let request = stage.process(request).await.unwrap();
        assert!(request.headers().get(header::CONTENT_LENGTH).is_none());

        let body = to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"login":"alice","password":"s3cret"}"#);
    }

    #[tokio::test]
    async fn test_garbage_is_a_client_error() {
        let (stage, _) = stage();
        let request = Request::new(Body::from("this is not an envelope"));

        let response = stage.process(request).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let (stage, _) = stage();
        let request = Request::new(Body::from(vec![0u8; MAX_ENVELOPE_SIZE_BYTES + 256]));

        let response = stage.process(request).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! Shared setup for the HTTP tests: an in-memory store, the fixture key pair
//! and a fixed signing secret.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

use common::auth::TokenIssuer;
use common::credential::Credential;
use common::crypto::{Decryptor, Encryptor};
use keeper_daemon::http_server::api::user::SealedCredential;
use keeper_daemon::{Database, SecretStore, ServiceState};

pub const PRIVATE_PEM: &str = include_str!("../fixtures/private.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/public.pem");
pub const SIGNING_KEY: &[u8] = b"integration-test-signing-key";

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(SIGNING_KEY.to_vec(), Duration::from_secs(60 * 60))
}

pub fn encryptor() -> Encryptor {
    Encryptor::from_pem(PUBLIC_PEM).unwrap()
}

pub async fn memory_state() -> ServiceState {
    let database = Database::in_memory().await.unwrap();
    state_with(Arc::new(database))
}

pub fn state_with(store: Arc<dyn SecretStore>) -> ServiceState {
    ServiceState::new(store, Decryptor::from_pem(PRIVATE_PEM).unwrap(), issuer())
}

pub async fn router() -> Router {
    keeper_daemon::http_server::router(memory_state().await)
}

pub fn sealed(login: &str, password: &str) -> Vec<u8> {
    SealedCredential::seal(&Credential::new(login, password), &encryptor())
        .unwrap()
        .into_bytes()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn credential_request(path: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .body(Body::from(body))
        .unwrap()
}

pub fn data_request(method: Method, id: &str, token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/api/data/{}", id));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Register a user and hand back the bearer header value
pub async fn register(router: &Router, login: &str, password: &str) -> String {
    let response = send(
        router,
        credential_request("/api/user/register", sealed(login, password)),
    )
    .await;
    assert_eq!(response.status(), 200);
    response
        .headers()
        .get(header::AUTHORIZATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

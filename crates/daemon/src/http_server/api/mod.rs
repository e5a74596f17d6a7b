use axum::Router;

pub mod client;
pub mod data;
pub mod user;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/user", user::router(state.clone()))
        .nest("/data", data::router(state.clone()))
        .with_state(state)
}

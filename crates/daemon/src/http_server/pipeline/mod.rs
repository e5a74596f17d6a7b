//! Ordered request pipeline wrapped around the API handlers
//!
//! Every API request runs through a fixed list of [`Stage`]s before its handler:
//!
//! 1. [`DeadlineStage`]: attach a [`Deadline`] unless one is already present.
//! 2. [`DecryptStage`] (credential routes): open the RSA envelope and replace the body.
//! 3. [`AuthenticateStage`] (secret routes): verify the bearer token and attach the
//!    caller's [`Subject`].
//!
//! A stage either hands the (possibly rewritten) request on or answers it with an
//! error response, in which case nothing after it runs. Once a deadline is attached,
//! all later stages and the handler run under it; running out answers 503.

mod authenticate;
mod deadline;
mod decrypt;
mod identity;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub use authenticate::AuthenticateStage;
pub use deadline::{Deadline, DeadlineStage, DEFAULT_DEADLINE};
pub use decrypt::{DecryptStage, MAX_ENVELOPE_SIZE_BYTES};
pub use identity::{AuthenticatedUser, MissingIdentity, Subject};

use crate::ServiceState;

/// One step of the pipeline: forward the request, possibly rewritten, or answer it
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, request: Request) -> Result<Request, Response>;
}

/// Which protections a group of routes needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// register / login: body is an RSA envelope around the credential JSON
    Credentials,
    /// secret CRUD: caller must present a bearer token
    SecretData,
}

#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<Vec<Box<dyn Stage>>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}

impl Pipeline {
    /// The fixed stage order for a route class
    pub fn build(class: RouteClass, state: &ServiceState) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(DeadlineStage::default())];
        match class {
            RouteClass::Credentials => {
                stages.push(Box::new(DecryptStage::new(state.decryptor().clone())))
            }
            RouteClass::SecretData => {
                stages.push(Box::new(AuthenticateStage::new(state.tokens().clone())))
            }
        }
        Self::from_stages(stages)
    }

    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages: Arc::new(stages),
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub async fn run(&self, mut request: Request, next: Next) -> Response {
        for stage in self.stages.iter() {
            let deadline = request.extensions().get::<Deadline>().copied();
            request = match within(deadline, stage.process(request)).await {
                Ok(Ok(request)) => request,
                Ok(Err(response)) => {
                    tracing::debug!(
                        stage = stage.name(),
                        status = %response.status(),
                        "pipeline short-circuited"
                    );
                    return response;
                }
                Err(elapsed) => return elapsed,
            };
        }

        let deadline = request.extensions().get::<Deadline>().copied();
        within(deadline, next.run(request))
            .await
            .unwrap_or_else(|elapsed| elapsed)
    }
}

/// Drive `fut` to completion, or give up with a 503 once the deadline passes
async fn within<T>(deadline: Option<Deadline>, fut: impl Future<Output = T>) -> Result<T, Response> {
    let Some(deadline) = deadline else {
        return Ok(fut.await);
    };

    tokio::time::timeout_at(deadline.instant(), fut)
        .await
        .map_err(|_| {
            tracing::warn!("request deadline elapsed");
            (StatusCode::SERVICE_UNAVAILABLE, "request deadline exceeded").into_response()
        })
}

/// Middleware entry point, attached with `axum::middleware::from_fn_with_state`
pub async fn middleware(State(pipeline): State<Pipeline>, request: Request, next: Next) -> Response {
    pipeline.run(request, next).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    /// Records the order it ran in, optionally answering instead of forwarding
    struct Probe {
        name: &'static str,
        counter: Arc<AtomicUsize>,
        seen_at: Arc<AtomicUsize>,
        answer: Option<StatusCode>,
    }

    #[async_trait]
    impl Stage for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn process(&self, request: Request) -> Result<Request, Response> {
            let position = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen_at.store(position, Ordering::SeqCst);
            match self.answer {
                Some(status) => Err(status.into_response()),
                None => Ok(request),
            }
        }
    }

    fn probe(
        name: &'static str,
        counter: &Arc<AtomicUsize>,
        answer: Option<StatusCode>,
    ) -> (Box<dyn Stage>, Arc<AtomicUsize>) {
        let seen_at = Arc::new(AtomicUsize::new(0));
        let stage = Probe {
            name,
            counter: counter.clone(),
            seen_at: seen_at.clone(),
            answer,
        };
        (Box::new(stage), seen_at)
    }

    fn app(pipeline: Pipeline) -> Router {
        Router::new()
            .route("/", get(|| async { "handled" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "too late"
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(pipeline, middleware))
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (first, first_at) = probe("first", &counter, None);
        let (second, second_at) = probe("second", &counter, None);

        let response = app(Pipeline::from_stages(vec![first, second]))
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(first_at.load(Ordering::SeqCst), 1);
        assert_eq!(second_at.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_the_rest() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (first, _) = probe("first", &counter, Some(StatusCode::UNAUTHORIZED));
        let (second, second_at) = probe("second", &counter, None);

        let response = app(Pipeline::from_stages(vec![first, second]))
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(second_at.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_bounded_by_deadline() {
        let stages: Vec<Box<dyn Stage>> =
            vec![Box::new(DeadlineStage::new(Duration::from_millis(100)))];

        let response = app(Pipeline::from_stages(stages))
            .oneshot(get_request("/slow"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_no_deadline_stage_means_unbounded() {
        let response = app(Pipeline::from_stages(Vec::new()))
            .oneshot(get_request("/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

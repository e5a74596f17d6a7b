use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use tokio::time::Instant;

use super::Stage;

/// Budget given to a request that arrives without a deadline
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(2);

/// Point in time after which work on a request is abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }
}

/// Attaches a [`Deadline`] to requests that do not carry one yet
#[derive(Debug, Clone)]
pub struct DeadlineStage {
    budget: Duration,
}

impl DeadlineStage {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl Default for DeadlineStage {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE)
    }
}

#[async_trait]
impl Stage for DeadlineStage {
    fn name(&self) -> &'static str {
        "deadline"
    }

    async fn process(&self, mut request: Request) -> Result<Request, Response> {
        if request.extensions().get::<Deadline>().is_none() {
            request.extensions_mut().insert(Deadline::after(self.budget));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_attaches_default_budget() {
        let request = Request::new(Body::empty());
        let before = Instant::now();

        let request = DeadlineStage::default().process(request).await.unwrap();
        let deadline = request.extensions().get::<Deadline>().unwrap();
        assert_eq!(deadline.instant(), before + DEFAULT_DEADLINE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_deadline_untouched() {
        let existing = Deadline::after(Duration::from_millis(50));
        let mut request = Request::new(Body::empty());
        request.extensions_mut().insert(existing);

        let request = DeadlineStage::default().process(request).await.unwrap();
        assert_eq!(request.extensions().get::<Deadline>(), Some(&existing));
    }
}

//! Request-scoped cancellation and deadlines
//!
//! Every outbound cluster call a store operation makes runs through
//! [`RequestContext::run`], so dropping a request (client disconnect, server
//! shutdown) or hitting its deadline aborts the call in flight.

use crate::error::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline carried by one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Context with no deadline that is cancelled only explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Replace the deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Tie this context to an externally owned token (e.g. a shutdown signal)
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Token observed by in-flight calls
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel every call running under this context
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancelled or past the deadline
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    ///
    /// Cancellation wins over a simultaneous deadline; an already-cancelled
    /// context never polls `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, StoreError>
    where
        F: Future,
    {
        if self.token.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(StoreError::Cancelled),
            () = deadline => Err(StoreError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_output() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ctx.deadline(), None);
        assert!(!ctx.is_done());

        let ctx = RequestContext::with_timeout(Duration::from_secs(30));
        assert!(ctx.deadline().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_context_never_polls() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let polled = std::sync::atomic::AtomicBool::new(false);
        let result = ctx
            .run(async { polled.store(true, std::sync::atomic::Ordering::SeqCst) })
            .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_call() {
        let ctx = RequestContext::new();
        let token = ctx.cancellation_token().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(10));

        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_external_token() {
        let shutdown = CancellationToken::new();
        let ctx = RequestContext::new().with_token(shutdown.clone());
        shutdown.cancel();

        assert!(ctx.is_done());
        assert!(matches!(ctx.run(async {}).await, Err(StoreError::Cancelled)));
    }
}

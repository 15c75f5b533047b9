//! Per-call context threaded through every transport operation
//!
//! A [`Context`] carries an optional deadline. The inspect command never sets
//! one, so by default every operation may block for as long as the registry
//! takes; callers embedding the library can bound the whole pipeline.

use crate::error::{RegistryError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// Context without a deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `operation` to completion, failing with
    /// [`RegistryError::DeadlineExceeded`] once the deadline passes.
    pub async fn run<F, T>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_expired() {
            return Err(RegistryError::DeadlineExceeded(operation.to_string()));
        }

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| RegistryError::DeadlineExceeded(operation.to_string()))?,
            None => future.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_context_runs_to_completion() {
        let ctx = Context::background();
        assert!(ctx.deadline().is_none());
        let value = ctx.run("noop", async { Ok::<_, RegistryError>(7) }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_operation() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        let result = ctx
            .run("manifest fetch", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, RegistryError>(())
            })
            .await;
        assert_eq!(
            result,
            Err(RegistryError::DeadlineExceeded("manifest fetch".to_string()))
        );
        assert!(ctx.is_expired());
    }

    #[tokio::test]
    async fn test_expired_context_does_not_start_operation() {
        let ctx = Context::with_deadline(Instant::now());
        let started = std::sync::atomic::AtomicBool::new(false);
        let result = ctx
            .run("registry ping", async {
                started.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, RegistryError>(())
            })
            .await;
        assert_eq!(
            result,
            Err(RegistryError::DeadlineExceeded("registry ping".to_string()))
        );
        assert!(!started.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_inner_error_is_preserved() {
        let ctx = Context::with_timeout(Duration::from_secs(60));
        let result: Result<()> = ctx
            .run("blob fetch", async { Err(RegistryError::NotFound("blob".to_string())) })
            .await;
        assert_eq!(result, Err(RegistryError::NotFound("blob".to_string())));
    }
}

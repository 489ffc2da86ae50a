// src/health/checker.rs

use super::CheckResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A named probe for one dependency.
///
/// Implementations must return within the deadline carried by [`CheckContext`];
/// the manager stops waiting once it expires and records the check as unhealthy.
/// Failures are reported through the returned [`CheckResult`], never by panicking.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Stable identifier, used as the key in [`super::Report::checks`].
    fn name(&self) -> &str;

    /// Whether an unhealthy result from this checker makes the whole service unhealthy.
    fn required(&self) -> bool;

    /// Overrides the manager's default per-check timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn check(&self, ctx: CheckContext) -> CheckResult;
}

// Roughly 30 years; stands in for "never" when `start + timeout` overflows.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + timeout`, saturating to a far-future instant instead of panicking.
pub(crate) fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Cancellable deadline handed to [`Checker::check`].
#[derive(Debug, Clone)]
pub struct CheckContext {
    deadline: Instant,
    token: CancellationToken,
}

impl CheckContext {
    pub fn new(deadline: Instant, token: CancellationToken) -> Self {
        Self { deadline, token }
    }

    /// Context expiring `timeout` from now, with a fresh token.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(deadline_after(Instant::now(), timeout), CancellationToken::new())
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Resolves when the check is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_expires_at_deadline() {
        let ctx = CheckContext::with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_cancelled());
        assert!(ctx.remaining() <= Duration::from_millis(20));

        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unbounded_timeout_does_not_overflow() {
        let ctx = CheckContext::with_timeout(Duration::MAX);
        assert!(!ctx.is_cancelled());
        assert!(ctx.remaining() > Duration::from_secs(86_400 * 365));
    }

    #[tokio::test]
    async fn test_context_observes_token() {
        let token = CancellationToken::new();
        let ctx = CheckContext::new(Instant::now() + Duration::from_secs(60), token.child_token());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("cancellation should resolve before the deadline");
        assert!(ctx.is_cancelled());
    }
}

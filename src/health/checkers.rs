// src/health/checkers.rs

//! Ready-made checkers: a function adapter, a generic pinger, an HTTP endpoint
//! probe and (with the `redis` feature) a Redis `PING`.

use super::{CheckContext, CheckResult, Checker};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type CheckFn = dyn Fn(CheckContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Wraps an async closure as a checker. `Ok(())` is healthy, any error unhealthy.
pub struct FuncChecker {
    name: String,
    required: bool,
    timeout: Option<Duration>,
    check_fn: Arc<CheckFn>,
}

impl FuncChecker {
    pub fn new<F, Fut>(name: impl Into<String>, required: bool, check_fn: F) -> Self
    where
        F: Fn(CheckContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            required,
            timeout: None,
            check_fn: Arc::new(move |ctx| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(check_fn(ctx))
            }),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Checker for FuncChecker {
    fn name(&self) -> &str {
        &self.name
    }

    fn required(&self) -> bool {
        self.required
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn check(&self, ctx: CheckContext) -> CheckResult {
        let start = Instant::now();
        match (self.check_fn)(ctx).await {
            Ok(()) => CheckResult::healthy(start.elapsed()),
            Err(e) => CheckResult::unhealthy(start.elapsed(), format!("{e:#}")),
        }
    }
}

/// Anything that can answer a liveness ping: database pools, broker clients,
/// cache connections supplied by the caller.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, ctx: &CheckContext) -> anyhow::Result<()>;
}

/// Checker backed by a [`Pinger`].
pub struct PingChecker<P> {
    name: String,
    required: bool,
    client: P,
}

impl<P: Pinger> PingChecker<P> {
    pub fn new(name: impl Into<String>, client: P, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            client,
        }
    }
}

#[async_trait]
impl<P: Pinger> Checker for PingChecker<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn required(&self) -> bool {
        self.required
    }

    async fn check(&self, ctx: CheckContext) -> CheckResult {
        let start = Instant::now();
        match self.client.ping(&ctx).await {
            Ok(()) => CheckResult::healthy(start.elapsed()),
            Err(e) => CheckResult::unhealthy(start.elapsed(), format!("{e:#}")),
        }
    }
}

/// Probes an HTTP endpoint with a `GET` and expects a specific status code.
pub struct HttpChecker {
    name: String,
    url: String,
    client: Client,
    required: bool,
    expected_status: StatusCode,
    timeout: Option<Duration>,
}

impl HttpChecker {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: Client, required: bool) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
            required,
            expected_status: StatusCode::OK,
            timeout: None,
        }
    }

    pub fn with_expected_status(mut self, status: StatusCode) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Checker for HttpChecker {
    fn name(&self) -> &str {
        &self.name
    }

    fn required(&self) -> bool {
        self.required
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn check(&self, ctx: CheckContext) -> CheckResult {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.url)
            .timeout(ctx.remaining())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == self.expected_status => {
                CheckResult::healthy(start.elapsed()).with_detail("status_code", resp.status().as_u16())
            }
            Ok(resp) => CheckResult::unhealthy(
                start.elapsed(),
                format!(
                    "unexpected status code: got {}, want {}",
                    resp.status().as_u16(),
                    self.expected_status.as_u16()
                ),
            )
            .with_detail("status_code", resp.status().as_u16()),
            Err(e) => CheckResult::unhealthy(start.elapsed(), e),
        }
    }
}

#[cfg(feature = "redis")]
pub use self::redis_checker::RedisChecker;

#[cfg(feature = "redis")]
mod redis_checker {
    use super::*;
    use deadpool_redis::Pool;

    /// Sends `PING` over a connection taken from a `deadpool_redis` pool.
    pub struct RedisChecker {
        name: String,
        pool: Pool,
        required: bool,
        timeout: Option<Duration>,
    }

    impl RedisChecker {
        pub fn new(name: impl Into<String>, pool: Pool, required: bool) -> Self {
            Self {
                name: name.into(),
                pool,
                required,
                timeout: None,
            }
        }

        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }
    }

    #[async_trait]
    impl Checker for RedisChecker {
        fn name(&self) -> &str {
            &self.name
        }

        fn required(&self) -> bool {
            self.required
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        async fn check(&self, _ctx: CheckContext) -> CheckResult {
            let start = Instant::now();

            let mut conn = match self.pool.get().await {
                Ok(conn) => conn,
                Err(e) => return CheckResult::unhealthy(start.elapsed(), e),
            };

            match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
                Ok(_) => CheckResult::healthy(start.elapsed()),
                Err(e) => CheckResult::unhealthy(start.elapsed(), e),
            }
        }
    }
}

//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use healthd::{
    config::{AppConfig, CheckConfig, CheckKind},
    CheckContext, CheckResult, Checker, HealthManager, ManagerConfig, Status,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a [`StubChecker`] does when invoked.
#[derive(Debug, Clone)]
pub enum Behavior {
    Return(Status),
    Sleep(Duration),
    Panic,
}

/// Scriptable checker that counts its invocations.
///
/// Queued statuses are consumed one per call; once the queue is empty the
/// fallback behavior applies.
pub struct StubChecker {
    name: String,
    required: bool,
    timeout: Option<Duration>,
    queued: Mutex<VecDeque<Status>>,
    fallback: Behavior,
    calls: AtomicUsize,
}

impl StubChecker {
    pub fn new(name: &str, required: bool, fallback: Behavior) -> Self {
        Self {
            name: name.to_string(),
            required,
            timeout: None,
            queued: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn healthy(name: &str, required: bool) -> Self {
        Self::new(name, required, Behavior::Return(Status::Healthy))
    }

    pub fn unhealthy(name: &str, required: bool) -> Self {
        Self::new(name, required, Behavior::Return(Status::Unhealthy))
    }

    pub fn with_sequence(self, statuses: impl IntoIterator<Item = Status>) -> Self {
        self.queued.lock().extend(statuses);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn result_for(status: Status) -> CheckResult {
    match status {
        Status::Healthy => CheckResult::healthy(Duration::from_millis(1)),
        Status::Degraded => CheckResult::degraded(Duration::from_millis(1), "running slow"),
        Status::Unhealthy => CheckResult::unhealthy(Duration::from_millis(1), "connection refused"),
    }
}

#[async_trait]
impl Checker for StubChecker {
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
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.queued.lock().pop_front();
        if let Some(status) = next {
            return result_for(status);
        }

        match &self.fallback {
            Behavior::Return(status) => result_for(*status),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                CheckResult::healthy(*duration)
            }
            Behavior::Panic => panic!("checker blew up"),
        }
    }
}

/// A manager with the given checkers registered, returned alongside them.
pub fn manager_with(config: ManagerConfig, checkers: Vec<Arc<StubChecker>>) -> Arc<HealthManager> {
    let manager = Arc::new(HealthManager::new(config));
    for checker in checkers {
        manager.register(checker);
    }
    manager
}

/// Test configuration builder
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_http_check(mut self, name: &str, url: &str, required: bool) -> Self {
        self.config.checks.push(CheckConfig {
            name: name.to_string(),
            kind: CheckKind::Http,
            url: url.to_string(),
            required,
            expected_status: 200,
            timeout_ms: None,
        });
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// src/health/manager.rs

use super::checker::deadline_after;
use super::{CheckContext, CheckResult, Checker, Report};
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tuning values for [`HealthManager`].
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Default deadline for a single check.
    pub timeout: Duration,
    /// How long a report is served from cache before checks run again.
    pub cache_ttl: Duration,
    /// Period of the background scheduler.
    pub background_interval: Duration,
    /// Consecutive failures after which a component is reported as failing.
    /// Informational only: it does not change the aggregate status.
    pub failure_threshold: u32,
    /// Keep `is_started` true once a healthy evaluation has been observed.
    pub startup_latch: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(30),
            background_interval: Duration::from_secs(30),
            failure_threshold: 3,
            startup_latch: false,
        }
    }
}

impl ManagerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_background_interval(mut self, interval: Duration) -> Self {
        self.background_interval = interval;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_startup_latch(mut self, latch: bool) -> Self {
        self.startup_latch = latch;
        self
    }
}

/// Misuse of the background scheduler lifecycle.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HealthError {
    #[error("background health checks are already running")]
    SchedulerAlreadyRunning,

    #[error("background health checks are not running")]
    SchedulerNotRunning,

    #[error("background interval must be greater than zero")]
    ZeroInterval,
}

struct CachedReport {
    report: Report,
    created_at: Instant,
}

#[derive(Default)]
struct ManagerState {
    checkers: Vec<Arc<dyn Checker>>,
    required: HashMap<String, bool>,
    cached: Option<CachedReport>,
    failure_counts: HashMap<String, u32>,
}

struct Scheduler {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs registered checkers, caches the aggregate report and keeps it fresh in
/// the background.
///
/// All mutable state sits behind one lock that is only taken for bookkeeping,
/// never across a checker's I/O.
pub struct HealthManager {
    config: ManagerConfig,
    state: RwLock<ManagerState>,
    scheduler: Mutex<Option<Scheduler>>,
    started: AtomicBool,
}

impl HealthManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ManagerState::default()),
            scheduler: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Registers a checker. Names are not deduplicated: when two checkers share
    /// a name, the last result collected wins in the report.
    pub fn register(&self, checker: Arc<dyn Checker>) {
        let mut state = self.state.write();
        debug!(component = checker.name(), required = checker.required(), "Registering health checker");
        state.required.insert(checker.name().to_string(), checker.required());
        state.checkers.push(checker);
    }

    pub fn checker_names(&self) -> Vec<String> {
        self.state
            .read()
            .checkers
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Returns the cached report while it is fresh, otherwise runs every check.
    pub async fn evaluate(&self) -> Report {
        if let Some(report) = self.cached_report() {
            return report;
        }
        self.run_checks().await
    }

    /// The cached report, if it is younger than the cache TTL.
    pub fn cached_report(&self) -> Option<Report> {
        let state = self.state.read();
        state
            .cached
            .as_ref()
            .filter(|cached| cached.created_at.elapsed() < self.config.cache_ttl)
            .map(|cached| cached.report.clone())
    }

    /// Runs every check now, bypassing the cache.
    pub async fn run_checks(&self) -> Report {
        self.run_checks_with(&CancellationToken::new()).await
    }

    /// Runs every check now. Cancelling `parent` cancels the in-flight checks.
    pub async fn run_checks_with(&self, parent: &CancellationToken) -> Report {
        let (checkers, required) = {
            let state = self.state.read();
            (state.checkers.clone(), state.required.clone())
        };

        debug!(checks = checkers.len(), "Running health checks");
        let cycle_start = Instant::now();

        let tasks = checkers.into_iter().map(|checker| {
            let name = checker.name().to_string();
            let timeout = checker.timeout().unwrap_or(self.config.timeout);
            let handle = tokio::spawn(run_one(checker, timeout, parent.child_token()));
            async move { (name, handle.await) }
        });
        let outcomes = join_all(tasks).await;

        let mut outcomes_in_order = Vec::with_capacity(outcomes.len());
        for (name, outcome) in outcomes {
            let result = outcome.unwrap_or_else(|e| join_failure(&name, e));
            if !result.status.is_healthy() {
                warn!(
                    component = %name,
                    status = %result.status,
                    error = result.error.as_deref().unwrap_or(""),
                    duration_ms = result.duration_ms,
                    "Health check failed"
                );
            }
            outcomes_in_order.push((name, result));
        }

        let statuses: Vec<_> = outcomes_in_order
            .iter()
            .map(|(name, result)| (name.clone(), result.status))
            .collect();
        let results: BTreeMap<_, _> = outcomes_in_order.into_iter().collect();
        let report = Report::new(results, &required);

        let threshold = self.config.failure_threshold.max(1);
        let mut crossed = Vec::new();
        let counts: Vec<(String, u32)> = {
            let mut state = self.state.write();
            for (name, status) in &statuses {
                let count = state.failure_counts.entry(name.clone()).or_insert(0);
                if status.is_healthy() {
                    *count = 0;
                } else {
                    *count += 1;
                    if *count == threshold {
                        crossed.push(name.clone());
                    }
                }
            }
            state.cached = Some(CachedReport {
                report: report.clone(),
                created_at: Instant::now(),
            });
            report
                .checks
                .keys()
                .map(|name| (name.clone(), state.failure_counts.get(name).copied().unwrap_or(0)))
                .collect()
        };

        for name in crossed {
            error!(
                component = %name,
                threshold,
                "Component reached consecutive failure threshold"
            );
        }

        #[cfg(feature = "metrics")]
        crate::metrics::record_report(&report, &counts);

        debug!(
            status = %report.status,
            checks = report.checks.len(),
            failing = counts.iter().filter(|(_, c)| *c > 0).count(),
            elapsed_ms = cycle_start.elapsed().as_millis() as u64,
            "Health checks completed"
        );

        report
    }

    /// Consecutive non-healthy results for `name`; zero when unknown.
    pub fn failure_count(&self, name: &str) -> u32 {
        self.state.read().failure_counts.get(name).copied().unwrap_or(0)
    }

    /// Components whose consecutive failures reached the configured threshold.
    pub fn failing_components(&self) -> Vec<(String, u32)> {
        let threshold = self.config.failure_threshold.max(1);
        let state = self.state.read();
        let mut failing: Vec<_> = state
            .failure_counts
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        failing.sort();
        failing
    }

    /// Starts the background scheduler: one evaluation immediately, then one per
    /// interval until `shutdown` is cancelled or [`HealthManager::stop`] is called.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> Result<(), HealthError> {
        if self.config.background_interval.is_zero() {
            return Err(HealthError::ZeroInterval);
        }

        let mut slot = self.scheduler.lock();
        if slot.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            return Err(HealthError::SchedulerAlreadyRunning);
        }

        let stop = shutdown.child_token();
        let interval = self.config.background_interval;
        let handle = tokio::spawn(run_background(Arc::downgrade(self), interval, stop.clone()));
        *slot = Some(Scheduler { stop, handle });

        info!(interval_ms = interval.as_millis() as u64, "Background health checks started");
        Ok(())
    }

    /// Stops the background scheduler and waits for its task to exit.
    pub async fn stop(&self) -> Result<(), HealthError> {
        let scheduler = self
            .scheduler
            .lock()
            .take()
            .ok_or(HealthError::SchedulerNotRunning)?;

        scheduler.stop.cancel();
        if let Err(e) = scheduler.handle.await {
            error!(error = %e, "Background health check task ended abnormally");
        }

        info!("Background health checks stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Liveness ignores dependency health.
    pub fn is_live(&self) -> bool {
        true
    }

    pub async fn is_ready(&self) -> bool {
        self.evaluate().await.status.is_serving()
    }

    pub async fn is_started(&self) -> bool {
        self.startup_status().await.0
    }

    /// Startup state together with the report it was derived from.
    pub async fn startup_status(&self) -> (bool, Report) {
        let report = self.evaluate().await;
        let healthy = report.status.is_healthy();

        let started = if self.config.startup_latch {
            if healthy {
                self.started.store(true, Ordering::Release);
            }
            self.started.load(Ordering::Acquire)
        } else {
            healthy
        };

        (started, report)
    }
}

async fn run_one(checker: Arc<dyn Checker>, timeout: Duration, token: CancellationToken) -> CheckResult {
    let started = Instant::now();
    let ctx = CheckContext::new(deadline_after(started, timeout), token.clone());

    tokio::select! {
        biased;
        _ = token.cancelled() => CheckResult::unhealthy(started.elapsed(), "check cancelled"),
        outcome = tokio::time::timeout(timeout, checker.check(ctx)) => match outcome {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                CheckResult::timed_out(timeout)
            }
        },
    }
}

fn join_failure(name: &str, err: JoinError) -> CheckResult {
    if err.is_panic() {
        error!(component = %name, "Health checker panicked");
        CheckResult::unhealthy(Duration::ZERO, "check panicked")
    } else {
        CheckResult::unhealthy(Duration::ZERO, "check task cancelled")
    }
}

async fn run_background(manager: Weak<HealthManager>, interval: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let Some(manager) = manager.upgrade() else { break };
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = manager.run_checks_with(&stop) => {}
                }
            }
        }
    }

    debug!("Background health check loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::Status;
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        required: bool,
        status: Status,
    }

    #[async_trait]
    impl Checker for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn required(&self) -> bool {
            self.required
        }

        async fn check(&self, _ctx: CheckContext) -> CheckResult {
            match self.status {
                Status::Healthy => CheckResult::healthy(Duration::ZERO),
                Status::Degraded => CheckResult::degraded(Duration::ZERO, "slow"),
                Status::Unhealthy => CheckResult::unhealthy(Duration::ZERO, "down"),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.background_interval, Duration::from_secs(30));
        assert_eq!(config.failure_threshold, 3);
        assert!(!config.startup_latch);
    }

    #[test]
    fn test_config_builders_chain() {
        let config = ManagerConfig::default()
            .with_timeout(Duration::from_secs(10))
            .with_cache_ttl(Duration::from_secs(60))
            .with_background_interval(Duration::from_secs(15))
            .with_failure_threshold(5)
            .with_startup_latch(true);

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.background_interval, Duration::from_secs(15));
        assert_eq!(config.failure_threshold, 5);
        assert!(config.startup_latch);
    }

    #[tokio::test]
    async fn test_empty_manager_is_healthy() {
        let manager = HealthManager::new(ManagerConfig::default());
        let report = manager.evaluate().await;
        assert_eq!(report.status, Status::Healthy);
        assert!(report.checks.is_empty());
        assert!(manager.is_live());
    }

    #[tokio::test]
    async fn test_duplicate_names_keep_one_entry() {
        let manager = HealthManager::new(ManagerConfig::default());
        manager.register(Arc::new(Fixed { name: "dup", required: false, status: Status::Healthy }));
        manager.register(Arc::new(Fixed { name: "dup", required: false, status: Status::Healthy }));

        let report = manager.run_checks().await;
        assert_eq!(report.checks.len(), 1);
        assert_eq!(manager.checker_names(), vec!["dup".to_string(), "dup".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_components_respects_threshold() {
        let manager = HealthManager::new(ManagerConfig::default().with_failure_threshold(2));
        manager.register(Arc::new(Fixed { name: "db", required: true, status: Status::Unhealthy }));
        manager.register(Arc::new(Fixed { name: "cache", required: false, status: Status::Healthy }));

        manager.run_checks().await;
        assert!(manager.failing_components().is_empty());

        manager.run_checks().await;
        assert_eq!(manager.failing_components(), vec![("db".to_string(), 2)]);
        assert_eq!(manager.failure_count("cache"), 0);
        assert_eq!(manager.failure_count("unknown"), 0);
    }

    #[tokio::test]
    async fn test_cancelled_parent_cancels_checks() {
        struct Hanging;

        #[async_trait]
        impl Checker for Hanging {
            fn name(&self) -> &str {
                "hanging"
            }

            fn required(&self) -> bool {
                true
            }

            async fn check(&self, ctx: CheckContext) -> CheckResult {
                ctx.cancelled().await;
                CheckResult::unhealthy(Duration::ZERO, "gave up")
            }
        }

        let manager = HealthManager::new(ManagerConfig::default().with_timeout(Duration::from_secs(30)));
        manager.register(Arc::new(Hanging));

        let parent = CancellationToken::new();
        parent.cancel();
        let report = tokio::time::timeout(Duration::from_secs(2), manager.run_checks_with(&parent))
            .await
            .expect("cancelled cycle should finish promptly");
        assert_eq!(report.status, Status::Unhealthy);
    }
}
